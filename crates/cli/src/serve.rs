//! JSON-lines request loop for a desktop shell process.
//!
//! Each line on stdin is `{"command": "...", "args": {...}}`; each reply on
//! stdout is `{"ok": value}` or `{"error": "message"}`.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use skillplan_core::{FitVariant, PlanRow, Ship, Skill, SkillPlanner};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct Request {
    command: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Ok(Value),
    Error(String),
}

#[derive(Deserialize)]
struct FitArgs {
    fit: FitVariant,
    #[serde(alias = "userSkills")]
    user_skills: Vec<Skill>,
}

#[derive(Deserialize)]
struct ProgressionArgs {
    #[serde(alias = "userSkills")]
    user_skills: Vec<Skill>,
    #[serde(alias = "eligibleShips")]
    eligible_ships: Vec<Ship>,
    #[serde(alias = "allShips")]
    all_ships: Vec<Ship>,
}

#[derive(Deserialize)]
struct SkillsArgs {
    #[serde(alias = "userSkills")]
    user_skills: Vec<Skill>,
}

#[derive(Deserialize)]
struct PlanArgs {
    plan: Vec<PlanRow>,
}

#[derive(Deserialize)]
struct EulaArgs {
    accepted: bool,
}

/// Serve requests from stdin until it closes.
pub async fn run(planner: &SkillPlanner) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!("serving JSON-lines requests on stdin");

    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(planner, &line).await;
        let mut payload = serde_json::to_vec(&response).context("failed to encode response")?;
        payload.push(b'\n');
        stdout
            .write_all(&payload)
            .await
            .context("failed to write response")?;
        stdout.flush().await.context("failed to flush response")?;
    }

    info!("stdin closed, stopping");
    Ok(())
}

/// Decode and answer one request line.
pub async fn handle_line(planner: &SkillPlanner, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => return Response::Error(format!("malformed request: {err}")),
    };
    debug!(command = %request.command, "handling request");
    match dispatch(planner, request).await {
        Ok(value) => Response::Ok(value),
        Err(message) => Response::Error(message),
    }
}

async fn dispatch(planner: &SkillPlanner, request: Request) -> Result<Value, String> {
    match request.command.as_str() {
        "get_skill_plan_for_fit" => {
            let args: FitArgs = parse_args(request.args)?;
            to_value(planner.get_skill_plan_for_fit(&args.fit, &args.user_skills)?)
        }
        "get_next_ship_progression" => {
            let args: ProgressionArgs = parse_args(request.args)?;
            to_value(planner.get_next_ship_progression(
                &args.user_skills,
                &args.eligible_ships,
                &args.all_ships,
            )?)
        }
        "export_skill_plan_evemon" | "export_skill_plan_evemon_cmd" => {
            let args: PlanArgs = parse_args(request.args)?;
            to_value(planner.export_skill_plan_evemon(&args.plan)?)
        }
        "estimate_training_times" => {
            let args: PlanArgs = parse_args(request.args)?;
            to_value(planner.estimate_training_times(&args.plan)?)
        }
        "get_training_times" => {
            let args: PlanArgs = parse_args(request.args)?;
            to_value(planner.get_training_times(&args.plan)?)
        }
        "validate_fit" => {
            let args: FitArgs = parse_args(request.args)?;
            to_value(planner.validate_fit(&args.fit, &args.user_skills)?)
        }
        "get_eligible_ships" => {
            let args: SkillsArgs = parse_args(request.args)?;
            to_value(planner.get_eligible_ships(&args.user_skills)?)
        }
        "get_all_ships" => to_value(planner.all_ships()?),
        "refresh_sde" | "refresh_sde_cmd" => to_value(planner.refresh_sde().await?),
        "sde_auto_update_occurred" => to_value(planner.sde_auto_update_occurred()),
        "snapshot_version" => to_value(planner.snapshot_version()),
        "get_eula_accepted" => to_value(planner.get_eula_accepted()),
        "set_eula_accepted" | "set_eula_accepted_cmd" => {
            let args: EulaArgs = parse_args(request.args)?;
            planner.set_eula_accepted(args.accepted)?;
            Ok(Value::Null)
        }
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|err| format!("invalid arguments: {err}"))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|err| err.to_string())
}
