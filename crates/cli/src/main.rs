mod serve;

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Serialize};
use skillplan_core::{
    config::{self, AppConfig},
    engine::format_duration,
    FitVariant, PlanRow, SdeSync, Ship, Skill, SkillPlanner, SnapshotWatcher, SyncEvent,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Skill gap and ship progression planner for EVE Online.
#[derive(Parser, Debug)]
#[command(name = "skillplan", author, version, about, long_about = None)]
struct Cli {
    /// Config file path (default: <config dir>/eve-skillplan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Training plan for a fit.
    Plan {
        /// Fit JSON file.
        #[arg(long)]
        fit: PathBuf,
        /// Character skills JSON file.
        #[arg(long)]
        skills: PathBuf,
        /// Print the plan in EVEMon format.
        #[arg(long)]
        export: bool,
    },
    /// Suggest the next ship to train towards.
    Progression {
        /// Character skills JSON file.
        #[arg(long)]
        skills: PathBuf,
        /// Ships the character can fly (derived from skills when omitted).
        #[arg(long)]
        eligible: Option<PathBuf>,
        /// Ship pool to choose from (every catalog ship when omitted).
        #[arg(long)]
        all: Option<PathBuf>,
    },
    /// Convert plan rows to EVEMon text.
    Export {
        /// Plan rows JSON file.
        #[arg(long)]
        plan: PathBuf,
    },
    /// Estimate remaining training time for plan rows.
    Training {
        /// Plan rows JSON file.
        #[arg(long)]
        plan: PathBuf,
    },
    /// Check whether a character can use a fit.
    Validate {
        /// Fit JSON file.
        #[arg(long)]
        fit: PathBuf,
        /// Character skills JSON file.
        #[arg(long)]
        skills: PathBuf,
    },
    /// Fetch the SDE snapshot now.
    Refresh,
    /// Show snapshot, auto-update and EULA state.
    Status,
    /// Show or record the EULA decision.
    Eula {
        #[command(subcommand)]
        action: EulaAction,
    },
    /// Answer JSON-lines requests on stdin until EOF.
    Serve,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum EulaAction {
    /// Accept the EULA.
    Accept,
    /// Decline the EULA.
    Decline,
    /// Print whether the EULA is accepted.
    Status,
}

struct BackgroundRefresh {
    run: JoinHandle<Result<()>>,
    report: JoinHandle<()>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            config::ensure_config_at(path)?;
            AppConfig::load_from(path)?
        }
        None => {
            config::ensure_default_config()?;
            AppConfig::load()?
        }
    };
    init_logging(&config)?;

    let planner = SkillPlanner::from_config(&config);
    let sync = planner
        .sync()
        .cloned()
        .ok_or_else(|| anyhow!("SDE sync is not configured"))?;

    if let Err(err) = sync.prepare().await {
        warn!("failed to prepare SDE snapshot: {err:#}");
    }

    let background = if config.auto_update
        && config.sde_source.is_some()
        && !matches!(cli.command, Command::Refresh)
        && sync.update_needed()?
    {
        info!(
            max_age_hours = config.sde_max_age_hours,
            "SDE snapshot is stale, refreshing in background"
        );
        planner.mark_auto_update();
        Some(spawn_refresh(sync.clone()))
    } else {
        None
    };

    let outcome = run_command(&planner, &config, cli.command, cli.json).await;

    if let Some(background) = background {
        match background.run.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!("SDE refresh task error: {err:#}"),
            Err(err) => error!("SDE refresh task panicked: {err}"),
        }
        let _ = background.report.await;
    }

    outcome
}

fn spawn_refresh(sync: SdeSync) -> BackgroundRefresh {
    let (sender, mut events) = mpsc::channel(4);
    let run = tokio::spawn(sync.run(sender));
    let report = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SyncEvent::Updated { version } => info!(%version, "SDE snapshot updated"),
                SyncEvent::UpToDate => info!("SDE snapshot already current"),
                SyncEvent::Error(err) => warn!("background SDE refresh failed: {err:#}"),
            }
        }
    });
    BackgroundRefresh { run, report }
}

async fn run_command(
    planner: &SkillPlanner,
    config: &AppConfig,
    command: Command,
    json: bool,
) -> Result<()> {
    match command {
        Command::Plan {
            fit,
            skills,
            export,
        } => {
            let fit: FitVariant = read_json(&fit)?;
            let skills: Vec<Skill> = read_json(&skills)?;
            let rows = planner
                .get_skill_plan_for_fit(&fit, &skills)
                .map_err(|err| anyhow!(err))?;
            if export {
                let text = planner
                    .export_skill_plan_evemon(&rows)
                    .map_err(|err| anyhow!(err))?;
                println!("{text}");
            } else if json {
                print_json(&rows)?;
            } else {
                print_plan(&rows);
            }
        }
        Command::Progression {
            skills,
            eligible,
            all,
        } => {
            let skills: Vec<Skill> = read_json(&skills)?;
            let eligible: Vec<Ship> = match eligible {
                Some(path) => read_json(&path)?,
                None => planner
                    .get_eligible_ships(&skills)
                    .map_err(|err| anyhow!(err))?,
            };
            let all: Vec<Ship> = match all {
                Some(path) => read_json(&path)?,
                None => planner.all_ships().map_err(|err| anyhow!(err))?,
            };
            let suggestion = planner
                .get_next_ship_progression(&skills, &eligible, &all)
                .map_err(|err| anyhow!(err))?;
            if json {
                print_json(&suggestion)?;
            } else {
                match suggestion {
                    Some((tier, ship, required)) => {
                        println!("Next ship: {} ({tier})", ship.ship_name);
                        for (_, name, level) in required {
                            println!("  {name} Level {level}");
                        }
                    }
                    None => println!("No further ship progression available."),
                }
            }
        }
        Command::Export { plan } => {
            let rows: Vec<PlanRow> = read_json(&plan)?;
            let text = planner
                .export_skill_plan_evemon(&rows)
                .map_err(|err| anyhow!(err))?;
            println!("{text}");
        }
        Command::Training { plan } => {
            let rows: Vec<PlanRow> = read_json(&plan)?;
            let estimate = planner
                .estimate_training_times(&rows)
                .map_err(|err| anyhow!(err))?;
            if json {
                print_json(&estimate)?;
            } else {
                for entry in &estimate.entries {
                    println!(
                        "{:<40} {:>12} SP  {}",
                        entry.skill_name,
                        entry.skill_points,
                        format_duration(entry.duration)
                    );
                }
                println!(
                    "Total: {} SP, {}",
                    estimate.total_skill_points,
                    format_duration(estimate.total_duration)
                );
            }
        }
        Command::Validate { fit, skills } => {
            let fit: FitVariant = read_json(&fit)?;
            let skills: Vec<Skill> = read_json(&skills)?;
            let validation = planner
                .validate_fit(&fit, &skills)
                .map_err(|err| anyhow!(err))?;
            if json {
                print_json(&validation)?;
            } else {
                if validation.is_valid {
                    println!("{} can be flown.", fit.fit_name);
                } else {
                    println!("{} needs more training:", fit.fit_name);
                    for missing in &validation.missing_requirements {
                        println!("  {missing}");
                    }
                }
                for warning in &validation.warnings {
                    println!("warning: {warning}");
                }
            }
        }
        Command::Refresh => {
            let updated = planner.refresh_sde().await.map_err(|err| anyhow!(err))?;
            let version = planner.snapshot_version().unwrap_or_default();
            if json {
                print_json(&serde_json::json!({ "updated": updated, "version": version }))?;
            } else if updated {
                println!("SDE snapshot updated to {version}.");
            } else {
                println!("SDE snapshot {version} is already current.");
            }
        }
        Command::Status => {
            let metadata = match planner.sync() {
                Some(sync) => sync.metadata()?.unwrap_or_default(),
                None => Default::default(),
            };
            let status = serde_json::json!({
                "snapshot_version": planner.snapshot_version(),
                "updated_at": metadata.updated_at,
                "source": metadata.source,
                "auto_update_occurred": planner.sde_auto_update_occurred(),
                "eula_accepted": planner.get_eula_accepted(),
            });
            if json {
                print_json(&status)?;
            } else {
                println!(
                    "Snapshot: {}",
                    planner
                        .snapshot_version()
                        .unwrap_or_else(|| "not loaded".to_string())
                );
                if let Some(updated_at) = metadata.updated_at {
                    println!("Updated:  {}", updated_at.to_rfc3339());
                }
                println!("Auto-update started: {}", planner.sde_auto_update_occurred());
                println!("EULA accepted: {}", planner.get_eula_accepted());
            }
        }
        Command::Eula { action } => match action {
            EulaAction::Accept | EulaAction::Decline => {
                let accepted = matches!(action, EulaAction::Accept);
                planner
                    .set_eula_accepted(accepted)
                    .map_err(|err| anyhow!(err))?;
                println!("EULA {}.", if accepted { "accepted" } else { "declined" });
            }
            EulaAction::Status => {
                let accepted = planner.get_eula_accepted();
                if json {
                    print_json(&accepted)?;
                } else {
                    println!("EULA accepted: {accepted}");
                }
            }
        },
        Command::Serve => {
            let _watcher = match planner.sync() {
                Some(sync) if config.watch_snapshot => Some(SnapshotWatcher::spawn(
                    sync.snapshot_path(),
                    planner.store().clone(),
                )?),
                _ => None,
            };
            serve::run(planner).await?;
        }
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_plan(rows: &[PlanRow]) {
    if rows.is_empty() {
        println!("Nothing to train.");
        return;
    }
    for (_, name, required, current) in rows {
        let status = if current >= required { "done" } else { "train" };
        println!("{name:<40} {required} (trained {current})  {status}");
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config.data_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("skillplan.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries command output and the serve protocol.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
