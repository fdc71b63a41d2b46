//! Skill point and training time estimates for a plan.

use std::{f64::consts::SQRT_2, time::Duration};

use serde::Serialize;

use crate::{
    catalog::SdeSnapshot,
    error::{EngineError, EngineResult},
    models::{SkillPlanEntry, MAX_SKILL_LEVEL},
};

/// Skill points needed to reach `level` from zero for a skill of `rank`.
pub fn skill_points_for_level(rank: u32, level: u8) -> u64 {
    if level == 0 {
        return 0;
    }
    // 250 * rank * 2^(2.5 * (level - 1)), keeping whole powers of two exact.
    let steps = i32::from(level.min(MAX_SKILL_LEVEL) - 1);
    let mut factor = 2f64.powi(5 * steps / 2);
    if steps % 2 == 1 {
        factor *= SQRT_2;
    }
    (250.0 * f64::from(rank) * factor).ceil() as u64
}

/// Remaining training for one plan entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryEstimate {
    /// Type id of the skill.
    pub skill_id: i64,
    /// Display name of the skill.
    pub skill_name: String,
    /// Skill points between the current and required level.
    pub skill_points: u64,
    /// Time to train `skill_points` at the configured rate.
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
}

/// Remaining training for a whole plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingEstimate {
    /// One estimate per plan entry, in plan order.
    pub entries: Vec<EntryEstimate>,
    /// Sum of `skill_points` over all entries.
    pub total_skill_points: u64,
    /// Sum of `duration` over all entries.
    #[serde(serialize_with = "serialize_duration")]
    pub total_duration: Duration,
}

impl TrainingEstimate {
    /// Formatted duration keyed by skill id, as consumed by the timeline view.
    pub fn formatted_times(&self) -> Vec<(i64, String)> {
        self.entries
            .iter()
            .map(|entry| (entry.skill_id, format_duration(entry.duration)))
            .collect()
    }
}

/// Estimate remaining training for `plan` at `skill_points_per_minute`.
pub fn estimate(
    plan: &[SkillPlanEntry],
    catalog: &SdeSnapshot,
    skill_points_per_minute: f64,
) -> EngineResult<TrainingEstimate> {
    if skill_points_per_minute.is_nan()
        || skill_points_per_minute <= 0.0
        || !skill_points_per_minute.is_finite()
    {
        return Err(EngineError::InvalidInput(format!(
            "training rate must be positive, got {skill_points_per_minute}"
        )));
    }

    let mut entries = Vec::with_capacity(plan.len());
    let mut total_skill_points = 0;
    let mut total_duration = Duration::ZERO;
    for entry in plan {
        let rank = catalog.lookup(entry.skill_id)?.rank;
        let skill_points = if entry.is_complete() {
            0
        } else {
            skill_points_for_level(rank, entry.required_level)
                - skill_points_for_level(rank, entry.current_level)
        };
        let duration = Duration::try_from_secs_f64(
            skill_points as f64 * 60.0 / skill_points_per_minute,
        )
        .map_err(|_| rate_too_small(skill_points_per_minute))?;

        total_skill_points += skill_points;
        total_duration = total_duration
            .checked_add(duration)
            .ok_or_else(|| rate_too_small(skill_points_per_minute))?;
        entries.push(EntryEstimate {
            skill_id: entry.skill_id,
            skill_name: entry.skill_name.clone(),
            skill_points,
            duration,
        });
    }

    Ok(TrainingEstimate {
        entries,
        total_skill_points,
        total_duration,
    })
}

fn rate_too_small(skill_points_per_minute: f64) -> EngineError {
    EngineError::InvalidInput(format!(
        "training rate {skill_points_per_minute} is too small to estimate"
    ))
}

/// Render a duration as `1d 2h 3m`, rounding up to whole minutes.
pub fn format_duration(duration: Duration) -> String {
    let minutes = (duration.as_secs() + 59) / 60;
    let days = minutes / (24 * 60);
    let hours = (minutes / 60) % 24;
    let minutes = minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 || parts.is_empty() {
        parts.push(format!("{minutes}m"));
    }
    parts.join(" ")
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_duration(*duration))
}
