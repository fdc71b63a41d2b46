//! Skill gap and progression engine.
//!
//! Every function here is a pure computation over one catalog snapshot and
//! the caller's inputs, so requests can run concurrently without locking.

pub mod gap;
pub mod progression;
pub mod resolver;
pub mod training;

use tracing::debug;

use crate::{
    catalog::SdeSnapshot,
    error::EngineResult,
    models::{FitValidation, FitVariant, ProgressionSuggestion, Ship, Skill, SkillPlanEntry, TrainedSkills},
};

pub use gap::{compute_plan, remaining_levels};
pub use progression::next_ship;
pub use resolver::{resolve_fit, resolve_ship, RequirementSet, ResolvedRequirement};
pub use training::{estimate, format_duration, skill_points_for_level, TrainingEstimate};

/// Ordered training plan for `fit`, including requirements already met.
pub fn plan_for_fit(
    catalog: &SdeSnapshot,
    fit: &FitVariant,
    user_skills: &[Skill],
) -> EngineResult<Vec<SkillPlanEntry>> {
    let trained = TrainedSkills::from_skills(user_skills)?;
    let requirements = resolve_fit(catalog, fit)?;
    Ok(compute_plan(&requirements, &trained))
}

/// Best next hull for a character, or `None` when nothing is left to unlock.
pub fn next_ship_progression(
    catalog: &SdeSnapshot,
    user_skills: &[Skill],
    eligible_ships: &[Ship],
    all_ships: &[Ship],
) -> EngineResult<Option<ProgressionSuggestion>> {
    let trained = TrainedSkills::from_skills(user_skills)?;
    next_ship(catalog, &trained, eligible_ships, all_ships)
}

/// Skill-side validation of a fit.
pub fn validate_fit(
    catalog: &SdeSnapshot,
    fit: &FitVariant,
    user_skills: &[Skill],
) -> EngineResult<FitValidation> {
    let plan = plan_for_fit(catalog, fit, user_skills)?;
    let missing_requirements: Vec<String> = plan
        .iter()
        .filter(|entry| !entry.is_complete())
        .map(|entry| {
            format!(
                "{} Level {} (trained {})",
                entry.skill_name, entry.required_level, entry.current_level
            )
        })
        .collect();

    let mut warnings = Vec::new();
    if fit.modules.is_empty() {
        warnings.push("fit has no modules".to_string());
    }

    Ok(FitValidation {
        is_valid: missing_requirements.is_empty(),
        missing_requirements,
        warnings,
    })
}

/// Catalog ships whose requirements are fully trained, ordered by id.
pub fn eligible_ships(catalog: &SdeSnapshot, user_skills: &[Skill]) -> EngineResult<Vec<Ship>> {
    let trained = TrainedSkills::from_skills(user_skills)?;
    let mut eligible = Vec::new();
    for ship in catalog.ships() {
        let requirements = resolve_ship(catalog, ship.ship_id)?;
        let plan = compute_plan(&requirements, &trained);
        if plan.iter().all(SkillPlanEntry::is_complete) {
            eligible.push(ship.to_ship());
        }
    }
    debug!(eligible = eligible.len(), "matched flyable ships");
    Ok(eligible)
}
