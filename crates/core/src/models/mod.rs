//! Shared domain models.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Highest trainable level of any skill.
pub const MAX_SKILL_LEVEL: u8 = 5;

/// A character's trained level for one skill, as reported by ESI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Type id of the skill.
    pub skill_id: i64,
    /// Display name, when the caller resolved it.
    #[serde(default)]
    pub skill_name: Option<String>,
    /// Trained level; `0` means untrained.
    pub active_level: i32,
}

/// Ship hull reference data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ship {
    /// Type id of the hull.
    pub ship_id: i64,
    /// Display name of the hull.
    pub ship_name: String,
}

/// Module reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Type id of the module.
    pub module_id: i64,
    /// Display name of the module.
    pub module_name: String,
}

/// A recommended loadout handed to the engine by the fit recommender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitVariant {
    /// Human readable fit name.
    pub fit_name: String,
    /// Hull the fit is built on.
    pub ship: Ship,
    /// Fitted modules in slot order.
    #[serde(default)]
    pub modules: Vec<Module>,
    /// Explanation for the fit.
    #[serde(default)]
    pub rationale: String,
}

/// A skill at the level some ship, module, or prerequisite demands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRequirement {
    /// Type id of the skill.
    pub skill_id: i64,
    /// Display name of the skill.
    pub skill_name: String,
    /// Level demanded, always in `1..=5`.
    pub required_level: u8,
}

impl SkillRequirement {
    /// Wire tuple `(skill_id, skill_name, level)`.
    pub fn to_row(&self) -> (i64, String, u8) {
        (self.skill_id, self.skill_name.clone(), self.required_level)
    }
}

/// Wire row of a skill plan: `(skill_id, skill_name, required_level, current_level)`.
pub type PlanRow = (i64, String, i32, i32);

/// One row of a computed skill plan.
///
/// `current_level` is a snapshot taken when the plan was computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillPlanEntry {
    /// Type id of the skill.
    pub skill_id: i64,
    /// Display name of the skill.
    pub skill_name: String,
    /// Level the fit demands.
    pub required_level: u8,
    /// Level the character had trained at computation time.
    pub current_level: u8,
}

impl SkillPlanEntry {
    /// Whether the character already meets this requirement.
    pub fn is_complete(&self) -> bool {
        self.current_level >= self.required_level
    }

    /// Levels still to train, zero for completed entries.
    pub fn remaining_levels(&self) -> u32 {
        u32::from(self.required_level.saturating_sub(self.current_level))
    }

    /// Wire tuple consumed by the front end.
    pub fn to_row(&self) -> PlanRow {
        (
            self.skill_id,
            self.skill_name.clone(),
            i32::from(self.required_level),
            i32::from(self.current_level),
        )
    }

    /// Parse a wire tuple, rejecting out-of-range levels.
    pub fn from_row(row: PlanRow) -> EngineResult<Self> {
        let (skill_id, skill_name, required, current) = row;
        let required_level = checked_level(required, 1, skill_id, "required")?;
        let current_level = checked_level(current, 0, skill_id, "current")?;
        Ok(Self {
            skill_id,
            skill_name,
            required_level,
            current_level,
        })
    }
}

fn checked_level(value: i32, min: i32, skill_id: i64, which: &str) -> EngineResult<u8> {
    if value < min || value > i32::from(MAX_SKILL_LEVEL) {
        return Err(EngineError::InvalidInput(format!(
            "{which} level {value} for skill {skill_id} is outside {min}..={MAX_SKILL_LEVEL}"
        )));
    }
    Ok(value as u8)
}

/// Coarse hull classes used to rank progression, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShipTier {
    /// T1 frigate hulls.
    Frigate,
    /// Destroyers.
    Destroyer,
    /// Cruisers.
    Cruiser,
    /// Battlecruisers.
    Battlecruiser,
    /// Battleships.
    Battleship,
}

impl ShipTier {
    /// All tiers in ascending order.
    pub const ALL: [ShipTier; 5] = [
        ShipTier::Frigate,
        ShipTier::Destroyer,
        ShipTier::Cruiser,
        ShipTier::Battlecruiser,
        ShipTier::Battleship,
    ];

    /// Human readable bucket name.
    pub fn label(&self) -> &'static str {
        match self {
            ShipTier::Frigate => "Frigate",
            ShipTier::Destroyer => "Destroyer",
            ShipTier::Cruiser => "Cruiser",
            ShipTier::Battlecruiser => "Battlecruiser",
            ShipTier::Battleship => "Battleship",
        }
    }
}

impl fmt::Display for ShipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Wire shape of a progression suggestion: `(tier, ship, [(skill_id, skill_name, level)])`.
pub type ProgressionRow = (String, Ship, Vec<(i64, String, u8)>);

/// Best next hull for a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionSuggestion {
    /// Tier the suggested hull belongs to.
    pub tier: ShipTier,
    /// Suggested hull.
    pub ship: Ship,
    /// Every requirement of the hull in training order.
    pub required_skills: Vec<SkillRequirement>,
    /// Sum of levels still to train across `required_skills`.
    pub remaining_levels: u32,
}

impl ProgressionSuggestion {
    /// Wire tuple consumed by the front end.
    pub fn to_row(&self) -> ProgressionRow {
        (
            self.tier.to_string(),
            self.ship.clone(),
            self.required_skills
                .iter()
                .map(SkillRequirement::to_row)
                .collect(),
        )
    }
}

/// Skill-side validation of a fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitValidation {
    /// True when every requirement is already trained.
    pub is_valid: bool,
    /// Unmet requirements, one readable line each.
    pub missing_requirements: Vec<String>,
    /// Non-fatal observations about the fit.
    pub warnings: Vec<String>,
}

/// Trained levels keyed by skill id, validated from a caller's skill list.
#[derive(Debug, Clone, Default)]
pub struct TrainedSkills {
    levels: HashMap<i64, u8>,
}

impl TrainedSkills {
    /// Validate the caller's skills. Levels must be in `0..=5` and a skill may
    /// only be listed twice if both entries agree.
    pub fn from_skills(skills: &[Skill]) -> EngineResult<Self> {
        let mut levels = HashMap::with_capacity(skills.len());
        for skill in skills {
            let level = checked_level(skill.active_level, 0, skill.skill_id, "trained")?;
            if let Some(previous) = levels.insert(skill.skill_id, level) {
                if previous != level {
                    return Err(EngineError::InvalidInput(format!(
                        "skill {} listed with conflicting levels {previous} and {level}",
                        skill.skill_id
                    )));
                }
            }
        }
        Ok(Self { levels })
    }

    /// Trained level of a skill, `0` when untrained.
    pub fn level(&self, skill_id: i64) -> u8 {
        self.levels.get(&skill_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(skill_id: i64, active_level: i32) -> Skill {
        Skill {
            skill_id,
            skill_name: None,
            active_level,
        }
    }

    #[test]
    fn trained_skills_default_to_zero() {
        let trained = TrainedSkills::from_skills(&[skill(3327, 4)]).expect("valid skills");
        assert_eq!(trained.level(3327), 4);
        assert_eq!(trained.level(3300), 0);
    }

    #[test]
    fn trained_skills_reject_bad_levels() {
        let err = TrainedSkills::from_skills(&[skill(3327, -1)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        let err = TrainedSkills::from_skills(&[skill(3327, 6)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        let err = TrainedSkills::from_skills(&[skill(3327, 2), skill(3327, 3)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn plan_rows_validate_levels() {
        let entry = SkillPlanEntry::from_row((3327, "Spaceship Command".into(), 4, 2))
            .expect("valid row");
        assert_eq!(entry.remaining_levels(), 2);
        assert!(!entry.is_complete());
        assert_eq!(entry.to_row(), (3327, "Spaceship Command".into(), 4, 2));

        assert!(SkillPlanEntry::from_row((3327, "Spaceship Command".into(), 0, 0)).is_err());
        assert!(SkillPlanEntry::from_row((3327, "Spaceship Command".into(), 3, 7)).is_err());
    }

    #[test]
    fn tiers_order_smallest_first() {
        assert!(ShipTier::Frigate < ShipTier::Destroyer);
        assert!(ShipTier::Battlecruiser < ShipTier::Battleship);
        assert_eq!(ShipTier::Cruiser.to_string(), "Cruiser");
    }
}
