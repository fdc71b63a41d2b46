//! Diff of resolved requirements against a character's trained levels.

use crate::models::{SkillPlanEntry, TrainedSkills};

use super::resolver::RequirementSet;

/// Build the ordered training plan for `requirements`.
///
/// Entries are sorted by required level, then prerequisite depth, then skill
/// id. Requirements the character already meets stay in the plan.
pub fn compute_plan(requirements: &RequirementSet, trained: &TrainedSkills) -> Vec<SkillPlanEntry> {
    let mut rows: Vec<_> = requirements
        .iter()
        .map(|requirement| {
            let entry = SkillPlanEntry {
                skill_id: requirement.skill_id,
                skill_name: requirement.skill_name.clone(),
                required_level: requirement.required_level,
                current_level: trained.level(requirement.skill_id),
            };
            (requirement.depth, entry)
        })
        .collect();

    rows.sort_by_key(|(depth, entry)| (entry.required_level, *depth, entry.skill_id));
    rows.into_iter().map(|(_, entry)| entry).collect()
}

/// Sum of levels still to train across a plan.
pub fn remaining_levels(plan: &[SkillPlanEntry]) -> u32 {
    plan.iter().map(SkillPlanEntry::remaining_levels).sum()
}
