//! EVEMon plain-text plan export.

use crate::{
    error::{EngineError, EngineResult},
    models::SkillPlanEntry,
};

/// Serialize a plan as one `<Skill Name> Level <n>` line per entry.
///
/// Entries are written in the order given. An empty plan exports as an empty
/// string.
pub fn export_evemon(plan: &[SkillPlanEntry]) -> EngineResult<String> {
    let mut lines = Vec::with_capacity(plan.len());
    for entry in plan {
        let name = entry.skill_name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput(format!(
                "skill {} has no name",
                entry.skill_id
            )));
        }
        if name.contains(['\n', '\r']) {
            return Err(EngineError::InvalidInput(format!(
                "skill {} name spans multiple lines",
                entry.skill_id
            )));
        }
        lines.push(format!("{} Level {}", name, entry.required_level));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(skill_id: i64, name: &str, required_level: u8, current_level: u8) -> SkillPlanEntry {
        SkillPlanEntry {
            skill_id,
            skill_name: name.to_string(),
            required_level,
            current_level,
        }
    }

    #[test]
    fn exports_one_line_per_entry_in_order() {
        let plan = vec![
            entry(3327, "Spaceship Command", 4, 2),
            entry(3413, "Engineering", 3, 0),
            entry(3300, "Gunnery", 1, 5),
        ];
        let export = export_evemon(&plan).expect("export");
        assert_eq!(
            export,
            "Spaceship Command Level 4\nEngineering Level 3\nGunnery Level 1"
        );
        assert_eq!(export.lines().count(), plan.len());
    }

    #[test]
    fn empty_plan_exports_empty_body() {
        let export = export_evemon(&[]).expect("export");
        assert!(export.is_empty());
        assert_eq!(export.lines().count(), 0);
    }

    #[test]
    fn does_not_reorder() {
        let plan = vec![entry(2, "Zeta", 5, 0), entry(1, "Alpha", 1, 0)];
        assert_eq!(export_evemon(&plan).expect("export"), "Zeta Level 5\nAlpha Level 1");
    }

    #[test]
    fn rejects_names_that_break_lines() {
        let err = export_evemon(&[entry(1, "Bad\nName", 1, 0)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        let err = export_evemon(&[entry(1, "  ", 1, 0)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
