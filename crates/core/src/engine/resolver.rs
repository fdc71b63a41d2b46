//! Expansion of ship and module requirements into a full skill set.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::{
    catalog::{LevelRequirement, SdeSnapshot},
    error::{EngineError, EngineResult},
    models::FitVariant,
};

/// A requirement after prerequisite expansion and max-level merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequirement {
    /// Type id of the skill.
    pub skill_id: i64,
    /// Display name from the catalog.
    pub skill_name: String,
    /// Highest level demanded by any source.
    pub required_level: u8,
    /// Length of the longest prerequisite chain below this skill.
    pub depth: u32,
}

/// Deduplicated requirements keyed by skill id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    entries: BTreeMap<i64, ResolvedRequirement>,
}

impl RequirementSet {
    /// Number of distinct skills.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is required.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requirement for one skill, if any source demands it.
    pub fn get(&self, skill_id: i64) -> Option<&ResolvedRequirement> {
        self.entries.get(&skill_id)
    }

    /// Requirements ordered by skill id.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedRequirement> {
        self.entries.values()
    }

    fn merge(&mut self, skill_id: i64, skill_name: &str, level: u8, depth: u32) {
        self.entries
            .entry(skill_id)
            .and_modify(|existing| {
                existing.required_level = existing.required_level.max(level);
            })
            .or_insert_with(|| ResolvedRequirement {
                skill_id,
                skill_name: skill_name.to_string(),
                required_level: level,
                depth,
            });
    }
}

/// Requirements to fly the fit's hull and operate every fitted module.
pub fn resolve_fit(catalog: &SdeSnapshot, fit: &FitVariant) -> EngineResult<RequirementSet> {
    let mut walker = PrerequisiteWalker::new(catalog);
    let mut set = RequirementSet::default();

    let ship = catalog.ship(fit.ship.ship_id)?;
    walker.add_all(&mut set, &ship.required_skills)?;
    for module in &fit.modules {
        let definition = catalog.module(module.module_id)?;
        walker.add_all(&mut set, &definition.required_skills)?;
    }

    debug!(
        fit = %fit.fit_name,
        modules = fit.modules.len(),
        skills = set.len(),
        "resolved fit requirements"
    );
    Ok(set)
}

/// Requirements to fly a single hull.
pub fn resolve_ship(catalog: &SdeSnapshot, ship_id: i64) -> EngineResult<RequirementSet> {
    let ship = catalog.ship(ship_id)?;
    resolve_requirements(catalog, &ship.required_skills)
}

/// Expand an arbitrary list of direct requirements.
pub fn resolve_requirements(
    catalog: &SdeSnapshot,
    direct: &[LevelRequirement],
) -> EngineResult<RequirementSet> {
    let mut walker = PrerequisiteWalker::new(catalog);
    let mut set = RequirementSet::default();
    walker.add_all(&mut set, direct)?;
    Ok(set)
}

/// Depth-first walk over prerequisite chains with cycle detection.
struct PrerequisiteWalker<'a> {
    catalog: &'a SdeSnapshot,
    depths: HashMap<i64, u32>,
    visiting: Vec<i64>,
    expanded: HashSet<i64>,
}

impl<'a> PrerequisiteWalker<'a> {
    fn new(catalog: &'a SdeSnapshot) -> Self {
        Self {
            catalog,
            depths: HashMap::new(),
            visiting: Vec::new(),
            expanded: HashSet::new(),
        }
    }

    fn add_all(&mut self, set: &mut RequirementSet, direct: &[LevelRequirement]) -> EngineResult<()> {
        for requirement in direct {
            self.add(set, requirement.skill_id, requirement.level)?;
        }
        Ok(())
    }

    fn add(&mut self, set: &mut RequirementSet, skill_id: i64, level: u8) -> EngineResult<()> {
        let name = self.catalog.lookup(skill_id)?.skill_name.clone();
        let depth = self.depth(skill_id)?;
        set.merge(skill_id, &name, level, depth);

        // Prerequisites do not depend on the level demanded, so expand each skill once.
        if self.expanded.insert(skill_id) {
            let catalog = self.catalog;
            for prerequisite in catalog.prerequisites_of(skill_id)? {
                self.add(set, prerequisite.skill_id, prerequisite.level)?;
            }
        }
        Ok(())
    }

    fn depth(&mut self, skill_id: i64) -> EngineResult<u32> {
        if let Some(depth) = self.depths.get(&skill_id) {
            return Ok(*depth);
        }
        if let Some(start) = self.visiting.iter().position(|id| *id == skill_id) {
            return Err(self.cycle_error(start, skill_id));
        }

        self.visiting.push(skill_id);
        let catalog = self.catalog;
        let mut depth = 0;
        for prerequisite in catalog.prerequisites_of(skill_id)? {
            depth = depth.max(self.depth(prerequisite.skill_id)? + 1);
        }
        self.visiting.pop();

        self.depths.insert(skill_id, depth);
        Ok(depth)
    }

    fn cycle_error(&self, start: usize, skill_id: i64) -> EngineError {
        let chain = self.visiting[start..]
            .iter()
            .chain(std::iter::once(&skill_id))
            .map(|id| match self.catalog.lookup(*id) {
                Ok(skill) => skill.skill_name.clone(),
                Err(_) => id.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" -> ");
        EngineError::CatalogCorrupt(format!("prerequisite cycle detected: {chain}"))
    }
}
