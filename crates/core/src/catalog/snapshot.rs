use std::collections::{btree_map::Entry, BTreeMap};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{EngineError, EngineResult, EntityKind},
    models::{Ship, ShipTier, MAX_SKILL_LEVEL},
};

/// A `(skill, level)` pair demanded by a type or by another skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRequirement {
    pub skill_id: i64,
    pub level: u8,
}

/// Skill definition from the SDE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub skill_id: i64,
    pub skill_name: String,
    /// Training time multiplier.
    #[serde(default = "default_rank")]
    pub rank: u32,
    #[serde(default)]
    pub prerequisites: Vec<LevelRequirement>,
}

fn default_rank() -> u32 {
    1
}

/// Ship definition from the SDE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipDefinition {
    pub ship_id: i64,
    pub ship_name: String,
    /// Inventory group, e.g. `Assault Frigate`.
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<LevelRequirement>,
}

impl ShipDefinition {
    pub fn to_ship(&self) -> Ship {
        Ship {
            ship_id: self.ship_id,
            ship_name: self.ship_name.clone(),
        }
    }
}

/// Module definition from the SDE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub module_id: i64,
    pub module_name: String,
    #[serde(default)]
    pub required_skills: Vec<LevelRequirement>,
}

/// Serialized form of a snapshot as produced by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skills: Vec<SkillDefinition>,
    #[serde(default)]
    pub ships: Vec<ShipDefinition>,
    #[serde(default)]
    pub modules: Vec<ModuleDefinition>,
}

/// Immutable, id-indexed view of one SDE snapshot.
///
/// Dangling skill references are kept as-is and reported as
/// [`EngineError::NotFound`] when a request touches them.
#[derive(Debug, Clone)]
pub struct SdeSnapshot {
    version: String,
    generated_at: Option<DateTime<Utc>>,
    skills: BTreeMap<i64, SkillDefinition>,
    ships: BTreeMap<i64, ShipDefinition>,
    modules: BTreeMap<i64, ModuleDefinition>,
}

impl SdeSnapshot {
    /// Index and validate a snapshot document.
    pub fn from_document(document: SnapshotDocument) -> EngineResult<Self> {
        let SnapshotDocument {
            version,
            generated_at,
            skills: skill_list,
            ships: ship_list,
            modules: module_list,
        } = document;

        if version.trim().is_empty() {
            return Err(EngineError::CatalogCorrupt(
                "snapshot has an empty version".to_string(),
            ));
        }

        let mut skills = BTreeMap::new();
        for skill in skill_list {
            if skill.rank == 0 {
                return Err(EngineError::CatalogCorrupt(format!(
                    "skill {} has rank 0",
                    skill.skill_id
                )));
            }
            validate_levels(EntityKind::Skill, skill.skill_id, &skill.prerequisites)?;
            insert_unique(&mut skills, EntityKind::Skill, skill.skill_id, skill)?;
        }

        let mut ships = BTreeMap::new();
        for ship in ship_list {
            validate_levels(EntityKind::Ship, ship.ship_id, &ship.required_skills)?;
            insert_unique(&mut ships, EntityKind::Ship, ship.ship_id, ship)?;
        }

        let mut modules = BTreeMap::new();
        for module in module_list {
            validate_levels(EntityKind::Module, module.module_id, &module.required_skills)?;
            insert_unique(&mut modules, EntityKind::Module, module.module_id, module)?;
        }

        Ok(Self {
            version,
            generated_at,
            skills,
            ships,
            modules,
        })
    }

    /// Parse and index a JSON snapshot document.
    pub fn from_json(bytes: &[u8]) -> EngineResult<Self> {
        let document: SnapshotDocument = serde_json::from_slice(bytes).map_err(|err| {
            EngineError::CatalogCorrupt(format!("snapshot document is malformed: {err}"))
        })?;
        Self::from_document(document)
    }

    /// Rebuild the serializable document, ordered by id.
    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            version: self.version.clone(),
            generated_at: self.generated_at,
            skills: self.skills.values().cloned().collect(),
            ships: self.ships.values().cloned().collect(),
            modules: self.modules.values().cloned().collect(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Skill definition by id.
    pub fn lookup(&self, skill_id: i64) -> EngineResult<&SkillDefinition> {
        self.skills
            .get(&skill_id)
            .ok_or_else(|| EngineError::skill_not_found(skill_id))
    }

    /// Direct prerequisites of a skill, in catalog order.
    pub fn prerequisites_of(&self, skill_id: i64) -> EngineResult<&[LevelRequirement]> {
        self.lookup(skill_id)
            .map(|skill| skill.prerequisites.as_slice())
    }

    pub fn ship(&self, ship_id: i64) -> EngineResult<&ShipDefinition> {
        self.ships.get(&ship_id).ok_or(EngineError::NotFound {
            kind: EntityKind::Ship,
            id: ship_id,
        })
    }

    pub fn module(&self, module_id: i64) -> EngineResult<&ModuleDefinition> {
        self.modules.get(&module_id).ok_or(EngineError::NotFound {
            kind: EntityKind::Module,
            id: module_id,
        })
    }

    /// All ships ordered by id.
    pub fn ships(&self) -> impl Iterator<Item = &ShipDefinition> {
        self.ships.values()
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    /// Tier bucket of a ship.
    ///
    /// Known hulls are classified by their inventory group, falling back to
    /// the name; hulls outside the catalog are classified by name alone.
    pub fn classify(&self, ship: &Ship) -> Option<ShipTier> {
        match self.ships.get(&ship.ship_id) {
            Some(definition) => definition
                .group_name
                .as_deref()
                .and_then(classify_label)
                .or_else(|| classify_label(&definition.ship_name)),
            None => classify_label(&ship.ship_name),
        }
    }
}

/// Match a tier name as a whole word, e.g. `Heavy Assault Cruiser`.
pub(crate) fn classify_label(label: &str) -> Option<ShipTier> {
    static TIER_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b(battlecruiser|battleship|destroyer|cruiser|frigate)s?\b")
            .expect("invalid tier regex")
    });

    let caps = TIER_RE.captures(label)?;
    let word = caps.get(1)?.as_str().to_ascii_lowercase();
    ShipTier::ALL
        .into_iter()
        .find(|tier| tier.label().eq_ignore_ascii_case(&word))
}

fn validate_levels(kind: EntityKind, id: i64, requirements: &[LevelRequirement]) -> EngineResult<()> {
    for requirement in requirements {
        if requirement.level == 0 || requirement.level > MAX_SKILL_LEVEL {
            return Err(EngineError::CatalogCorrupt(format!(
                "{kind} {id} requires skill {} at level {}",
                requirement.skill_id, requirement.level
            )));
        }
    }
    Ok(())
}

fn insert_unique<T>(
    map: &mut BTreeMap<i64, T>,
    kind: EntityKind,
    id: i64,
    value: T,
) -> EngineResult<()> {
    match map.entry(id) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
        Entry::Occupied(_) => Err(EngineError::CatalogCorrupt(format!(
            "duplicate {kind} id {id}"
        ))),
    }
}
