//! Small deterministic catalogs for unit tests.

use crate::{
    error::EngineResult,
    models::{FitVariant, Module, Ship, Skill},
};

use super::{
    LevelRequirement, ModuleDefinition, SdeSnapshot, ShipDefinition, SkillDefinition,
    SnapshotDocument,
};

pub const SPACESHIP_COMMAND: i64 = 3327;
pub const MINMATAR_FRIGATE: i64 = 3329;
pub const MINMATAR_DESTROYER: i64 = 33092;
pub const MINMATAR_CRUISER: i64 = 3333;
pub const GUNNERY: i64 = 3300;
pub const SMALL_PROJECTILE_TURRET: i64 = 3302;
pub const MECHANICS: i64 = 3392;
pub const HULL_UPGRADES: i64 = 3394;

pub const RIFTER: i64 = 587;
pub const SLASHER: i64 = 585;
pub const THRASHER: i64 = 16242;
pub const RUPTURE: i64 = 629;

pub const AUTOCANNON: i64 = 484;
pub const DAMAGE_CONTROL: i64 = 2046;

pub struct CatalogBuilder {
    document: SnapshotDocument,
}

impl CatalogBuilder {
    pub fn new(version: &str) -> Self {
        Self {
            document: SnapshotDocument {
                version: version.to_string(),
                generated_at: None,
                skills: Vec::new(),
                ships: Vec::new(),
                modules: Vec::new(),
            },
        }
    }

    pub fn skill(mut self, skill_id: i64, name: &str, rank: u32, prerequisites: &[(i64, u8)]) -> Self {
        self.document.skills.push(SkillDefinition {
            skill_id,
            skill_name: name.to_string(),
            rank,
            prerequisites: requirements(prerequisites),
        });
        self
    }

    pub fn ship(
        mut self,
        ship_id: i64,
        name: &str,
        group_name: Option<&str>,
        required: &[(i64, u8)],
    ) -> Self {
        self.document.ships.push(ShipDefinition {
            ship_id,
            ship_name: name.to_string(),
            group_name: group_name.map(str::to_string),
            required_skills: requirements(required),
        });
        self
    }

    pub fn module(mut self, module_id: i64, name: &str, required: &[(i64, u8)]) -> Self {
        self.document.modules.push(ModuleDefinition {
            module_id,
            module_name: name.to_string(),
            required_skills: requirements(required),
        });
        self
    }

    pub fn document(self) -> SnapshotDocument {
        self.document
    }

    pub fn try_build(self) -> EngineResult<SdeSnapshot> {
        SdeSnapshot::from_document(self.document)
    }

    pub fn build(self) -> SdeSnapshot {
        self.try_build().expect("fixture catalog should be valid")
    }
}

fn requirements(pairs: &[(i64, u8)]) -> Vec<LevelRequirement> {
    pairs
        .iter()
        .map(|&(skill_id, level)| LevelRequirement { skill_id, level })
        .collect()
}

pub fn sample_builder(version: &str) -> CatalogBuilder {
    CatalogBuilder::new(version)
        .skill(SPACESHIP_COMMAND, "Spaceship Command", 1, &[])
        .skill(MINMATAR_FRIGATE, "Minmatar Frigate", 2, &[(SPACESHIP_COMMAND, 1)])
        .skill(MINMATAR_DESTROYER, "Minmatar Destroyer", 2, &[(MINMATAR_FRIGATE, 3)])
        .skill(MINMATAR_CRUISER, "Minmatar Cruiser", 5, &[(MINMATAR_DESTROYER, 3)])
        .skill(GUNNERY, "Gunnery", 1, &[])
        .skill(SMALL_PROJECTILE_TURRET, "Small Projectile Turret", 1, &[(GUNNERY, 1)])
        .skill(MECHANICS, "Mechanics", 1, &[])
        .skill(HULL_UPGRADES, "Hull Upgrades", 2, &[(MECHANICS, 2)])
        .ship(RIFTER, "Rifter", Some("Frigate"), &[(MINMATAR_FRIGATE, 1)])
        .ship(SLASHER, "Slasher", Some("Frigate"), &[(MINMATAR_FRIGATE, 1)])
        .ship(THRASHER, "Thrasher", Some("Destroyer"), &[(MINMATAR_DESTROYER, 1)])
        .ship(RUPTURE, "Rupture", Some("Cruiser"), &[(MINMATAR_CRUISER, 1)])
        .module(
            AUTOCANNON,
            "125mm Gatling AutoCannon I",
            &[(SMALL_PROJECTILE_TURRET, 1), (GUNNERY, 1)],
        )
        .module(DAMAGE_CONTROL, "Damage Control I", &[(HULL_UPGRADES, 1)])
}

pub fn sample_catalog() -> SdeSnapshot {
    sample_builder("2024-10-01").build()
}

pub fn ship(catalog: &SdeSnapshot, ship_id: i64) -> Ship {
    catalog
        .ship(ship_id)
        .expect("fixture ship should exist")
        .to_ship()
}

pub fn module(catalog: &SdeSnapshot, module_id: i64) -> Module {
    let definition = catalog
        .module(module_id)
        .expect("fixture module should exist");
    Module {
        module_id,
        module_name: definition.module_name.clone(),
    }
}

pub fn fit(catalog: &SdeSnapshot, ship_id: i64, module_ids: &[i64]) -> FitVariant {
    FitVariant {
        fit_name: "Fixture Fit".to_string(),
        ship: ship(catalog, ship_id),
        modules: module_ids
            .iter()
            .map(|&module_id| module(catalog, module_id))
            .collect(),
        rationale: "fixture".to_string(),
    }
}

pub fn trained(levels: &[(i64, i32)]) -> Vec<Skill> {
    levels
        .iter()
        .map(|&(skill_id, active_level)| Skill {
            skill_id,
            skill_name: None,
            active_level,
        })
        .collect()
}
