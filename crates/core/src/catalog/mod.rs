#![allow(missing_docs)]

//! Read-only skill, ship, and module catalog backed by an SDE snapshot.

#[cfg(test)]
pub(crate) mod fixtures;
mod snapshot;
pub mod store;

pub use snapshot::{
    LevelRequirement, ModuleDefinition, SdeSnapshot, ShipDefinition, SkillDefinition,
    SnapshotDocument,
};
pub use store::CatalogStore;
