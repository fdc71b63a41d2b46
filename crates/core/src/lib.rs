#![warn(clippy::all, missing_docs)]

//! Core domain logic for the EVE skill planner.
//!
//! This crate hosts the SDE catalog and its refresh pipeline, the pure
//! skill gap and ship progression engine, EVEMon export, and the command
//! boundary used by the CLI and any desktop shell.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod eula;
pub mod export;
pub mod manifest;
pub mod models;
pub mod sde;

pub use catalog::{CatalogStore, SdeSnapshot};
pub use commands::{SkillPlanner, EULA_REQUIRED};
pub use config::AppConfig;
pub use error::{EngineError, EngineResult};
pub use eula::EulaStore;
pub use manifest::SnapshotMetadata;
pub use models::{
    FitValidation, FitVariant, Module, PlanRow, ProgressionRow, ProgressionSuggestion, Ship,
    ShipTier, Skill, SkillPlanEntry, SkillRequirement,
};
pub use sde::{SdeSync, SnapshotWatcher, SyncEvent};
