//! Engine error kinds surfaced to callers.

use std::fmt;

use thiserror::Error;

/// Kind of catalog entity referenced by a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A trainable skill.
    Skill,
    /// A ship hull.
    Ship,
    /// A fittable module.
    Module,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Skill => "skill",
            EntityKind::Ship => "ship",
            EntityKind::Module => "module",
        };
        f.write_str(label)
    }
}

/// Failures that abort a skill plan, progression, or export request.
///
/// None of these are downgraded into an empty or partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A requirement or input referenced an id the catalog does not know.
    #[error("unknown {kind} id {id}")]
    NotFound {
        /// Which catalog table was consulted.
        kind: EntityKind,
        /// The id that failed to resolve.
        id: i64,
    },

    /// The catalog snapshot is internally inconsistent (cycles, bad levels).
    #[error("catalog is corrupt: {0}")]
    CatalogCorrupt(String),

    /// The caller supplied a malformed fit, skill list, or plan.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No SDE snapshot has been loaded yet.
    #[error("no SDE snapshot is loaded; refresh the static data first")]
    SnapshotUnavailable,
}

impl EngineError {
    pub(crate) fn skill_not_found(id: i64) -> Self {
        EngineError::NotFound {
            kind: EntityKind::Skill,
            id,
        }
    }
}

/// Result alias used by the engine.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_entity() {
        let err = EngineError::NotFound {
            kind: EntityKind::Module,
            id: 2048,
        };
        assert_eq!(err.to_string(), "unknown module id 2048");
        assert_eq!(
            EngineError::skill_not_found(3327).to_string(),
            "unknown skill id 3327"
        );
    }
}
