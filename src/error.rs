//! Error types for inheritance propagation.

use thiserror::Error;

use crate::types::ContainerId;

/// Result type for inheritance operations.
pub type InheritResult<T> = Result<T, InheritError>;

/// Errors that can occur while propagating entities.
///
/// Every failure aborts the current propagation call; batches already
/// committed at earlier levels are not rolled back.
#[derive(Debug, Error)]
pub enum InheritError {
    /// An inherited name collides, in the target container, with an entity
    /// inherited from a different template entity.
    #[error("Entity \"{name}\" already exists for container {container_id}")]
    NameConflict {
        name: String,
        container_id: ContainerId,
    },

    /// The entity store could not be reached or a query failed.
    #[error("Entity store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Batch insert requested with rows whose field sets differ.
    #[error("Batch insert rows have differing field sets: expected [{expected}], found [{found}]")]
    InconsistentBatchSchema { expected: String, found: String },

    /// A container reappeared while walking the template chain.
    #[error("Cyclic inheritance detected at container {container_id}")]
    CyclicInheritance { container_id: ContainerId },

    /// A source entity reached the reconciler without a persisted id.
    #[error("Source entity \"{name}\" has no identifier")]
    UnsavedSource { name: String },

    /// Entity attributes could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InheritError {
    /// Check if this error is a name conflict.
    #[must_use]
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, InheritError::NameConflict { .. })
    }

    /// Check if this error came from the entity store.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(self, InheritError::Store(_))
    }

    /// Check if this error is a batch schema mismatch.
    #[must_use]
    pub fn is_inconsistent_batch_schema(&self) -> bool {
        matches!(self, InheritError::InconsistentBatchSchema { .. })
    }

    /// Check if this error is a cycle in the link graph.
    #[must_use]
    pub fn is_cyclic_inheritance(&self) -> bool {
        matches!(self, InheritError::CyclicInheritance { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_conflict_display() {
        let err = InheritError::NameConflict {
            name: "CPU".to_string(),
            container_id: 42,
        };
        assert_eq!(
            err.to_string(),
            "Entity \"CPU\" already exists for container 42"
        );
    }

    #[test]
    fn test_cyclic_inheritance_display() {
        let err = InheritError::CyclicInheritance { container_id: 7 };
        assert_eq!(err.to_string(), "Cyclic inheritance detected at container 7");
    }

    #[test]
    fn test_predicates() {
        let err = InheritError::NameConflict {
            name: "CPU".to_string(),
            container_id: 42,
        };
        assert!(err.is_name_conflict());
        assert!(!err.is_store_error());
        assert!(!err.is_cyclic_inheritance());

        let err = InheritError::InconsistentBatchSchema {
            expected: "flags".to_string(),
            found: "flags, sortorder".to_string(),
        };
        assert!(err.is_inconsistent_batch_schema());
        assert!(!err.is_name_conflict());
    }
}
