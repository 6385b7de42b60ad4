//! Post-write notification hooks.

use async_trait::async_trait;

use crate::types::Entity;

/// Callback invoked after each successful create or update batch.
///
/// Replaces the console's informational log lines interleaved with
/// persistence. Observers run after the write has committed and cannot fail
/// the write path.
#[async_trait]
pub trait InheritanceObserver: Send + Sync {
    /// Entities that were just inserted, ids populated.
    async fn entities_created(&self, entities: &[Entity]);

    /// Entities that were just updated in place.
    async fn entities_updated(&self, entities: &[Entity]);
}

/// Observer emitting one tracing line per written entity.
#[derive(Debug, Default)]
pub struct LogObserver;

#[async_trait]
impl InheritanceObserver for LogObserver {
    async fn entities_created(&self, entities: &[Entity]) {
        for entity in entities {
            tracing::info!(
                entity_id = ?entity.id,
                container_id = entity.container_id,
                name = %entity.name,
                "Created entity"
            );
        }
    }

    async fn entities_updated(&self, entities: &[Entity]) {
        for entity in entities {
            tracing::info!(
                entity_id = ?entity.id,
                container_id = entity.container_id,
                name = %entity.name,
                "Updated entity"
            );
        }
    }
}
