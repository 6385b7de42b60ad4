//! Inheritance engine orchestrator.
//!
//! Caller-facing entry points and the iterative propagation loop.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{InheritError, InheritResult};
use crate::index::EntityIndex;
use crate::observer::InheritanceObserver;
use crate::reconcile::reconcile;
use crate::store::EntityStore;
use crate::types::{ContainerId, Entity};

/// Configuration for the inheritance engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether propagation inserts created entities as one batch. Batches
    /// with differing attribute key sets fall back to row-at-a-time inserts.
    #[serde(default = "default_batch_insert")]
    pub batch_insert: bool,
}

fn default_batch_insert() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_insert: default_batch_insert(),
        }
    }
}

/// Engine propagating template entities to linked containers.
///
/// One propagation call runs all levels of the template chain to completion
/// before returning. Each insert/update batch is atomic, but the call as a
/// whole is not: a conflict found at level two leaves level one committed.
/// Callers needing all-or-nothing semantics wrap the call in an external
/// transaction boundary.
pub struct InheritanceEngine {
    store: Arc<dyn EntityStore>,
    config: EngineConfig,
    observer: Option<Arc<dyn InheritanceObserver>>,
}

impl InheritanceEngine {
    /// Create a new engine over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            observer: None,
        }
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set an observer notified after each successful write batch.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn InheritanceObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create new entities, returning them with store-assigned ids.
    ///
    /// When `batch` is true all entities go through one batch insert and
    /// must carry the same attribute keys, otherwise the call fails with
    /// [`InheritError::InconsistentBatchSchema`].
    #[instrument(skip(self, entities), fields(count = entities.len()))]
    pub async fn create(&self, entities: Vec<Entity>, batch: bool) -> InheritResult<Vec<Entity>> {
        if entities.is_empty() {
            return Ok(entities);
        }

        let created = if batch {
            check_batch_schema(&entities)?;
            self.store.insert_many(entities).await?
        } else {
            let mut created = Vec::with_capacity(entities.len());
            for entity in entities {
                created.push(self.store.insert_one(entity).await?);
            }
            created
        };

        if let Some(observer) = &self.observer {
            observer.entities_created(&created).await;
        }

        Ok(created)
    }

    /// Update existing entities in place, each keyed by its id.
    #[instrument(skip(self, entities), fields(count = entities.len()))]
    pub async fn update(&self, entities: Vec<Entity>) -> InheritResult<Vec<Entity>> {
        if entities.is_empty() {
            return Ok(entities);
        }

        self.store.update_many(&entities).await?;

        if let Some(observer) = &self.observer {
            observer.entities_updated(&entities).await;
        }

        Ok(entities)
    }

    /// Propagate all of a template's entities to the given containers.
    #[instrument(skip(self))]
    pub async fn link(
        &self,
        template_id: ContainerId,
        container_ids: &[ContainerId],
    ) -> InheritResult<()> {
        let entities = self.store.find_by_container_ids(&[template_id]).await?;
        self.propagate(entities, container_ids).await
    }

    /// Propagate `sources` to `explicit_targets`, or to every container
    /// linked to the sources' owners when no targets are given, then walk
    /// deeper template chains until no further linked containers exist.
    ///
    /// The usual flow: entities are created or updated on a template, then
    /// propagated with no explicit targets so every container linked to
    /// that template receives them; containers that are themselves
    /// templates feed the next level. The walk keeps a visited set seeded
    /// with the source containers; a container reappearing fails with
    /// [`InheritError::CyclicInheritance`].
    #[instrument(skip(self, sources), fields(source_count = sources.len(), explicit_count = explicit_targets.len()))]
    pub async fn propagate(
        &self,
        sources: Vec<Entity>,
        explicit_targets: &[ContainerId],
    ) -> InheritResult<()> {
        let mut visited: HashSet<ContainerId> =
            sources.iter().map(|e| e.container_id).collect();
        let mut sources = sources;
        let mut explicit: Vec<ContainerId> = explicit_targets.to_vec();
        let mut level = 0usize;

        loop {
            if sources.is_empty() {
                return Ok(());
            }

            let mut targets = if explicit.is_empty() {
                let mut owners: Vec<ContainerId> =
                    sources.iter().map(|e| e.container_id).collect();
                owners.sort_unstable();
                owners.dedup();
                self.store.find_links(&owners).await?
            } else {
                std::mem::take(&mut explicit)
            };
            targets.sort_unstable();
            targets.dedup();

            if targets.is_empty() {
                tracing::debug!(level, "No further linked containers, propagation complete");
                return Ok(());
            }

            for &target in &targets {
                if !visited.insert(target) {
                    return Err(InheritError::CyclicInheritance {
                        container_id: target,
                    });
                }
            }

            let existing = self.store.find_by_container_ids(&targets).await?;
            let index = EntityIndex::build(&targets, existing);
            let records = reconcile(&sources, &index)?;

            tracing::debug!(
                level,
                targets = targets.len(),
                records = records.len(),
                "Reconciled propagation level"
            );

            sources = self.persist(records).await?;
            level += 1;
        }
    }

    /// Write reconciled records, splitting creates from updates.
    async fn persist(&self, records: Vec<Entity>) -> InheritResult<Vec<Entity>> {
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        for record in records {
            if record.id.is_some() {
                updates.push(record);
            } else {
                creates.push(record);
            }
        }

        let batch = self.config.batch_insert && check_batch_schema(&creates).is_ok();
        let mut written = self.create(creates, batch).await?;
        written.extend(self.update(updates).await?);
        Ok(written)
    }
}

/// Verify that every entity carries the same attribute key set, the
/// precondition of the batch-insert path.
fn check_batch_schema(entities: &[Entity]) -> InheritResult<()> {
    let Some(first) = entities.first() else {
        return Ok(());
    };
    let expected = attribute_keys(first);

    for entity in &entities[1..] {
        let found = attribute_keys(entity);
        if found != expected {
            return Err(InheritError::InconsistentBatchSchema {
                expected: expected.join(", "),
                found: found.join(", "),
            });
        }
    }

    Ok(())
}

fn attribute_keys(entity: &Entity) -> Vec<&str> {
    let mut keys: Vec<&str> = entity.attributes.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}
