//! Entity store trait and the in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{InheritError, InheritResult};
use crate::types::{ContainerId, Entity, EntityId};

/// Persistence capability set consumed by the inheritance engine.
///
/// Implemented by [`PgEntityStore`](crate::pg::PgEntityStore) for Postgres
/// and by [`InMemoryEntityStore`] for tests.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// All entities owned by the given containers.
    async fn find_by_container_ids(
        &self,
        container_ids: &[ContainerId],
    ) -> InheritResult<Vec<Entity>>;

    /// Containers linked to at least one of the given templates.
    async fn find_links(&self, template_ids: &[ContainerId]) -> InheritResult<Vec<ContainerId>>;

    /// Insert one entity, returning it with the store-assigned id.
    async fn insert_one(&self, entity: Entity) -> InheritResult<Entity>;

    /// Insert a batch of entities atomically; ids are assigned in input order.
    async fn insert_many(&self, entities: Vec<Entity>) -> InheritResult<Vec<Entity>>;

    /// Update entities in place, each keyed by its id.
    async fn update_many(&self, entities: &[Entity]) -> InheritResult<()>;
}

/// In-memory implementation of [`EntityStore`] for testing.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: EntityId,
    entities: HashMap<EntityId, Entity>,
    // Key: template container, Value: containers linked to it
    links: HashMap<ContainerId, Vec<ContainerId>>,
}

impl Inner {
    fn insert(&mut self, mut entity: Entity) -> Entity {
        self.next_id += 1;
        entity.id = Some(self.next_id);
        self.entities.insert(self.next_id, entity.clone());
        entity
    }
}

impl InMemoryEntityStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `container_id` as linked to `template_id` (for testing).
    pub fn link_container(&self, template_id: ContainerId, container_id: ContainerId) {
        self.inner
            .write()
            .expect("lock poisoned")
            .links
            .entry(template_id)
            .or_default()
            .push(container_id);
    }

    /// Insert an entity synchronously (for testing).
    pub fn seed(&self, entity: Entity) -> Entity {
        self.inner.write().expect("lock poisoned").insert(entity)
    }

    /// All entities owned by a container, ordered by id (for testing).
    pub fn entities_in(&self, container_id: ContainerId) -> Vec<Entity> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut entities: Vec<Entity> = inner
            .entities
            .values()
            .filter(|e| e.container_id == container_id)
            .cloned()
            .collect();
        entities.sort_by_key(|e| e.id);
        entities
    }

    /// Total entity count (for testing).
    pub fn count(&self) -> usize {
        self.inner.read().expect("lock poisoned").entities.len()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn find_by_container_ids(
        &self,
        container_ids: &[ContainerId],
    ) -> InheritResult<Vec<Entity>> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut entities: Vec<Entity> = inner
            .entities
            .values()
            .filter(|e| container_ids.contains(&e.container_id))
            .cloned()
            .collect();
        entities.sort_by_key(|e| e.id);
        Ok(entities)
    }

    async fn find_links(&self, template_ids: &[ContainerId]) -> InheritResult<Vec<ContainerId>> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut linked: Vec<ContainerId> = template_ids
            .iter()
            .filter_map(|id| inner.links.get(id))
            .flatten()
            .copied()
            .collect();
        linked.sort_unstable();
        linked.dedup();
        Ok(linked)
    }

    async fn insert_one(&self, entity: Entity) -> InheritResult<Entity> {
        Ok(self.inner.write().expect("lock poisoned").insert(entity))
    }

    async fn insert_many(&self, entities: Vec<Entity>) -> InheritResult<Vec<Entity>> {
        let mut inner = self.inner.write().expect("lock poisoned");
        Ok(entities.into_iter().map(|e| inner.insert(e)).collect())
    }

    async fn update_many(&self, entities: &[Entity]) -> InheritResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        for entity in entities {
            let id = entity.id.ok_or_else(|| InheritError::UnsavedSource {
                name: entity.name.clone(),
            })?;
            inner.entities.insert(id, entity.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryEntityStore::new();
        let created = store
            .insert_many(vec![Entity::new("CPU", 1), Entity::new("Memory", 1)])
            .await
            .unwrap();

        assert_eq!(created[0].id, Some(1));
        assert_eq!(created[1].id, Some(2));
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn test_find_by_container_ids_filters() {
        let store = InMemoryEntityStore::new();
        store.seed(Entity::new("CPU", 1));
        store.seed(Entity::new("Memory", 2));

        let found = store.find_by_container_ids(&[2]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Memory");
    }

    #[tokio::test]
    async fn test_find_links_dedups() {
        let store = InMemoryEntityStore::new();
        store.link_container(1, 5);
        store.link_container(2, 5);
        store.link_container(2, 6);

        let linked = store.find_links(&[1, 2]).await.unwrap();
        assert_eq!(linked, vec![5, 6]);
        assert!(store.find_links(&[9]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_many_overwrites() {
        let store = InMemoryEntityStore::new();
        let mut entity = store.seed(Entity::new("CPU", 1));
        entity.name = "CPU load".to_string();

        store.update_many(&[entity]).await.unwrap();

        let found = store.entities_in(1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "CPU load");
    }

    #[tokio::test]
    async fn test_update_many_requires_id() {
        let store = InMemoryEntityStore::new();
        let err = store.update_many(&[Entity::new("CPU", 1)]).await.unwrap_err();
        assert!(matches!(err, InheritError::UnsavedSource { .. }));
    }
}
