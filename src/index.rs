//! Per-container lookup maps over existing entities.

use std::collections::HashMap;

use crate::types::{ContainerId, Entity, EntityId};

/// Existing entities of one container, keyed two ways.
#[derive(Debug, Clone, Default)]
pub struct ContainerIndex {
    /// Entities keyed by the template entity they mirror.
    pub by_origin: HashMap<EntityId, Entity>,

    /// Entities keyed by name.
    pub by_name: HashMap<String, Entity>,
}

/// Lookup maps for a batch of target containers.
///
/// Every requested container id is present, even with zero entities, so
/// downstream lookups need no existence checks.
#[derive(Debug, Default)]
pub struct EntityIndex {
    containers: HashMap<ContainerId, ContainerIndex>,
}

impl EntityIndex {
    /// Build the index for `container_ids` from their existing entities.
    ///
    /// Entities owned by containers outside `container_ids` are ignored.
    #[must_use]
    pub fn build(container_ids: &[ContainerId], entities: Vec<Entity>) -> Self {
        let mut containers: HashMap<ContainerId, ContainerIndex> = container_ids
            .iter()
            .map(|id| (*id, ContainerIndex::default()))
            .collect();

        for entity in entities {
            let Some(index) = containers.get_mut(&entity.container_id) else {
                continue;
            };
            if let Some(origin_id) = entity.origin_id {
                index.by_origin.insert(origin_id, entity.clone());
            }
            index.by_name.insert(entity.name.clone(), entity);
        }

        Self { containers }
    }

    /// Container ids covered by this index, in ascending order.
    #[must_use]
    pub fn container_ids(&self) -> Vec<ContainerId> {
        let mut ids: Vec<ContainerId> = self.containers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Lookup maps for one container.
    #[must_use]
    pub fn container(&self, id: ContainerId) -> Option<&ContainerIndex> {
        self.containers.get(&id)
    }

    /// Number of indexed containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether the index covers no containers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(id: EntityId, name: &str, container_id: ContainerId, origin_id: Option<EntityId>) -> Entity {
        Entity {
            id: Some(id),
            origin_id,
            ..Entity::new(name, container_id)
        }
    }

    #[test]
    fn test_every_requested_container_present() {
        let index = EntityIndex::build(&[1, 2, 3], vec![saved(10, "CPU", 2, None)]);
        assert_eq!(index.len(), 3);
        assert!(index.container(1).unwrap().by_name.is_empty());
        assert!(index.container(3).unwrap().by_name.is_empty());
    }

    #[test]
    fn test_dual_keyed_lookup() {
        let index = EntityIndex::build(
            &[2],
            vec![saved(10, "CPU", 2, Some(5)), saved(11, "Memory", 2, None)],
        );
        let container = index.container(2).unwrap();

        assert_eq!(container.by_origin.len(), 1);
        assert_eq!(container.by_origin.get(&5).unwrap().name, "CPU");
        assert_eq!(container.by_name.len(), 2);
        assert_eq!(container.by_name.get("Memory").unwrap().id, Some(11));
    }

    #[test]
    fn test_foreign_entities_ignored() {
        let index = EntityIndex::build(&[1], vec![saved(10, "CPU", 9, Some(5))]);
        assert!(index.container(1).unwrap().by_name.is_empty());
        assert!(index.container(9).is_none());
    }

    #[test]
    fn test_container_ids_sorted() {
        let index = EntityIndex::build(&[3, 1, 2], vec![]);
        assert_eq!(index.container_ids(), vec![1, 2, 3]);
    }
}
