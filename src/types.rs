//! Entity records propagated between containers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of an entity row in the entity store.
pub type EntityId = i64;

/// Identifier of a container (host or template) in the external directory.
pub type ContainerId = i64;

/// A monitored-metric grouping owned by a container.
///
/// Entities authored on a template are mirrored onto every container linked
/// to it; mirrors point back at the template entity through `origin_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Store-assigned identifier; `None` until persisted.
    pub id: Option<EntityId>,

    /// Entity name, unique within its container.
    pub name: String,

    /// Owning container.
    pub container_id: ContainerId,

    /// Template entity this one mirrors; `None` when directly authored.
    pub origin_id: Option<EntityId>,

    /// Remaining mirrored fields, kept schema-flexible.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Entity {
    /// Create a directly authored entity, not yet persisted.
    #[must_use]
    pub fn new(name: impl Into<String>, container_id: ContainerId) -> Self {
        Self {
            id: None,
            name: name.into(),
            container_id,
            origin_id: None,
            attributes: Map::new(),
        }
    }

    /// Attach a mirrored attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Whether this entity was inherited from a template entity.
    #[must_use]
    pub fn is_inherited(&self) -> bool {
        self.origin_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entity_is_unsaved() {
        let entity = Entity::new("Memory", 3);
        assert_eq!(entity.id, None);
        assert_eq!(entity.container_id, 3);
        assert!(!entity.is_inherited());
    }

    #[test]
    fn test_with_attribute() {
        let entity = Entity::new("Memory", 3).with_attribute("sortorder", json!(5));
        assert_eq!(entity.attributes.get("sortorder"), Some(&json!(5)));
    }
}
