//! # Vigil Inheritance
//!
//! Template-to-host inheritance propagation for the vigil monitoring
//! catalog.
//!
//! Entities (monitored-metric groupings such as applications) live on
//! containers (hosts or templates). Entities defined on a template are
//! mirrored onto every container linked to that template: existing mirrors
//! are updated in place, missing ones are created, and a name collision
//! with an entity inherited from a different template aborts the whole
//! operation. Because templates can be linked to other templates, one
//! propagation call walks the entire chain level by level.
//!
//! ## Architecture
//!
//! ```text
//! sources ──► resolve targets ──► index existing ──► reconcile
//!                 (links)        (by origin / name)  (create/update/conflict)
//!                                                          │
//!            next level sources ◄── persist batches ◄──────┘
//! ```
//!
//! The walk is iterative with a per-call visited set, so a cyclic link
//! graph surfaces as [`InheritError::CyclicInheritance`] instead of
//! looping.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vigil_inheritance::{InheritanceEngine, PgEntityStore};
//!
//! let store = Arc::new(PgEntityStore::new(pool));
//! let engine = InheritanceEngine::new(store);
//!
//! // Mirror every entity of template 10 onto hosts 21 and 22, then walk
//! // any deeper template chains.
//! engine.link(10, &[21, 22]).await?;
//! ```

pub mod engine;
pub mod error;
pub mod index;
pub mod observer;
pub mod pg;
pub mod reconcile;
pub mod store;
pub mod types;

pub use engine::{EngineConfig, InheritanceEngine};
pub use error::{InheritError, InheritResult};
pub use index::{ContainerIndex, EntityIndex};
pub use observer::{InheritanceObserver, LogObserver};
pub use pg::PgEntityStore;
pub use reconcile::reconcile;
pub use store::{EntityStore, InMemoryEntityStore};
pub use types::{ContainerId, Entity, EntityId};
