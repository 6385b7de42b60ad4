//! Postgres-backed entity store.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::instrument;

use crate::error::{InheritError, InheritResult};
use crate::store::EntityStore;
use crate::types::{ContainerId, Entity, EntityId};

/// Entity store backed by Postgres.
///
/// Expects an `entities` table (`id BIGSERIAL`, `name`, `container_id`,
/// `origin_id`, `attributes JSONB`) and a `container_links` table mapping
/// containers to the templates they are linked to. Container rows themselves
/// live in the external directory and are only referenced by id here.
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    /// Create a new store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row from database query.
#[derive(Debug, sqlx::FromRow)]
struct EntityRow {
    id: EntityId,
    name: String,
    container_id: ContainerId,
    origin_id: Option<EntityId>,
    attributes: Value,
}

impl EntityRow {
    fn into_entity(self) -> InheritResult<Entity> {
        let attributes: Map<String, Value> = match self.attributes {
            Value::Null => Map::new(),
            other => serde_json::from_value(other)?,
        };
        Ok(Entity {
            id: Some(self.id),
            name: self.name,
            container_id: self.container_id,
            // Legacy rows store 0 for "not inherited".
            origin_id: self.origin_id.filter(|id| *id != 0),
            attributes,
        })
    }
}

fn attributes_json(entity: &Entity) -> Value {
    Value::Object(entity.attributes.clone())
}

#[async_trait]
impl EntityStore for PgEntityStore {
    #[instrument(skip(self))]
    async fn find_by_container_ids(
        &self,
        container_ids: &[ContainerId],
    ) -> InheritResult<Vec<Entity>> {
        let rows: Vec<EntityRow> = sqlx::query_as(
            r"
            SELECT id, name, container_id, origin_id, attributes
            FROM entities
            WHERE container_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(container_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EntityRow::into_entity).collect()
    }

    #[instrument(skip(self))]
    async fn find_links(&self, template_ids: &[ContainerId]) -> InheritResult<Vec<ContainerId>> {
        let rows: Vec<(ContainerId,)> = sqlx::query_as(
            r"
            SELECT DISTINCT container_id
            FROM container_links
            WHERE template_id = ANY($1)
            ORDER BY container_id
            ",
        )
        .bind(template_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    #[instrument(skip(self, entity), fields(name = %entity.name, container_id = entity.container_id))]
    async fn insert_one(&self, mut entity: Entity) -> InheritResult<Entity> {
        let (id,): (EntityId,) = sqlx::query_as(
            r"
            INSERT INTO entities (name, container_id, origin_id, attributes)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&entity.name)
        .bind(entity.container_id)
        .bind(entity.origin_id)
        .bind(attributes_json(&entity))
        .fetch_one(&self.pool)
        .await?;

        entity.id = Some(id);
        Ok(entity)
    }

    #[instrument(skip(self, entities), fields(count = entities.len()))]
    async fn insert_many(&self, entities: Vec<Entity>) -> InheritResult<Vec<Entity>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(entities.len());

        for mut entity in entities {
            let (id,): (EntityId,) = sqlx::query_as(
                r"
                INSERT INTO entities (name, container_id, origin_id, attributes)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                ",
            )
            .bind(&entity.name)
            .bind(entity.container_id)
            .bind(entity.origin_id)
            .bind(attributes_json(&entity))
            .fetch_one(&mut *tx)
            .await?;

            entity.id = Some(id);
            inserted.push(entity);
        }

        tx.commit().await?;
        Ok(inserted)
    }

    #[instrument(skip(self, entities), fields(count = entities.len()))]
    async fn update_many(&self, entities: &[Entity]) -> InheritResult<()> {
        let mut tx = self.pool.begin().await?;

        for entity in entities {
            let id = entity.id.ok_or_else(|| InheritError::UnsavedSource {
                name: entity.name.clone(),
            })?;

            sqlx::query(
                r"
                UPDATE entities
                SET name = $2, container_id = $3, origin_id = $4, attributes = $5
                WHERE id = $1
                ",
            )
            .bind(id)
            .bind(&entity.name)
            .bind(entity.container_id)
            .bind(entity.origin_id)
            .bind(attributes_json(entity))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
