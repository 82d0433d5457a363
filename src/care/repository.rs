//! Handle care database requests.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::care::Care;
use crate::error::Result;
use crate::store::{ensure_affected, one_row};

/// Persistence port for [`Care`] rows.
#[async_trait]
pub trait CareStore: Send + Sync {
    /// Insert a new care event, returning its ID.
    async fn create(&self, care: &Care) -> Result<i64>;

    /// Find a care event by ID.
    async fn get(&self, id: i64) -> Result<Care>;

    /// List the care events of a plant.
    async fn get_by_plant(&self, plant_id: i64) -> Result<Vec<Care>>;

    /// Persist the mutable fields of an updated care event.
    async fn update(&self, care: &Care) -> Result<()>;

    /// Remove a care event. Unlike plants, rows are physically deleted.
    async fn delete(&self, id: i64) -> Result<()>;
}

const SELECT_CARE: &str = r#"SELECT id, plant_id, user_id, last_care,
    next_care, name, notes, created_at, updated_at FROM cares"#;

/// PostgreSQL adapter for [`CareStore`].
#[derive(Clone)]
pub struct PgCareStore {
    pool: Pool<Postgres>,
}

impl PgCareStore {
    /// Create a new [`PgCareStore`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CareStore for PgCareStore {
    async fn create(&self, care: &Care) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO cares (plant_id, user_id, last_care, next_care,
                name, notes, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id"#,
        )
        .bind(care.plant_id)
        .bind(care.user_id)
        .bind(care.last_care)
        .bind(care.next_care)
        .bind(&care.name)
        .bind(&care.notes)
        .bind(care.created_at)
        .bind(care.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Care> {
        let query = format!("{SELECT_CARE} WHERE id = $1");
        let cares = sqlx::query_as::<_, Care>(&query)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        one_row(cares)
    }

    async fn get_by_plant(&self, plant_id: i64) -> Result<Vec<Care>> {
        let query = format!("{SELECT_CARE} WHERE plant_id = $1");
        let cares = sqlx::query_as::<_, Care>(&query)
            .bind(plant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(cares)
    }

    async fn update(&self, care: &Care) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE cares SET plant_id = $1, user_id = $2, last_care = $3,
                next_care = $4, name = $5, notes = $6, updated_at = $7
                WHERE id = $8"#,
        )
        .bind(care.plant_id)
        .bind(care.user_id)
        .bind(care.last_care)
        .bind(care.next_care)
        .bind(&care.name)
        .bind(&care.notes)
        .bind(care.updated_at)
        .bind(care.id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM cares WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        ensure_affected(result)
    }
}
