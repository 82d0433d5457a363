//! Handle plant database requests.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::error::Result;
use crate::plant::Plant;
use crate::store::{ensure_affected, one_row};

/// Persistence port for [`Plant`] rows.
#[async_trait]
pub trait PlantStore: Send + Sync {
    /// Insert a new plant, returning its ID.
    async fn create(&self, plant: &Plant) -> Result<i64>;

    /// Find a live plant by ID.
    async fn get(&self, id: i64) -> Result<Plant>;

    /// List the live plants owned by a user.
    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Plant>>;

    /// Persist the mutable fields of an updated plant.
    async fn update(&self, plant: &Plant) -> Result<()>;

    /// Tombstone a plant.
    async fn delete(&self, id: i64) -> Result<()>;
}

const SELECT_PLANT: &str = r#"SELECT id, name, acquisition_date, location,
    care_frequency, user_id, created_at, updated_at FROM plants"#;

/// PostgreSQL adapter for [`PlantStore`].
#[derive(Clone)]
pub struct PgPlantStore {
    pool: Pool<Postgres>,
}

impl PgPlantStore {
    /// Create a new [`PgPlantStore`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlantStore for PgPlantStore {
    async fn create(&self, plant: &Plant) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO plants (name, acquisition_date, location,
                care_frequency, user_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id"#,
        )
        .bind(&plant.name)
        .bind(plant.acquisition_date)
        .bind(&plant.location)
        .bind(plant.care_frequency)
        .bind(plant.user_id)
        .bind(plant.created_at)
        .bind(plant.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Plant> {
        let query =
            format!("{SELECT_PLANT} WHERE id = $1 AND deleted_at IS NULL");
        let plants = sqlx::query_as::<_, Plant>(&query)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        one_row(plants)
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Plant>> {
        let query = format!(
            "{SELECT_PLANT} WHERE user_id = $1 AND deleted_at IS NULL"
        );
        let plants = sqlx::query_as::<_, Plant>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(plants)
    }

    async fn update(&self, plant: &Plant) -> Result<()> {
        // Conditional on the row still being live, so an update racing a
        // delete surfaces NotFound instead of silently succeeding.
        let result = sqlx::query(
            r#"UPDATE plants SET name = $1, acquisition_date = $2,
                location = $3, care_frequency = $4, updated_at = $5
                WHERE id = $6 AND deleted_at IS NULL"#,
        )
        .bind(&plant.name)
        .bind(plant.acquisition_date)
        .bind(&plant.location)
        .bind(plant.care_frequency)
        .bind(plant.updated_at)
        .bind(plant.id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE plants SET deleted_at = $1
                WHERE id = $2 AND deleted_at IS NULL"#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }
}
