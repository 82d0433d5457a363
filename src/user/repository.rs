//! Handle user database requests.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::store::{ensure_affected, one_row};
use crate::user::User;

/// Persistence port for [`User`] rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user, returning its external ID.
    async fn create(&self, user: &User) -> Result<String>;

    /// Find a live user by username.
    async fn get_by_username(&self, username: &str) -> Result<User>;

    /// Find a live user by email.
    async fn get_by_email(&self, email: &str) -> Result<User>;

    /// Find a live user by external ID.
    async fn get_by_external_id(&self, id: &str) -> Result<User>;

    /// Add roles not already held by the user.
    async fn add_roles(&self, id: &str, roles: &[String]) -> Result<()>;

    /// Remove the given roles from the user.
    async fn remove_roles(&self, id: &str, roles: &[String]) -> Result<()>;

    /// Mark the user's email as confirmed.
    async fn verify(&self, id: &str) -> Result<()>;

    /// Toggle the active flag.
    async fn set_active(&self, id: &str, active: bool) -> Result<()>;

    /// Soft-delete the user.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Replace the stored password hash.
    async fn update_password(&self, id: &str, password: &str) -> Result<()>;
}

const SELECT_USER: &str = r#"SELECT id, external_id, email, username,
    password, roles, active, verified FROM users"#;

/// PostgreSQL adapter for [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool<Postgres>,
}

impl PgUserStore {
    /// Create a new [`PgUserStore`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn get_user(&self, clause: &str, arg: &str) -> Result<User> {
        let query =
            format!("{SELECT_USER} WHERE {clause} AND deleted_at IS NULL");
        let users = sqlx::query_as::<_, User>(&query)
            .bind(arg)
            .fetch_all(&self.pool)
            .await?;

        one_row(users)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &User) -> Result<String> {
        let external_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"INSERT INTO users (external_id, email, username, password, roles)
                VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&external_id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.roles)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                if db.constraint().is_some_and(|c| c.contains("username")) {
                    ServerError::UsernameAlreadyExists
                } else {
                    ServerError::EmailAlreadyExists
                }
            }
            _ => err.into(),
        })?;

        Ok(external_id)
    }

    async fn get_by_username(&self, username: &str) -> Result<User> {
        self.get_user("username = $1", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        self.get_user("email = $1", email).await
    }

    async fn get_by_external_id(&self, id: &str) -> Result<User> {
        self.get_user("external_id = $1", id).await
    }

    async fn add_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        let user = self.get_by_external_id(id).await?;

        let mut updated = user.roles.clone();
        updated.extend(
            roles
                .iter()
                .filter(|role| !user.roles.contains(role))
                .cloned(),
        );

        if updated.len() == user.roles.len() {
            return Ok(());
        }

        let result = sqlx::query(
            r#"UPDATE users SET roles = $1 WHERE external_id = $2"#,
        )
        .bind(&updated)
        .bind(id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }

    async fn remove_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        let user = self.get_by_external_id(id).await?;

        let updated: Vec<String> = user
            .roles
            .into_iter()
            .filter(|role| !roles.contains(role))
            .collect();

        let result = sqlx::query(
            r#"UPDATE users SET roles = $1 WHERE external_id = $2"#,
        )
        .bind(&updated)
        .bind(id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }

    async fn verify(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE users SET verified = true
                WHERE external_id = $1 AND deleted_at IS NULL"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE users SET active = $1
                WHERE external_id = $2 AND deleted_at IS NULL"#,
        )
        .bind(active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE users SET deleted_at = NOW(), active = false
                WHERE external_id = $1 AND deleted_at IS NULL"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }

    async fn update_password(&self, id: &str, password: &str) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE users SET password = $1
                WHERE external_id = $2 AND deleted_at IS NULL"#,
        )
        .bind(password)
        .bind(id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result)
    }
}
