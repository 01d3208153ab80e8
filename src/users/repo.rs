use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::domain::{NewUser, User, UserPatch};
use crate::error::{Error, Result};

/// Port for user persistence.
///
/// Implementations must make each call atomic on its own; callers layer no
/// additional locking on top. Email uniqueness is enforced here, so a
/// check-then-create race in a caller still cannot persist a duplicate.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user, assigning its id and creation timestamp.
    /// Fails with [`Error::Conflict`] if the email is already taken.
    async fn create(&self, new: NewUser) -> Result<User>;

    /// Every user, full records. Listing order is not part of the contract.
    async fn list_all(&self) -> Result<Vec<User>>;

    /// Fails with [`Error::NotFound`] if no user has this exact email.
    async fn find_by_email(&self, email: &str) -> Result<User>;

    /// Fails with [`Error::NotFound`] if the id does not resolve.
    async fn find_by_id(&self, id: Uuid) -> Result<User>;

    /// Applies only the fields present in `patch` and returns the updated
    /// record. An email change that collides fails with [`Error::Conflict`].
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User>;

    /// Fails with [`Error::NotFound`] if the id does not resolve.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Postgres-backed adapter. The unique index on `email` makes create and
/// update conflicts authoritative even when callers race their advisory
/// duplicate checks.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), email = COALESCE($3, email)
            WHERE id = $1
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}
