use crate::errors::{DbError, DomainError, DomainResult, ValidationError};
use crate::domains::user::types::{User, NewUser, UserRow};
use crate::domains::core::repository::FindById;
use crate::types::timestamp_now;
use sqlx::{SqlitePool, query, query_as, Transaction, Sqlite};
use async_trait::async_trait;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync + FindById<User> {
    /// Create a new user
    async fn create(&self, user: &NewUser) -> DomainResult<User>;

    /// Find a user that exists and is active. Used to validate property owners and guests.
    async fn find_active_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Option<User>>;

    /// Activate or deactivate a user
    async fn set_active(&self, id: i64, active: bool) -> DomainResult<User>;

    /// Find all users
    async fn find_all(&self) -> DomainResult<Vec<User>>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new repository instance
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Helper function to map UserRow to User entity
    fn map_row_to_entity(row: UserRow) -> DomainResult<User> {
        row.into_entity()
    }
}

#[async_trait]
impl FindById<User> for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<User> {
        let row = query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("User".to_string(), id))?;

        Self::map_row_to_entity(row)
    }

    async fn find_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<User> {
        let row = query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("User".to_string(), id))?;

        Self::map_row_to_entity(row)
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &NewUser) -> DomainResult<User> {
        let now = timestamp_now();

        let result = query(
            "INSERT INTO users (name, email, role, active, created_at, updated_at)
             VALUES (?, ?, ?, 1, ?, ?)"
        )
        .bind(user.name.trim())
        .bind(&user.email)
        .bind(&user.role)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from);

        match result {
            Ok(done) => self.find_by_id(done.last_insert_rowid()).await,
            Err(e) if e.is_unique_violation() => {
                Err(DomainError::Validation(ValidationError::unique("email")))
            }
            Err(e) => Err(DomainError::Database(e)),
        }
    }

    async fn find_active_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Option<User>> {
        let row = query_as::<_, UserRow>("SELECT * FROM users WHERE id = ? AND active = 1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        row.map(Self::map_row_to_entity).transpose()
    }

    async fn set_active(&self, id: i64, active: bool) -> DomainResult<User> {
        let result = query("UPDATE users SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active as i64)
            .bind(timestamp_now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("User".to_string(), id));
        }

        self.find_by_id(id).await
    }

    async fn find_all(&self) -> DomainResult<Vec<User>> {
        let rows = query_as::<_, UserRow>("SELECT * FROM users ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter().map(Self::map_row_to_entity).collect()
    }
}
