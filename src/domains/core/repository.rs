use crate::errors::DomainResult;
use async_trait::async_trait;
use sqlx::{Transaction, Sqlite};

/// Trait for finding entities by ID
#[async_trait]
pub trait FindById<T> {
    /// Find an entity by ID
    async fn find_by_id(&self, id: i64) -> DomainResult<T>;

    /// Find an entity by ID inside an open transaction, seeing its uncommitted writes
    async fn find_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<T>;
}
