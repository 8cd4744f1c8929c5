use crate::errors::{DbError, DomainError, DomainResult, ValidationError};
use crate::domains::catalog::types::{CatalogItem, CatalogItemRow, CatalogKind};
use crate::types::timestamp_now;
use crate::validation::find_missing_ids_with_tx;
use std::collections::BTreeSet;
use sqlx::{SqlitePool, QueryBuilder, query, query_as, Transaction, Sqlite};
use async_trait::async_trait;
use log::debug;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    fn kind(&self) -> CatalogKind;

    async fn create(&self, name: &str) -> DomainResult<CatalogItem>;

    async fn find_by_id(&self, id: i64) -> DomainResult<CatalogItem>;

    /// Every entry, ordered by name
    async fn find_all(&self) -> DomainResult<Vec<CatalogItem>>;

    /// The entries among `ids`, ordered by name. Unknown ids are skipped.
    async fn find_by_ids_with_tx(
        &self,
        ids: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Vec<CatalogItem>>;

    /// The ids among `ids` with no catalog row
    async fn find_missing_ids_with_tx(
        &self,
        ids: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Vec<i64>>;

    async fn rename(&self, id: i64, name: &str) -> DomainResult<CatalogItem>;

    /// Delete the entry together with every membership row pointing at it
    async fn delete(&self, id: i64) -> DomainResult<()>;
}

pub struct SqliteCatalogRepository {
    pool: SqlitePool,
    kind: CatalogKind,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool, kind: CatalogKind) -> Self {
        Self { pool, kind }
    }

    fn not_found(&self, id: i64) -> DomainError {
        DomainError::EntityNotFound(self.kind.entity_name().to_string(), id)
    }

    fn map_write_error(e: DbError) -> DomainError {
        if e.is_unique_violation() {
            DomainError::Validation(ValidationError::unique("name"))
        } else {
            DomainError::Database(e)
        }
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    fn kind(&self) -> CatalogKind {
        self.kind
    }

    async fn create(&self, name: &str) -> DomainResult<CatalogItem> {
        let now = timestamp_now();
        let sql = format!(
            "INSERT INTO {} (name, created_at, updated_at) VALUES (?, ?, ?)",
            self.kind.table()
        );
        let result = query(&sql)
            .bind(name.trim())
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(DbError::from(e)))?;

        self.find_by_id(result.last_insert_rowid()).await
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<CatalogItem> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", self.kind.table());
        query_as::<_, CatalogItemRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| self.not_found(id))?
            .into_entity()
    }

    async fn find_all(&self) -> DomainResult<Vec<CatalogItem>> {
        let sql = format!("SELECT * FROM {} ORDER BY name, id", self.kind.table());
        let rows = query_as::<_, CatalogItemRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        rows.into_iter().map(CatalogItemRow::into_entity).collect()
    }

    async fn find_by_ids_with_tx(
        &self,
        ids: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Vec<CatalogItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT * FROM {} WHERE id IN (",
            self.kind.table()
        ));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY name, id");

        let rows = builder
            .build_query_as::<CatalogItemRow>()
            .fetch_all(&mut **tx)
            .await
            .map_err(DbError::from)?;

        rows.into_iter().map(CatalogItemRow::into_entity).collect()
    }

    async fn find_missing_ids_with_tx(
        &self,
        ids: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Vec<i64>> {
        find_missing_ids_with_tx(tx, self.kind.table(), ids).await
    }

    async fn rename(&self, id: i64, name: &str) -> DomainResult<CatalogItem> {
        let sql = format!("UPDATE {} SET name = ?, updated_at = ? WHERE id = ?", self.kind.table());
        let result = query(&sql)
            .bind(name.trim())
            .bind(timestamp_now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(DbError::from(e)))?;

        if result.rows_affected() == 0 {
            return Err(self.not_found(id));
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let result = async {
            let detached = self.kind.membership().clear_child_with_tx(id, &mut tx).await?;

            let sql = format!("DELETE FROM {} WHERE id = ?", self.kind.table());
            let deleted = query(&sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?;

            if deleted.rows_affected() == 0 {
                return Err(self.not_found(id));
            }
            debug!("Deleted {} {} and {} memberships", self.kind.entity_name(), id, detached);
            Ok(())
        }.await;

        match result {
            Ok(()) => {
                tx.commit().await.map_err(DbError::from)?;
                Ok(())
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }
}
