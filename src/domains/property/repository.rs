use crate::errors::{DbError, DomainError, DomainResult};
use crate::domains::core::membership::{MembershipDiff, PROPERTY_FACILITIES};
use crate::domains::core::repository::FindById;
use crate::domains::property::types::{Property, PropertyRow};
use crate::types::{timestamp_now, PaginatedResult, PaginationParams};
use std::collections::BTreeSet;
use sqlx::{SqlitePool, query, query_as, query_scalar, Transaction, Sqlite};
use async_trait::async_trait;

/// Property repository trait
#[async_trait]
pub trait PropertyRepository: Send + Sync + FindById<Property> {
    async fn find_by_place_id_with_tx(
        &self,
        place_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Option<Property>>;

    /// Insert a new property at version 1. A place that is already bound fails with a conflict.
    async fn insert_with_tx(
        &self,
        owner_id: i64,
        place_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Property>;

    /// Set the owner and bump the version. With `expected_version`, a stale version is a conflict.
    async fn touch_owner_with_tx(
        &self,
        id: i64,
        owner_id: i64,
        expected_version: Option<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Property>;

    /// Delete the property; rooms, memberships and bookings go with it
    async fn delete_with_tx(&self, id: i64, tx: &mut Transaction<'_, Sqlite>) -> DomainResult<()>;

    /// Number of bookings held by the property's rooms, whatever their status
    async fn booking_count_with_tx(&self, id: i64, tx: &mut Transaction<'_, Sqlite>) -> DomainResult<i64>;

    async fn facility_ids_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<BTreeSet<i64>>;

    async fn sync_facilities_with_tx(
        &self,
        id: i64,
        facility_ids: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<MembershipDiff>;

    async fn find_all(&self, params: PaginationParams) -> DomainResult<PaginatedResult<Property>>;
}

/// SQLite implementation of PropertyRepository
pub struct SqlitePropertyRepository {
    pool: SqlitePool,
}

impl SqlitePropertyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row_to_entity(row: PropertyRow) -> DomainResult<Property> {
        row.into_entity()
    }
}

#[async_trait]
impl FindById<Property> for SqlitePropertyRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<Property> {
        let row = query_as::<_, PropertyRow>("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Property".to_string(), id))?;

        Self::map_row_to_entity(row)
    }

    async fn find_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Property> {
        let row = query_as::<_, PropertyRow>("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Property".to_string(), id))?;

        Self::map_row_to_entity(row)
    }
}

#[async_trait]
impl PropertyRepository for SqlitePropertyRepository {
    async fn find_by_place_id_with_tx(
        &self,
        place_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Option<Property>> {
        let row = query_as::<_, PropertyRow>("SELECT * FROM properties WHERE place_id = ?")
            .bind(place_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        row.map(Self::map_row_to_entity).transpose()
    }

    async fn insert_with_tx(
        &self,
        owner_id: i64,
        place_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Property> {
        let now = timestamp_now();
        let result = query(
            "INSERT INTO properties (owner_id, place_id, version, created_at, updated_at)
             VALUES (?, ?, 1, ?, ?)"
        )
        .bind(owner_id)
        .bind(place_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from);

        match result {
            Ok(done) => self.find_by_id_with_tx(done.last_insert_rowid(), tx).await,
            Err(e) if e.is_unique_violation() => Err(DomainError::Conflict(format!(
                "Place {} already has a property", place_id
            ))),
            Err(e) => Err(DomainError::Database(e)),
        }
    }

    async fn touch_owner_with_tx(
        &self,
        id: i64,
        owner_id: i64,
        expected_version: Option<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Property> {
        let result = query(
            "UPDATE properties SET owner_id = ?1, version = version + 1, updated_at = ?2
             WHERE id = ?3 AND (?4 IS NULL OR version = ?4)"
        )
        .bind(owner_id)
        .bind(timestamp_now())
        .bind(id)
        .bind(expected_version)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            // Either the row is gone or someone else bumped the version first
            let current = self.find_by_id_with_tx(id, tx).await?;
            return Err(DomainError::Conflict(format!(
                "Property {} is at version {}, expected {}",
                id,
                current.version,
                expected_version.unwrap_or(current.version)
            )));
        }

        self.find_by_id_with_tx(id, tx).await
    }

    async fn delete_with_tx(&self, id: i64, tx: &mut Transaction<'_, Sqlite>) -> DomainResult<()> {
        let result = query("DELETE FROM properties WHERE id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("Property".to_string(), id));
        }
        Ok(())
    }

    async fn booking_count_with_tx(&self, id: i64, tx: &mut Transaction<'_, Sqlite>) -> DomainResult<i64> {
        let count: i64 = query_scalar(
            "SELECT COUNT(*) FROM bookings b
             JOIN room_properties r ON r.id = b.room_property_id
             WHERE r.property_id = ?"
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(DbError::from)?;
        Ok(count)
    }

    async fn facility_ids_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<BTreeSet<i64>> {
        PROPERTY_FACILITIES.load_with_tx(id, tx).await
    }

    async fn sync_facilities_with_tx(
        &self,
        id: i64,
        facility_ids: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<MembershipDiff> {
        PROPERTY_FACILITIES.sync_with_tx(id, facility_ids, tx).await
    }

    async fn find_all(&self, params: PaginationParams) -> DomainResult<PaginatedResult<Property>> {
        let total: i64 = query_scalar("SELECT COUNT(*) FROM properties")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        let rows = query_as::<_, PropertyRow>(
            "SELECT * FROM properties ORDER BY id LIMIT ? OFFSET ?"
        )
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(Self::map_row_to_entity)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total as u64, params))
    }
}
