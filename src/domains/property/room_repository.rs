use crate::errors::{DbError, DomainError, DomainResult};
use crate::domains::core::membership::{MembershipDiff, ROOM_AMENITIES};
use crate::domains::core::repository::FindById;
use crate::domains::property::types::{RoomProperty, RoomPropertyRow, RoomScalars};
use crate::types::timestamp_now;
use std::collections::BTreeSet;
use sqlx::{SqlitePool, QueryBuilder, query, query_as, Transaction, Sqlite};
use async_trait::async_trait;

/// Room repository. Rooms are only written as part of a property reconciliation.
#[async_trait]
pub trait RoomPropertyRepository: Send + Sync + FindById<RoomProperty> {
    /// Rooms of one property, ordered by id
    async fn list_by_property_with_tx(
        &self,
        property_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Vec<RoomProperty>>;

    async fn insert_with_tx(
        &self,
        property_id: i64,
        scalars: &RoomScalars,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<RoomProperty>;

    async fn update_with_tx(
        &self,
        id: i64,
        scalars: &RoomScalars,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<()>;

    /// Delete the room and its amenity memberships. Returns the number of memberships removed.
    async fn delete_with_tx(&self, id: i64, tx: &mut Transaction<'_, Sqlite>) -> DomainResult<u64>;

    /// The rooms among `ids` that have at least one booking, whatever its status
    async fn rooms_with_bookings_with_tx(
        &self,
        ids: &[i64],
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Vec<i64>>;

    async fn amenity_ids_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<BTreeSet<i64>>;

    async fn sync_amenities_with_tx(
        &self,
        id: i64,
        amenity_ids: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<MembershipDiff>;
}

pub struct SqliteRoomPropertyRepository {
    pool: SqlitePool,
}

impl SqliteRoomPropertyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FindById<RoomProperty> for SqliteRoomPropertyRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<RoomProperty> {
        query_as::<_, RoomPropertyRow>("SELECT * FROM room_properties WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("RoomProperty".to_string(), id))?
            .into_entity()
    }

    async fn find_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<RoomProperty> {
        query_as::<_, RoomPropertyRow>("SELECT * FROM room_properties WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("RoomProperty".to_string(), id))?
            .into_entity()
    }
}

#[async_trait]
impl RoomPropertyRepository for SqliteRoomPropertyRepository {
    async fn list_by_property_with_tx(
        &self,
        property_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Vec<RoomProperty>> {
        let rows = query_as::<_, RoomPropertyRow>(
            "SELECT * FROM room_properties WHERE property_id = ? ORDER BY id"
        )
        .bind(property_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(DbError::from)?;

        rows.into_iter().map(RoomPropertyRow::into_entity).collect()
    }

    async fn insert_with_tx(
        &self,
        property_id: i64,
        scalars: &RoomScalars,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<RoomProperty> {
        let now = timestamp_now();
        let result = query(
            "INSERT INTO room_properties (
                property_id, room_type, description, max_guests, room_size, price_per_night,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(property_id)
        .bind(&scalars.room_type)
        .bind(&scalars.description)
        .bind(scalars.max_guests)
        .bind(scalars.room_size)
        .bind(scalars.price_per_night)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        self.find_by_id_with_tx(result.last_insert_rowid(), tx).await
    }

    async fn update_with_tx(
        &self,
        id: i64,
        scalars: &RoomScalars,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<()> {
        let result = query(
            "UPDATE room_properties SET
                room_type = ?, description = ?, max_guests = ?, room_size = ?,
                price_per_night = ?, updated_at = ?
             WHERE id = ?"
        )
        .bind(&scalars.room_type)
        .bind(&scalars.description)
        .bind(scalars.max_guests)
        .bind(scalars.room_size)
        .bind(scalars.price_per_night)
        .bind(timestamp_now())
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("RoomProperty".to_string(), id));
        }
        Ok(())
    }

    async fn delete_with_tx(&self, id: i64, tx: &mut Transaction<'_, Sqlite>) -> DomainResult<u64> {
        let detached = ROOM_AMENITIES.clear_with_tx(id, tx).await?;

        let result = query("DELETE FROM room_properties WHERE id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("RoomProperty".to_string(), id));
        }
        Ok(detached)
    }

    async fn rooms_with_bookings_with_tx(
        &self,
        ids: &[i64],
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT DISTINCT room_property_id FROM bookings WHERE room_property_id IN ("
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY room_property_id");

        let booked = builder
            .build_query_scalar::<i64>()
            .fetch_all(&mut **tx)
            .await
            .map_err(DbError::from)?;
        Ok(booked)
    }

    async fn amenity_ids_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<BTreeSet<i64>> {
        ROOM_AMENITIES.load_with_tx(id, tx).await
    }

    async fn sync_amenities_with_tx(
        &self,
        id: i64,
        amenity_ids: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<MembershipDiff> {
        ROOM_AMENITIES.sync_with_tx(id, amenity_ids, tx).await
    }
}
