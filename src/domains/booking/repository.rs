use crate::errors::{DbError, DomainError, DomainResult};
use crate::domains::booking::types::{Booking, BookingRow, BookingStatus, DATE_FORMAT};
use crate::domains::core::repository::FindById;
use crate::types::timestamp_now;
use chrono::NaiveDate;
use sqlx::{SqlitePool, query, query_as, query_scalar, Transaction, Sqlite};
use async_trait::async_trait;

/// Values of a booking row computed by the service before insert
#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub room_property_id: i64,
    pub user_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i64,
    pub total_price: f64,
}

#[async_trait]
pub trait BookingRepository: Send + Sync + FindById<Booking> {
    async fn insert_with_tx(
        &self,
        record: &BookingRecord,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Booking>;

    /// True when a pending or confirmed booking of the room overlaps [check_in, check_out)
    async fn has_overlap_with_tx(
        &self,
        room_property_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<bool>;

    /// Move a booking from `from` to `to`. Returns false when the stored status was no longer `from`.
    async fn update_status_with_tx(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<bool>;

    async fn list_by_room(&self, room_property_id: i64) -> DomainResult<Vec<Booking>>;
}

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FindById<Booking> for SqliteBookingRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<Booking> {
        query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Booking".to_string(), id))?
            .into_entity()
    }

    async fn find_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Booking> {
        query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Booking".to_string(), id))?
            .into_entity()
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn insert_with_tx(
        &self,
        record: &BookingRecord,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Booking> {
        let now = timestamp_now();
        let result = query(
            "INSERT INTO bookings (
                room_property_id, user_id, check_in, check_out, guests, total_price, status,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(record.room_property_id)
        .bind(record.user_id)
        .bind(record.check_in.format(DATE_FORMAT).to_string())
        .bind(record.check_out.format(DATE_FORMAT).to_string())
        .bind(record.guests)
        .bind(record.total_price)
        .bind(BookingStatus::Pending.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        self.find_by_id_with_tx(result.last_insert_rowid(), tx).await
    }

    async fn has_overlap_with_tx(
        &self,
        room_property_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<bool> {
        let count: i64 = query_scalar(
            "SELECT COUNT(*) FROM bookings
             WHERE room_property_id = ?
               AND status IN ('pending', 'confirmed')
               AND check_in < ?
               AND check_out > ?"
        )
        .bind(room_property_id)
        .bind(check_out.format(DATE_FORMAT).to_string())
        .bind(check_in.format(DATE_FORMAT).to_string())
        .fetch_one(&mut **tx)
        .await
        .map_err(DbError::from)?;

        Ok(count > 0)
    }

    async fn update_status_with_tx(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<bool> {
        let result = query("UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(timestamp_now())
            .bind(id)
            .bind(from.as_str())
            .execute(&mut **tx)
            .await
            .map_err(DbError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_room(&self, room_property_id: i64) -> DomainResult<Vec<Booking>> {
        let rows = query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE room_property_id = ? ORDER BY check_in, id"
        )
        .bind(room_property_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter().map(BookingRow::into_entity).collect()
    }
}
