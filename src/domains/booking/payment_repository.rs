use crate::errors::{DbError, DomainError, DomainResult};
use crate::domains::booking::types::{Payment, PaymentMethod, PaymentRow, PaymentStatus};
use crate::domains::core::repository::FindById;
use crate::types::timestamp_now;
use sqlx::{SqlitePool, query, query_as, Transaction, Sqlite};
use async_trait::async_trait;

#[async_trait]
pub trait PaymentRepository: Send + Sync + FindById<Payment> {
    async fn insert_with_tx(
        &self,
        booking_id: i64,
        amount: f64,
        method: PaymentMethod,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Payment>;

    /// Guarded status change; `paid_at` is stamped when moving to paid. Returns false when
    /// the stored status was no longer `from`.
    async fn update_status_with_tx(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<bool>;

    async fn list_by_booking(&self, booking_id: i64) -> DomainResult<Vec<Payment>>;
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FindById<Payment> for SqlitePaymentRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<Payment> {
        query_as::<_, PaymentRow>("SELECT * FROM payments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Payment".to_string(), id))?
            .into_entity()
    }

    async fn find_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Payment> {
        query_as::<_, PaymentRow>("SELECT * FROM payments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Payment".to_string(), id))?
            .into_entity()
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn insert_with_tx(
        &self,
        booking_id: i64,
        amount: f64,
        method: PaymentMethod,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Payment> {
        let now = timestamp_now();
        let result = query(
            "INSERT INTO payments (booking_id, amount, method, status, paid_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, NULL, ?, ?)"
        )
        .bind(booking_id)
        .bind(amount)
        .bind(method.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        self.find_by_id_with_tx(result.last_insert_rowid(), tx).await
    }

    async fn update_status_with_tx(
        &self,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<bool> {
        let now = timestamp_now();
        let paid_at = if to == PaymentStatus::Paid { Some(now.clone()) } else { None };

        let result = query(
            "UPDATE payments SET status = ?, paid_at = COALESCE(?, paid_at), updated_at = ?
             WHERE id = ? AND status = ?"
        )
        .bind(to.as_str())
        .bind(paid_at)
        .bind(&now)
        .bind(id)
        .bind(from.as_str())
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_booking(&self, booking_id: i64) -> DomainResult<Vec<Payment>> {
        let rows = query_as::<_, PaymentRow>(
            "SELECT * FROM payments WHERE booking_id = ? ORDER BY id"
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter().map(PaymentRow::into_entity).collect()
    }
}
