use crate::errors::{DbError, DomainResult};
use crate::domains::booking::types::DATE_FORMAT;
use crate::domains::dashboard::types::{PropertyListingRow, PropertyRevenue};
use crate::types::{format_timestamp, PaginationParams};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqlitePool, query_as, query_scalar};
use async_trait::async_trait;

/// Read-only aggregate queries behind the dashboard
#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn count_properties(&self) -> DomainResult<i64>;

    async fn count_rooms(&self) -> DomainResult<i64>;

    async fn count_bookings(&self) -> DomainResult<i64>;

    async fn total_revenue(&self) -> DomainResult<f64>;

    /// Properties created in [from, to)
    async fn count_properties_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<i64>;

    /// Bookings created in [from, to)
    async fn count_bookings_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<i64>;

    /// Paid payments settled in [from, to)
    async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<f64>;

    /// (status, count) for every status that has at least one booking
    async fn booking_status_counts(&self) -> DomainResult<Vec<(String, i64)>>;

    async fn top_properties_by_revenue(&self, limit: u32) -> DomainResult<Vec<PropertyRevenue>>;

    async fn property_listings(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        params: PaginationParams,
    ) -> DomainResult<(Vec<PropertyListingRow>, i64)>;
}

pub struct SqliteDashboardRepository {
    pool: SqlitePool,
}

impl SqliteDashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> DomainResult<i64> {
        let count: i64 = query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(count)
    }

    async fn count_between(&self, sql: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<i64> {
        let count: i64 = query_scalar(sql)
            .bind(format_timestamp(from))
            .bind(format_timestamp(to))
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(count)
    }
}

#[async_trait]
impl DashboardRepository for SqliteDashboardRepository {
    async fn count_properties(&self) -> DomainResult<i64> {
        self.count("SELECT COUNT(*) FROM properties").await
    }

    async fn count_rooms(&self) -> DomainResult<i64> {
        self.count("SELECT COUNT(*) FROM room_properties").await
    }

    async fn count_bookings(&self) -> DomainResult<i64> {
        self.count("SELECT COUNT(*) FROM bookings").await
    }

    async fn total_revenue(&self) -> DomainResult<f64> {
        let total: f64 = query_scalar(
            "SELECT CAST(COALESCE(SUM(amount), 0) AS REAL) FROM payments WHERE status = 'paid'"
        )
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(total)
    }

    async fn count_properties_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<i64> {
        self.count_between(
            "SELECT COUNT(*) FROM properties WHERE created_at >= ? AND created_at < ?",
            from,
            to,
        )
        .await
    }

    async fn count_bookings_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<i64> {
        self.count_between(
            "SELECT COUNT(*) FROM bookings WHERE created_at >= ? AND created_at < ?",
            from,
            to,
        )
        .await
    }

    async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<f64> {
        let total: f64 = query_scalar(
            "SELECT CAST(COALESCE(SUM(amount), 0) AS REAL) FROM payments
             WHERE status = 'paid' AND paid_at >= ? AND paid_at < ?"
        )
        .bind(format_timestamp(from))
        .bind(format_timestamp(to))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(total)
    }

    async fn booking_status_counts(&self) -> DomainResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = query_as(
            "SELECT status, COUNT(*) FROM bookings GROUP BY status"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows)
    }

    async fn top_properties_by_revenue(&self, limit: u32) -> DomainResult<Vec<PropertyRevenue>> {
        let rows = query_as::<_, PropertyRevenue>(
            "SELECT p.id AS property_id,
                    pl.name AS place_name,
                    CAST(COALESCE(SUM(pay.amount), 0) AS REAL) AS revenue,
                    COUNT(pay.id) AS paid_payments
             FROM properties p
             JOIN places pl ON pl.id = p.place_id
             LEFT JOIN room_properties r ON r.property_id = p.id
             LEFT JOIN bookings b ON b.room_property_id = r.id
             LEFT JOIN payments pay ON pay.booking_id = b.id AND pay.status = 'paid'
             GROUP BY p.id, pl.name
             ORDER BY revenue DESC, p.id ASC
             LIMIT ?"
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows)
    }

    async fn property_listings(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        params: PaginationParams,
    ) -> DomainResult<(Vec<PropertyListingRow>, i64)> {
        let total = self.count("SELECT COUNT(*) FROM properties").await?;

        let rows = query_as::<_, PropertyListingRow>(
            "SELECT p.id AS property_id,
                    p.place_id AS place_id,
                    pl.name AS place_name,
                    pl.city AS city,
                    p.owner_id AS owner_id,
                    COUNT(r.id) AS room_count,
                    COALESCE(SUM(CASE WHEN r.id IS NOT NULL AND NOT EXISTS (
                        SELECT 1 FROM bookings b
                        WHERE b.room_property_id = r.id
                          AND b.status IN ('pending', 'confirmed')
                          AND b.check_in < ?1
                          AND b.check_out > ?2
                    ) THEN 1 ELSE 0 END), 0) AS available_rooms,
                    MIN(r.price_per_night) AS min_price,
                    MAX(r.price_per_night) AS max_price
             FROM properties p
             JOIN places pl ON pl.id = p.place_id
             LEFT JOIN room_properties r ON r.property_id = p.id
             GROUP BY p.id, p.place_id, pl.name, pl.city, p.owner_id
             ORDER BY pl.name, p.id
             LIMIT ?3 OFFSET ?4"
        )
        .bind(check_out.format(DATE_FORMAT).to_string())
        .bind(check_in.format(DATE_FORMAT).to_string())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok((rows, total))
    }
}
