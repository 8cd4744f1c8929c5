use crate::auth::AuthContext;
use crate::domains::booking::types::BookingStatus;
use crate::domains::dashboard::repository::DashboardRepository;
use crate::domains::dashboard::types::{
    month_windows, BookingStatusCount, DashboardStats, MetricDelta, PropertyListing, PropertyRevenue,
};
use crate::domains::permission::Permission;
use crate::errors::ServiceResult;
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::ValidationBuilder;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Read-only projections for the admin dashboard and the listing page
pub struct DashboardService {
    dashboard_repo: Arc<dyn DashboardRepository>,
}

impl DashboardService {
    pub fn new(dashboard_repo: Arc<dyn DashboardRepository>) -> Self {
        Self { dashboard_repo }
    }

    /// Totals plus month-over-month deltas. The current month runs up to `as_of`.
    pub async fn dashboard_stats(&self, as_of: DateTime<Utc>, auth: &AuthContext) -> ServiceResult<DashboardStats> {
        auth.authorize(Permission::ViewDashboard)?;

        let (current_start, previous_start) = month_windows(as_of)?;
        // `as_of` itself belongs to the current window
        let current_end = as_of + chrono::Duration::milliseconds(1);
        let repo = &self.dashboard_repo;

        let bookings_now = repo.count_bookings_created_between(current_start, current_end).await?;
        let bookings_before = repo.count_bookings_created_between(previous_start, current_start).await?;
        let revenue_now = repo.revenue_between(current_start, current_end).await?;
        let revenue_before = repo.revenue_between(previous_start, current_start).await?;
        let properties_now = repo.count_properties_created_between(current_start, current_end).await?;
        let properties_before = repo.count_properties_created_between(previous_start, current_start).await?;

        Ok(DashboardStats {
            as_of,
            total_properties: repo.count_properties().await?,
            total_rooms: repo.count_rooms().await?,
            total_bookings: repo.count_bookings().await?,
            total_revenue: repo.total_revenue().await?,
            new_bookings: MetricDelta::new(bookings_now as f64, bookings_before as f64),
            revenue: MetricDelta::new(revenue_now, revenue_before),
            new_properties: MetricDelta::new(properties_now as f64, properties_before as f64),
        })
    }

    /// Count per booking status; every status is listed, in lifecycle order
    pub async fn booking_status_counts(&self, auth: &AuthContext) -> ServiceResult<Vec<BookingStatusCount>> {
        auth.authorize(Permission::ViewDashboard)?;

        let stored = self.dashboard_repo.booking_status_counts().await?;
        Ok(BookingStatus::all()
            .into_iter()
            .map(|status| BookingStatusCount {
                status,
                count: stored
                    .iter()
                    .find(|(name, _)| name == status.as_str())
                    .map_or(0, |(_, count)| *count),
            })
            .collect())
    }

    pub async fn top_properties_by_revenue(&self, limit: u32, auth: &AuthContext) -> ServiceResult<Vec<PropertyRevenue>> {
        auth.authorize(Permission::ViewDashboard)?;
        Ok(self.dashboard_repo.top_properties_by_revenue(limit).await?)
    }

    /// Listing rows with availability for the stay [check_in, check_out)
    pub async fn property_listings(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        params: PaginationParams,
        auth: &AuthContext,
    ) -> ServiceResult<PaginatedResult<PropertyListing>> {
        auth.authorize(Permission::ViewProperties)?;

        ValidationBuilder::new("check_out", Some(check_out))
            .after(check_in)
            .validate()?;

        let (rows, total) = self.dashboard_repo.property_listings(check_in, check_out, params).await?;
        let listings = rows.into_iter().map(|row| row.into_listing()).collect();
        Ok(PaginatedResult::new(listings, total as u64, params))
    }
}
