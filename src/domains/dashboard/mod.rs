pub mod types;
pub mod repository;
pub mod service;

pub use types::{
    delta_percent, format_price_range, BookingStatusCount, DashboardStats, MetricDelta, PropertyListing,
    PropertyRevenue,
};
pub use repository::{DashboardRepository, SqliteDashboardRepository};
pub use service::DashboardService;
