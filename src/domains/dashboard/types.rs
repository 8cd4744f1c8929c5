use crate::domains::booking::types::BookingStatus;
use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Serialize, Deserialize};
use sqlx::FromRow;

/// One month-over-month figure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub current: f64,
    pub previous: f64,
    pub delta_percent: f64,
}

impl MetricDelta {
    pub fn new(current: f64, previous: f64) -> Self {
        Self {
            current,
            previous,
            delta_percent: delta_percent(current, previous),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub as_of: DateTime<Utc>,
    pub total_properties: i64,
    pub total_rooms: i64,
    pub total_bookings: i64,
    /// Sum of paid payments
    pub total_revenue: f64,
    pub new_bookings: MetricDelta,
    pub revenue: MetricDelta,
    pub new_properties: MetricDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStatusCount {
    pub status: BookingStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PropertyRevenue {
    pub property_id: i64,
    pub place_name: String,
    pub revenue: f64,
    pub paid_payments: i64,
}

/// One row of the property listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub property_id: i64,
    pub place_id: i64,
    pub place_name: String,
    pub city: String,
    pub owner_id: i64,
    pub room_count: i64,
    /// Rooms with no pending or confirmed booking overlapping the requested stay
    pub available_rooms: i64,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub price_range: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PropertyListingRow {
    pub property_id: i64,
    pub place_id: i64,
    pub place_name: String,
    pub city: String,
    pub owner_id: i64,
    pub room_count: i64,
    pub available_rooms: i64,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl PropertyListingRow {
    pub fn into_listing(self) -> PropertyListing {
        PropertyListing {
            price_range: format_price_range(self.min_price, self.max_price),
            property_id: self.property_id,
            place_id: self.place_id,
            place_name: self.place_name,
            city: self.city,
            owner_id: self.owner_id,
            room_count: self.room_count,
            available_rooms: self.available_rooms,
            min_price: self.min_price,
            max_price: self.max_price,
        }
    }
}

/// Percent change from `previous` to `current`, rounded to one decimal.
/// Growth from zero counts as 100%, no activity in either month as 0%.
pub fn delta_percent(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    let raw = (current - previous) / previous * 100.0;
    (raw * 10.0).round() / 10.0
}

pub fn format_price_range(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) if min == max => format!("${:.2}", min),
        (Some(min), Some(max)) => format!("${:.2} - ${:.2}", min, max),
        (Some(price), None) | (None, Some(price)) => format!("${:.2}", price),
        (None, None) => "N/A".to_string(),
    }
}

/// Start of the month containing `as_of`, and start of the month before it
pub fn month_windows(as_of: DateTime<Utc>) -> DomainResult<(DateTime<Utc>, DateTime<Utc>)> {
    let (prev_year, prev_month) = if as_of.month() == 1 {
        (as_of.year() - 1, 12)
    } else {
        (as_of.year(), as_of.month() - 1)
    };

    let current = month_start(as_of.year(), as_of.month())?;
    let previous = month_start(prev_year, prev_month)?;
    Ok((current, previous))
}

fn month_start(year: i32, month: u32) -> DomainResult<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| DomainError::Internal(format!("Invalid month {}-{}", year, month)))
}
