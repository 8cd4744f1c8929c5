use serde::{Deserialize, Serialize};
use chrono::{DateTime, SecondsFormat, Utc};
use crate::errors::{DomainError, DomainResult};

// Re-export UserRole and Permission from the permission module
pub use crate::domains::permission::{UserRole, Permission};

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl PaginationParams {
    /// Row offset for LIMIT/OFFSET queries; page numbering starts at 1
    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page.max(1) as i64
    }
}

/// Paginated result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: u64, params: PaginationParams) -> Self {
        let per_page = params.per_page.max(1);
        let total_pages = (total as f64 / per_page as f64).ceil() as u32;
        Self {
            items,
            total,
            page: params.page,
            per_page,
            total_pages,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Fixed-width RFC 3339 form used for every stored timestamp, so text order matches time order
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

pub fn parse_timestamp(value: &str, field: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::Internal(format!("Invalid timestamp in column {}: {}", field, value)))
}
