use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::validation::{common, Validate, ValidationBuilder};
use crate::types::parse_timestamp;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Deserialize};
use sqlx::FromRow;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn all() -> [BookingStatus; 4] {
        [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ]
    }

    /// Pending and confirmed bookings hold their room for the stay
    pub fn blocks_room(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "card" => Some(PaymentMethod::Card),
            "cash" => Some(PaymentMethod::Cash),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            _ => None,
        }
    }

    pub fn all_variants() -> Vec<&'static str> {
        vec!["card", "cash", "bank_transfer"]
    }
}

/// Booking entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub room_property_id: i64,
    pub user_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i64,
    pub total_price: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// NewBooking DTO. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub room_property_id: i64,
    pub user_id: i64,
    pub check_in: String,
    pub check_out: String,
    pub guests: i64,
}

impl NewBooking {
    /// Parsed (check_in, check_out); fails like `validate` on malformed dates
    pub fn stay(&self) -> DomainResult<(NaiveDate, NaiveDate)> {
        let check_in = common::validate_date_format(&self.check_in, "check_in")?;
        let check_out = common::validate_date_format(&self.check_out, "check_out")?;
        Ok((check_in, check_out))
    }
}

impl Validate for NewBooking {
    fn validate(&self) -> DomainResult<()> {
        let (check_in, check_out) = self.stay()?;

        ValidationBuilder::new("check_out", Some(check_out))
            .after(check_in)
            .validate()?;

        ValidationBuilder::new("guests", Some(self.guests))
            .min(1)
            .validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: i64,
    pub room_property_id: i64,
    pub user_id: i64,
    pub check_in: String,
    pub check_out: String,
    pub guests: i64,
    pub total_price: f64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl BookingRow {
    pub fn into_entity(self) -> DomainResult<Booking> {
        let parse_date = |value: &str, field: &str| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .map_err(|_| DomainError::Internal(format!("Invalid date in column {}: {}", field, value)))
        };

        Ok(Booking {
            id: self.id,
            room_property_id: self.room_property_id,
            user_id: self.user_id,
            check_in: parse_date(&self.check_in, "check_in")?,
            check_out: parse_date(&self.check_out, "check_out")?,
            guests: self.guests,
            total_price: self.total_price,
            status: BookingStatus::from_str(&self.status)
                .ok_or_else(|| DomainError::Internal(format!("Invalid booking status: {}", self.status)))?,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

/// Payment entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub booking_id: i64,
    pub amount: f64,
    pub method: String,
}

impl Validate for NewPayment {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("amount", Some(self.amount))
            .finite()
            .validate_with(|amount| {
                if *amount > 0.0 {
                    Ok(())
                } else {
                    Err(ValidationError::invalid_value("amount", "must be greater than zero"))
                }
            })
            .validate()?;

        ValidationBuilder::new("method", Some(self.method.clone()))
            .required()
            .one_of(&PaymentMethod::all_variants(), Some("Invalid payment method"))
            .validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub booking_id: i64,
    pub amount: f64,
    pub method: String,
    pub status: String,
    pub paid_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PaymentRow {
    pub fn into_entity(self) -> DomainResult<Payment> {
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            amount: self.amount,
            method: PaymentMethod::from_str(&self.method)
                .ok_or_else(|| DomainError::Internal(format!("Invalid payment method: {}", self.method)))?,
            status: PaymentStatus::from_str(&self.status)
                .ok_or_else(|| DomainError::Internal(format!("Invalid payment status: {}", self.status)))?,
            paid_at: self
                .paid_at
                .as_deref()
                .map(|value| parse_timestamp(value, "paid_at"))
                .transpose()?,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}
