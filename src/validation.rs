use crate::errors::{ValidationError, DomainResult, DomainError};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use sqlx::{Sqlite, Transaction};

/// A trait that entities should implement for validation.
pub trait Validate {
    /// Validates the entity and returns an error if validation fails.
    fn validate(&self) -> DomainResult<()>;
}

// Common regex patterns
fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

/// Struct for configuring validations in a fluent style
#[derive(Default)]
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Helper struct for validating nested objects with different validation rules
#[derive(Default)]
pub struct NestedValidator {
    errors: Vec<ValidationError>,
}

impl NestedValidator {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Record the failure of a nested `validate()` call, prefixing the field path
    pub fn add_result(&mut self, path: &str, result: DomainResult<()>) {
        match result {
            Ok(()) => {}
            Err(DomainError::Validation(err)) => {
                self.errors.push(ValidationError::Entity(format!("{}: {}", path, err)));
            }
            Err(other) => {
                self.errors.push(ValidationError::Custom(format!("{}: {}", path, other)));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn validate(self) -> DomainResult<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            // First error wins, same as ValidationBuilder
            Some(first) => Err(DomainError::Validation(first)),
        }
    }
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    /// Fails when the value is absent. Unlike string `not_blank`, zero is a valid number here.
    pub fn present(mut self) -> Self {
        if self.value.is_none() {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    pub fn validate_with<F>(mut self, validator: F) -> Self
    where F: FnOnce(&T) -> Result<(), ValidationError> {
        if let Some(value) = &self.value {
            if let Err(err) = validator(value) {
                self.errors.push(err);
            }
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(DomainError::Validation(first)),
        }
    }
}

/// String-specific validations
impl ValidationBuilder<String> {
    pub fn required(mut self) -> Self {
        match &self.value {
            Some(value) if !value.is_empty() => {}
            _ => self.errors.push(ValidationError::required(&self.field_name)),
        }
        self
    }

    /// Like `required`, but whitespace-only strings count as missing
    pub fn not_blank(mut self) -> Self {
        match &self.value {
            Some(value) if !value.trim().is_empty() => {}
            _ => self.errors.push(ValidationError::required(&self.field_name)),
        }
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        if let Some(value) = &self.value {
            if value.chars().count() < min {
                self.errors.push(ValidationError::min_length(&self.field_name, min));
            }
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let Some(value) = &self.value {
            if value.chars().count() > max {
                self.errors.push(ValidationError::max_length(&self.field_name, max));
            }
        }
        self
    }

    pub fn matches_pattern(mut self, pattern: &Regex, message: &str) -> Self {
        if let Some(value) = &self.value {
            if !pattern.is_match(value) {
                self.errors.push(ValidationError::format(&self.field_name, message));
            }
        }
        self
    }

    pub fn email(self) -> Self {
        self.matches_pattern(email_regex(), "must be a valid email address")
    }

    pub fn one_of(mut self, allowed_values: &[&str], message: Option<&str>) -> Self {
        if let Some(value) = &self.value {
            if !allowed_values.contains(&value.as_str()) {
                let reason = message.unwrap_or("must be one of the allowed values");
                self.errors.push(ValidationError::invalid_value(&self.field_name, reason));
            }
        }
        self
    }
}

/// Numeric validations
impl<T> ValidationBuilder<T>
where T: PartialOrd + Clone + std::fmt::Display
{
    pub fn min(mut self, min: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    "maximum".to_string()
                ));
            }
        }
        self
    }

    pub fn max(mut self, max: T) -> Self {
        if let Some(value) = &self.value {
            if value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    "minimum".to_string(),
                    max.to_string()
                ));
            }
        }
        self
    }
}

impl ValidationBuilder<f64> {
    /// Rejects NaN and infinities, which slip past `min`/`max` comparisons
    pub fn finite(mut self) -> Self {
        if let Some(value) = &self.value {
            if !value.is_finite() {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    "must be a finite number"
                ));
            }
        }
        self
    }
}

impl ValidationBuilder<NaiveDate> {
    pub fn after(mut self, date: NaiveDate) -> Self {
        if let Some(value) = &self.value {
            if value <= &date {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    &format!("must be after {}", date)
                ));
            }
        }
        self
    }
}

/// Return the ids from `ids` with no row in `table`. Used for catalog reference checks.
pub async fn find_missing_ids_with_tx(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    ids: &BTreeSet<i64>,
) -> DomainResult<Vec<i64>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = sqlx::QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {} WHERE id IN (", table));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: Vec<i64> = builder
        .build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| DomainError::Database(e.into()))?;
    let found: BTreeSet<i64> = found.into_iter().collect();

    Ok(ids.difference(&found).copied().collect())
}

pub mod common {
    use super::*;

    pub fn validate_date_format(date_str: &str, field_name: &str) -> DomainResult<NaiveDate> {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
            DomainError::Validation(ValidationError::format(
                field_name,
                "must be in the format YYYY-MM-DD",
            ))
        })
    }

    /// Catalog names (facilities, amenities) share one rule set
    pub fn validate_catalog_name(name: &str) -> DomainResult<()> {
        ValidationBuilder::new("name", Some(name.to_string()))
            .not_blank()
            .max_length(100)
            .validate()
    }
}
