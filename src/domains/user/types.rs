use crate::errors::{DomainError, DomainResult};
use crate::validation::{Validate, ValidationBuilder};
use crate::types::{parse_timestamp, UserRole};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use sqlx::FromRow;

/// Core User entity. Property owners and booking guests are both users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    // Helper to check if user is admin
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

/// NewUser DTO - used when creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Validate for NewUser {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("name", Some(self.name.clone()))
            .not_blank()
            .max_length(100)
            .validate()?;

        ValidationBuilder::new("email", Some(self.email.clone()))
            .required()
            .email()
            .validate()?;

        ValidationBuilder::new("role", Some(self.role.clone()))
            .required()
            .one_of(&UserRole::all_variants(), Some("Invalid role"))
            .validate()?;

        Ok(())
    }
}

/// UserRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub active: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<User> {
        Ok(User {
            id: self.id,
            role: UserRole::from_str(&self.role)
                .ok_or_else(|| DomainError::Internal(format!("Invalid role: {}", self.role)))?,
            name: self.name,
            email: self.email,
            active: self.active != 0,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}
