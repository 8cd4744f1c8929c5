use crate::errors::{DomainError, DomainResult};
use crate::validation::{Validate, ValidationBuilder};
use crate::types::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use sqlx::FromRow;

/// Kind of place a listing points at. Only hotels carry a property aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    Hotel,
    Restaurant,
    Transportation,
    Attraction,
    Event,
}

impl PlaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceType::Hotel => "hotel",
            PlaceType::Restaurant => "restaurant",
            PlaceType::Transportation => "transportation",
            PlaceType::Attraction => "attraction",
            PlaceType::Event => "event",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "hotel" => Some(PlaceType::Hotel),
            "restaurant" => Some(PlaceType::Restaurant),
            "transportation" => Some(PlaceType::Transportation),
            "attraction" => Some(PlaceType::Attraction),
            "event" => Some(PlaceType::Event),
            _ => None,
        }
    }

    pub fn all_variants() -> Vec<&'static str> {
        vec!["hotel", "restaurant", "transportation", "attraction", "event"]
    }
}

/// Place entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub place_type: PlaceType,
    pub city: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewPlace DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlace {
    pub name: String,
    pub place_type: String,
    pub city: String,
    pub description: Option<String>,
}

impl Validate for NewPlace {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("name", Some(self.name.clone()))
            .not_blank()
            .max_length(200)
            .validate()?;

        ValidationBuilder::new("place_type", Some(self.place_type.clone()))
            .required()
            .one_of(&PlaceType::all_variants(), Some("Invalid place type"))
            .validate()?;

        ValidationBuilder::new("city", Some(self.city.clone()))
            .not_blank()
            .max_length(100)
            .validate()?;

        if let Some(description) = &self.description {
            ValidationBuilder::new("description", Some(description.clone()))
                .max_length(2000)
                .validate()?;
        }

        Ok(())
    }
}

/// Compact place view embedded in a property aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceSummary {
    pub id: i64,
    pub name: String,
    pub city: String,
}

impl From<&Place> for PlaceSummary {
    fn from(place: &Place) -> Self {
        Self {
            id: place.id,
            name: place.name.clone(),
            city: place.city.clone(),
        }
    }
}

/// PlaceRow - SQLite row representation
#[derive(Debug, Clone, FromRow)]
pub struct PlaceRow {
    pub id: i64,
    pub name: String,
    pub place_type: String,
    pub city: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PlaceRow {
    pub fn into_entity(self) -> DomainResult<Place> {
        Ok(Place {
            id: self.id,
            place_type: PlaceType::from_str(&self.place_type)
                .ok_or_else(|| DomainError::Internal(format!("Invalid place type: {}", self.place_type)))?,
            name: self.name,
            city: self.city,
            description: self.description,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}
