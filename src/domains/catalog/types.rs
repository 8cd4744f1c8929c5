use crate::errors::DomainResult;
use crate::validation::{common, Validate};
use crate::domains::core::membership::{MembershipTable, PROPERTY_FACILITIES, ROOM_AMENITIES};
use crate::types::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use sqlx::FromRow;

/// The two catalogs share one shape; only the table and the join table differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogKind {
    Facility,
    Amenity,
}

impl CatalogKind {
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::Facility => "facilities",
            CatalogKind::Amenity => "amenities",
        }
    }

    pub fn entity_name(&self) -> &'static str {
        match self {
            CatalogKind::Facility => "Facility",
            CatalogKind::Amenity => "Amenity",
        }
    }

    /// Field name used in validation messages for references into this catalog
    pub fn reference_field(&self) -> &'static str {
        match self {
            CatalogKind::Facility => "facility_ids",
            CatalogKind::Amenity => "amenity_ids",
        }
    }

    pub fn membership(&self) -> MembershipTable {
        match self {
            CatalogKind::Facility => PROPERTY_FACILITIES,
            CatalogKind::Amenity => ROOM_AMENITIES,
        }
    }
}

/// A facility or an amenity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub name: String,
}

impl Validate for NewCatalogItem {
    fn validate(&self) -> DomainResult<()> {
        common::validate_catalog_name(&self.name)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CatalogItemRow {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl CatalogItemRow {
    pub fn into_entity(self) -> DomainResult<CatalogItem> {
        Ok(CatalogItem {
            id: self.id,
            name: self.name,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}
