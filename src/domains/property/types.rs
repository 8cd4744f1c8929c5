use crate::errors::{DomainResult, ValidationError};
use crate::validation::{NestedValidator, Validate, ValidationBuilder};
use crate::domains::catalog::types::CatalogItem;
use crate::domains::place::types::PlaceSummary;
use crate::domains::user::types::User;
use crate::types::parse_timestamp;
use std::collections::{BTreeSet, HashSet};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use sqlx::FromRow;

/// Property entity: the hotel side of a Place, owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: i64,
    pub owner_id: i64,
    pub place_id: i64,
    /// Incremented by every successful reconciliation
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PropertyRow {
    pub id: i64,
    pub owner_id: i64,
    pub place_id: i64,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl PropertyRow {
    pub fn into_entity(self) -> DomainResult<Property> {
        Ok(Property {
            id: self.id,
            owner_id: self.owner_id,
            place_id: self.place_id,
            version: self.version,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

/// A bookable room type of a property
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomProperty {
    pub id: i64,
    pub property_id: i64,
    pub room_type: String,
    pub description: Option<String>,
    pub max_guests: i64,
    pub room_size: Option<f64>,
    pub price_per_night: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomProperty {
    pub fn scalars(&self) -> RoomScalars {
        RoomScalars {
            room_type: self.room_type.clone(),
            description: self.description.clone(),
            max_guests: self.max_guests,
            room_size: self.room_size,
            price_per_night: self.price_per_night,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RoomPropertyRow {
    pub id: i64,
    pub property_id: i64,
    pub room_type: String,
    pub description: Option<String>,
    pub max_guests: i64,
    pub room_size: Option<f64>,
    pub price_per_night: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl RoomPropertyRow {
    pub fn into_entity(self) -> DomainResult<RoomProperty> {
        Ok(RoomProperty {
            id: self.id,
            property_id: self.property_id,
            room_type: self.room_type,
            description: self.description,
            max_guests: self.max_guests,
            room_size: self.room_size,
            price_per_night: self.price_per_night,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

/// The writable columns of a room. Two rooms with equal scalars need no UPDATE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomScalars {
    pub room_type: String,
    pub description: Option<String>,
    pub max_guests: i64,
    pub room_size: Option<f64>,
    pub price_per_night: f64,
}

/// One room of a desired property state. `room_id` names an existing room to update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomDescriptor {
    pub room_id: Option<i64>,
    pub room_type: String,
    pub description: Option<String>,
    pub max_guests: i64,
    pub room_size: Option<f64>,
    pub price_per_night: f64,
    #[serde(default)]
    pub amenity_ids: BTreeSet<i64>,
}

impl RoomDescriptor {
    pub fn new(room_type: &str, max_guests: i64, price_per_night: f64) -> Self {
        Self {
            room_id: None,
            room_type: room_type.to_string(),
            description: None,
            max_guests,
            room_size: None,
            price_per_night,
            amenity_ids: BTreeSet::new(),
        }
    }

    pub fn with_id(mut self, room_id: i64) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn with_amenities<I: IntoIterator<Item = i64>>(mut self, amenity_ids: I) -> Self {
        self.amenity_ids = amenity_ids.into_iter().collect();
        self
    }

    /// Scalars as they are stored: room type trimmed, blank description dropped
    pub fn scalars(&self) -> RoomScalars {
        RoomScalars {
            room_type: self.room_type.trim().to_string(),
            description: self
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            max_guests: self.max_guests,
            room_size: self.room_size,
            price_per_night: self.price_per_night,
        }
    }
}

impl Validate for RoomDescriptor {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("room_type", Some(self.room_type.clone()))
            .not_blank()
            .max_length(100)
            .validate()?;

        ValidationBuilder::new("max_guests", Some(self.max_guests))
            .min(1)
            .validate()?;

        ValidationBuilder::new("price_per_night", Some(self.price_per_night))
            .present()
            .finite()
            .min(0.0)
            .validate()?;

        if let Some(room_size) = self.room_size {
            ValidationBuilder::new("room_size", Some(room_size))
                .finite()
                .min(0.0)
                .validate()?;
        }

        if let Some(description) = &self.description {
            ValidationBuilder::new("description", Some(description.clone()))
                .max_length(2000)
                .validate()?;
        }

        Ok(())
    }
}

/// The full state a property should have after a reconciliation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DesiredPropertyState {
    pub owner_id: i64,
    #[serde(default)]
    pub facility_ids: BTreeSet<i64>,
    #[serde(default)]
    pub rooms: Vec<RoomDescriptor>,
    /// When set, the call fails with a conflict unless the stored version matches
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl DesiredPropertyState {
    /// Every amenity id referenced by any room
    pub fn amenity_ids(&self) -> BTreeSet<i64> {
        self.rooms
            .iter()
            .flat_map(|room| room.amenity_ids.iter().copied())
            .collect()
    }
}

impl Validate for DesiredPropertyState {
    fn validate(&self) -> DomainResult<()> {
        let mut nested = NestedValidator::new();

        if self.owner_id <= 0 {
            nested.add_error(ValidationError::invalid_value("owner_id", "must reference a user"));
        }

        if let Some(version) = self.expected_version {
            if version < 1 {
                nested.add_error(ValidationError::range("expected_version", 1, i64::MAX));
            }
        }

        let mut seen_room_ids = HashSet::new();
        for (index, room) in self.rooms.iter().enumerate() {
            nested.add_result(&format!("rooms[{}]", index), room.validate());

            if let Some(room_id) = room.room_id {
                if !seen_room_ids.insert(room_id) {
                    nested.add_error(ValidationError::invalid_value(
                        &format!("rooms[{}].room_id", index),
                        &format!("room {} appears more than once", room_id),
                    ));
                }
            }
        }

        nested.validate()
    }
}

/// Input of `create_property_aggregate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPropertyAggregate {
    pub owner_id: i64,
    pub place_id: i64,
    #[serde(default)]
    pub facility_ids: BTreeSet<i64>,
    #[serde(default)]
    pub rooms: Vec<RoomDescriptor>,
}

impl NewPropertyAggregate {
    pub fn desired_state(&self) -> DesiredPropertyState {
        DesiredPropertyState {
            owner_id: self.owner_id,
            facility_ids: self.facility_ids.clone(),
            rooms: self.rooms.clone(),
            expected_version: None,
        }
    }
}

impl Validate for NewPropertyAggregate {
    fn validate(&self) -> DomainResult<()> {
        if self.place_id <= 0 {
            return Err(ValidationError::invalid_value("place_id", "must reference a place").into());
        }
        self.desired_state().validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A room together with its amenities, sorted by name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomAggregate {
    #[serde(flatten)]
    pub room: RoomProperty,
    pub amenities: Vec<CatalogItem>,
}

impl RoomAggregate {
    pub fn amenity_ids(&self) -> BTreeSet<i64> {
        self.amenities.iter().map(|a| a.id).collect()
    }

    /// Descriptor that keeps this room exactly as stored
    pub fn descriptor(&self) -> RoomDescriptor {
        RoomDescriptor {
            room_id: Some(self.room.id),
            room_type: self.room.room_type.clone(),
            description: self.room.description.clone(),
            max_guests: self.room.max_guests,
            room_size: self.room.room_size,
            price_per_night: self.room.price_per_night,
            amenity_ids: self.amenity_ids(),
        }
    }
}

/// Property with owner, place, facilities and rooms loaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyAggregate {
    pub property: Property,
    pub owner: OwnerSummary,
    pub place: PlaceSummary,
    pub facilities: Vec<CatalogItem>,
    pub rooms: Vec<RoomAggregate>,
}

impl PropertyAggregate {
    pub fn facility_ids(&self) -> BTreeSet<i64> {
        self.facilities.iter().map(|f| f.id).collect()
    }

    pub fn room_ids(&self) -> BTreeSet<i64> {
        self.rooms.iter().map(|r| r.room.id).collect()
    }

    pub fn room(&self, id: i64) -> Option<&RoomAggregate> {
        self.rooms.iter().find(|r| r.room.id == id)
    }

    /// The stored state as a reconcile request pinned to the current version.
    /// Callers edit it and submit it back.
    pub fn desired_state(&self) -> DesiredPropertyState {
        DesiredPropertyState {
            owner_id: self.property.owner_id,
            facility_ids: self.facility_ids(),
            rooms: self.rooms.iter().map(RoomAggregate::descriptor).collect(),
            expected_version: Some(self.property.version),
        }
    }
}

/// Write counts of one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub rooms_created: usize,
    pub rooms_updated: usize,
    pub rooms_unchanged: usize,
    pub rooms_deleted: usize,
    pub facilities_attached: usize,
    pub facilities_detached: usize,
    pub amenities_attached: usize,
    pub amenities_detached: usize,
}

impl ReconciliationSummary {
    /// True when the call left rooms and memberships exactly as they were
    pub fn is_noop(&self) -> bool {
        self.rooms_created == 0
            && self.rooms_updated == 0
            && self.rooms_deleted == 0
            && self.facilities_attached == 0
            && self.facilities_detached == 0
            && self.amenities_attached == 0
            && self.amenities_detached == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciledProperty {
    pub aggregate: PropertyAggregate,
    pub summary: ReconciliationSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DomainError;

    fn desired(rooms: Vec<RoomDescriptor>) -> DesiredPropertyState {
        DesiredPropertyState {
            owner_id: 5,
            facility_ids: [1, 2].into_iter().collect(),
            rooms,
            expected_version: None,
        }
    }

    #[test]
    fn test_room_descriptor_rules() {
        assert!(RoomDescriptor::new("Deluxe", 2, 100.0).validate().is_ok());
        assert!(RoomDescriptor::new("Free", 1, 0.0).validate().is_ok());
        assert!(RoomDescriptor::new("  ", 2, 100.0).validate().is_err());
        assert!(RoomDescriptor::new("Deluxe", 0, 100.0).validate().is_err());
        assert!(RoomDescriptor::new("Deluxe", 2, -1.0).validate().is_err());
        assert!(RoomDescriptor::new("Deluxe", 2, f64::NAN).validate().is_err());

        let mut negative_size = RoomDescriptor::new("Deluxe", 2, 100.0);
        negative_size.room_size = Some(-3.0);
        assert!(negative_size.validate().is_err());
    }

    #[test]
    fn test_invalid_room_reports_index() {
        let state = desired(vec![
            RoomDescriptor::new("Deluxe", 2, 100.0),
            RoomDescriptor::new("", 2, 100.0),
        ]);
        let err = state.validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(err.to_string().contains("rooms[1]"));
    }

    #[test]
    fn test_duplicate_room_ids_rejected() {
        let state = desired(vec![
            RoomDescriptor::new("Deluxe", 2, 100.0).with_id(10),
            RoomDescriptor::new("Suite", 2, 150.0).with_id(10),
        ]);
        let err = state.validate().unwrap_err();
        assert!(err.to_string().contains("room 10 appears more than once"));
    }

    #[test]
    fn test_descriptor_scalars_are_normalized() {
        let mut room = RoomDescriptor::new("  Deluxe ", 2, 100.0);
        room.description = Some("   ".to_string());
        let scalars = room.scalars();
        assert_eq!(scalars.room_type, "Deluxe");
        assert_eq!(scalars.description, None);
    }

    #[test]
    fn test_amenity_union() {
        let state = desired(vec![
            RoomDescriptor::new("A", 1, 1.0).with_amenities([3, 4]),
            RoomDescriptor::new("B", 1, 1.0).with_amenities([4, 5]),
        ]);
        assert_eq!(state.amenity_ids(), [3, 4, 5].into_iter().collect());
    }

    #[test]
    fn test_aggregate_round_trips_into_desired_state() {
        let now = Utc::now();
        let amenity = |id: i64, name: &str| CatalogItem {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        let aggregate = PropertyAggregate {
            property: Property { id: 1, owner_id: 5, place_id: 42, version: 3, created_at: now, updated_at: now },
            owner: OwnerSummary { id: 5, name: "Ana".to_string(), email: "ana@example.com".to_string() },
            place: PlaceSummary { id: 42, name: "Harbor View".to_string(), city: "Lisbon".to_string() },
            facilities: vec![amenity(2, "Pool")],
            rooms: vec![RoomAggregate {
                room: RoomProperty {
                    id: 9,
                    property_id: 1,
                    room_type: "Deluxe".to_string(),
                    description: None,
                    max_guests: 2,
                    room_size: Some(30.0),
                    price_per_night: 100.0,
                    created_at: now,
                    updated_at: now,
                },
                amenities: vec![amenity(4, "Balcony"), amenity(3, "Minibar")],
            }],
        };

        let state = aggregate.desired_state();
        assert_eq!(state.owner_id, 5);
        assert_eq!(state.expected_version, Some(3));
        assert_eq!(state.facility_ids, [2].into_iter().collect());
        let mut expected = RoomDescriptor::new("Deluxe", 2, 100.0).with_id(9).with_amenities([3, 4]);
        expected.room_size = Some(30.0);
        assert_eq!(state.rooms, vec![expected]);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_summary_noop() {
        let mut summary = ReconciliationSummary::default();
        summary.rooms_unchanged = 3;
        assert!(summary.is_noop());
        summary.amenities_attached = 1;
        assert!(!summary.is_noop());
    }
}
