//! Diffs a desired property state against the stored rows and applies the
//! smallest set of writes that makes them equal.
//!
//! Everything here runs on a caller-supplied transaction. The reconciler never
//! commits, never checks roles and never opens its own transaction, so a
//! failure anywhere leaves the caller free to roll the whole call back.

use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::domains::catalog::repository::CatalogRepository;
use crate::domains::core::membership::MembershipDiff;
use crate::domains::place::repository::PlaceRepository;
use crate::domains::place::types::PlaceSummary;
use crate::domains::property::repository::PropertyRepository;
use crate::domains::property::room_repository::RoomPropertyRepository;
use crate::domains::property::types::{
    DesiredPropertyState, OwnerSummary, Property, PropertyAggregate, ReconciledProperty,
    ReconciliationSummary, RoomAggregate, RoomDescriptor,
};
use crate::domains::user::repository::UserRepository;
use crate::validation::Validate;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use sqlx::{Sqlite, Transaction};
use log::{debug, info, warn};

/// Which stored rooms a desired room list updates, creates and deletes.
/// Descriptors are referred to by their index in the desired list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPlan {
    /// (stored room id, descriptor index)
    pub updates: Vec<(i64, usize)>,
    pub creates: Vec<usize>,
    pub deletes: Vec<i64>,
    /// Ids carried by descriptors that match no stored room; those descriptors are creates
    pub unknown_ids: Vec<i64>,
}

/// Partition `desired` against the ids of the stored rooms.
///
/// A descriptor whose id is a stored room is an update; every other descriptor
/// is a create. Stored rooms no update refers to are deleted.
pub fn plan_rooms(current_ids: &BTreeSet<i64>, desired: &[RoomDescriptor]) -> RoomPlan {
    let mut plan = RoomPlan::default();
    let mut kept = BTreeSet::new();

    for (index, room) in desired.iter().enumerate() {
        match room.room_id {
            Some(id) if current_ids.contains(&id) && kept.insert(id) => plan.updates.push((id, index)),
            Some(id) => {
                if !current_ids.contains(&id) {
                    plan.unknown_ids.push(id);
                }
                plan.creates.push(index);
            }
            None => plan.creates.push(index),
        }
    }

    plan.deletes = current_ids.difference(&kept).copied().collect();
    plan
}

pub struct AggregateReconciler {
    property_repo: Arc<dyn PropertyRepository>,
    room_repo: Arc<dyn RoomPropertyRepository>,
    user_repo: Arc<dyn UserRepository>,
    place_repo: Arc<dyn PlaceRepository>,
    facility_repo: Arc<dyn CatalogRepository>,
    amenity_repo: Arc<dyn CatalogRepository>,
}

impl AggregateReconciler {
    pub fn new(
        property_repo: Arc<dyn PropertyRepository>,
        room_repo: Arc<dyn RoomPropertyRepository>,
        user_repo: Arc<dyn UserRepository>,
        place_repo: Arc<dyn PlaceRepository>,
        facility_repo: Arc<dyn CatalogRepository>,
        amenity_repo: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self {
            property_repo,
            room_repo,
            user_repo,
            place_repo,
            facility_repo,
            amenity_repo,
        }
    }

    /// Reconcile an existing property to `desired`
    pub async fn apply_with_tx(
        &self,
        property_id: i64,
        desired: &DesiredPropertyState,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<ReconciledProperty> {
        desired.validate()?;

        let property = self.property_repo.find_by_id_with_tx(property_id, tx).await?;
        if let Some(expected) = desired.expected_version {
            if expected != property.version {
                return Err(DomainError::Conflict(format!(
                    "Property {} is at version {}, expected {}",
                    property_id, property.version, expected
                )));
            }
        }

        self.check_references_with_tx(desired, tx).await?;

        let summary = self.apply_children_with_tx(&property, desired, tx).await?;
        self.property_repo
            .touch_owner_with_tx(property_id, desired.owner_id, Some(property.version), tx)
            .await?;

        self.finish_with_tx(property_id, summary, tx).await
    }

    /// Fill a property inserted in the same transaction. The owner is already set, so the version stays at 1.
    pub async fn apply_new_with_tx(
        &self,
        property: &Property,
        desired: &DesiredPropertyState,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<ReconciledProperty> {
        let summary = self.apply_children_with_tx(property, desired, tx).await?;
        self.finish_with_tx(property.id, summary, tx).await
    }

    /// Owner, facility and amenity references must all resolve before the first write
    pub async fn check_references_with_tx(
        &self,
        desired: &DesiredPropertyState,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<()> {
        if self
            .user_repo
            .find_active_by_id_with_tx(desired.owner_id, tx)
            .await?
            .is_none()
        {
            return Err(DomainError::Validation(ValidationError::relationship(&format!(
                "owner_id: user {} does not exist or is inactive",
                desired.owner_id
            ))));
        }

        for (repo, ids) in [
            (&self.facility_repo, desired.facility_ids.clone()),
            (&self.amenity_repo, desired.amenity_ids()),
        ] {
            let missing = repo.find_missing_ids_with_tx(&ids, tx).await?;
            if !missing.is_empty() {
                return Err(DomainError::Validation(ValidationError::relationship(&format!(
                    "{}: unknown {} ids {:?}",
                    repo.kind().reference_field(),
                    repo.kind().entity_name().to_lowercase(),
                    missing
                ))));
            }
        }

        Ok(())
    }

    async fn apply_children_with_tx(
        &self,
        property: &Property,
        desired: &DesiredPropertyState,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<ReconciliationSummary> {
        let mut summary = ReconciliationSummary::default();

        let current = self.room_repo.list_by_property_with_tx(property.id, tx).await?;
        let current_ids: BTreeSet<i64> = current.iter().map(|r| r.id).collect();
        let by_id: HashMap<i64, _> = current.iter().map(|r| (r.id, r)).collect();

        let plan = plan_rooms(&current_ids, &desired.rooms);
        for id in &plan.unknown_ids {
            warn!(
                "Property {}: room {} does not exist, creating a new room instead",
                property.id, id
            );
        }

        // Booking history outlives the room listing; a booked room stays
        let booked = self
            .room_repo
            .rooms_with_bookings_with_tx(&plan.deletes, tx)
            .await?;
        if !booked.is_empty() {
            return Err(DomainError::Conflict(format!(
                "Property {}: rooms {:?} have bookings and cannot be removed",
                property.id, booked
            )));
        }

        for (room_id, index) in &plan.updates {
            let descriptor = &desired.rooms[*index];
            let scalars = descriptor.scalars();

            let unchanged = by_id.get(room_id).map_or(false, |room| room.scalars() == scalars);
            if unchanged {
                summary.rooms_unchanged += 1;
            } else {
                self.room_repo.update_with_tx(*room_id, &scalars, tx).await?;
                summary.rooms_updated += 1;
            }

            let diff = self
                .room_repo
                .sync_amenities_with_tx(*room_id, &descriptor.amenity_ids, tx)
                .await?;
            count_amenities(&mut summary, &diff);
        }

        for index in &plan.creates {
            let descriptor = &desired.rooms[*index];
            let room = self
                .room_repo
                .insert_with_tx(property.id, &descriptor.scalars(), tx)
                .await?;
            let diff = self
                .room_repo
                .sync_amenities_with_tx(room.id, &descriptor.amenity_ids, tx)
                .await?;
            count_amenities(&mut summary, &diff);
            summary.rooms_created += 1;
            debug!("Property {}: created room {}", property.id, room.id);
        }

        for room_id in &plan.deletes {
            let detached = self.room_repo.delete_with_tx(*room_id, tx).await?;
            summary.amenities_detached += detached as usize;
            summary.rooms_deleted += 1;
            debug!("Property {}: deleted room {}", property.id, room_id);
        }

        let diff = self
            .property_repo
            .sync_facilities_with_tx(property.id, &desired.facility_ids, tx)
            .await?;
        summary.facilities_attached += diff.to_attach.len();
        summary.facilities_detached += diff.to_detach.len();

        Ok(summary)
    }

    async fn finish_with_tx(
        &self,
        property_id: i64,
        summary: ReconciliationSummary,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<ReconciledProperty> {
        let aggregate = self.load_aggregate_with_tx(property_id, tx).await?;
        info!(
            "Reconciled property {} to version {}: {} rooms created, {} updated, {} unchanged, {} deleted; facilities +{}/-{}; amenities +{}/-{}",
            property_id,
            aggregate.property.version,
            summary.rooms_created,
            summary.rooms_updated,
            summary.rooms_unchanged,
            summary.rooms_deleted,
            summary.facilities_attached,
            summary.facilities_detached,
            summary.amenities_attached,
            summary.amenities_detached,
        );
        Ok(ReconciledProperty { aggregate, summary })
    }

    /// Read the property with owner, place, facilities and rooms as seen by `tx`
    pub async fn load_aggregate_with_tx(
        &self,
        property_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<PropertyAggregate> {
        let property = self.property_repo.find_by_id_with_tx(property_id, tx).await?;
        let owner = self.user_repo.find_by_id_with_tx(property.owner_id, tx).await?;
        let place = self.place_repo.find_by_id_with_tx(property.place_id, tx).await?;

        let facility_ids = self.property_repo.facility_ids_with_tx(property.id, tx).await?;
        let facilities = self.facility_repo.find_by_ids_with_tx(&facility_ids, tx).await?;

        let mut rooms = Vec::new();
        for room in self.room_repo.list_by_property_with_tx(property.id, tx).await? {
            let amenity_ids = self.room_repo.amenity_ids_with_tx(room.id, tx).await?;
            let amenities = self.amenity_repo.find_by_ids_with_tx(&amenity_ids, tx).await?;
            rooms.push(RoomAggregate { room, amenities });
        }

        Ok(PropertyAggregate {
            owner: OwnerSummary::from(&owner),
            place: PlaceSummary::from(&place),
            property,
            facilities,
            rooms,
        })
    }
}

fn count_amenities(summary: &mut ReconciliationSummary, diff: &MembershipDiff) {
    summary.amenities_attached += diff.to_attach.len();
    summary.amenities_detached += diff.to_detach.len();
}
