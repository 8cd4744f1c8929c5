mod common;

use common::{admin, count, owner, seed, setup, staff};
use hospitality_core::domains::property::{
    DesiredPropertyState, NewPropertyAggregate, PropertyAggregate, RoomDescriptor,
};
use hospitality_core::errors::ErrorKind;
use hospitality_core::types::PaginationParams;
use hospitality_core::CoreServices;
use std::collections::BTreeSet;

fn ids(values: &[i64]) -> BTreeSet<i64> {
    values.iter().copied().collect()
}

fn deluxe() -> RoomDescriptor {
    RoomDescriptor::new("Deluxe", 2, 100.0).with_amenities([3])
}

async fn create_two_room_property(services: &CoreServices) -> PropertyAggregate {
    services
        .properties
        .create_property_aggregate(
            NewPropertyAggregate {
                owner_id: 5,
                place_id: 42,
                facility_ids: ids(&[1, 2]),
                rooms: vec![
                    RoomDescriptor::new("Standard", 2, 80.0).with_amenities([3, 4]),
                    RoomDescriptor::new("Family", 4, 150.0).with_amenities([5]),
                ],
            },
            &admin(),
        )
        .await
        .unwrap()
}

/// Desired state that keeps every room of `aggregate` exactly as stored, without a version pin
fn desired_from(aggregate: &PropertyAggregate) -> DesiredPropertyState {
    DesiredPropertyState {
        expected_version: None,
        ..aggregate.desired_state()
    }
}

async fn snapshot(services: &CoreServices, property_id: i64) -> PropertyAggregate {
    services
        .properties
        .get_property_aggregate(property_id, &admin())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_then_read_round_trip() {
    let services = setup().await;
    seed(&services).await;

    let created = services
        .properties
        .create_property_aggregate(
            NewPropertyAggregate {
                owner_id: 5,
                place_id: 42,
                facility_ids: ids(&[1, 2]),
                rooms: vec![deluxe()],
            },
            &owner(5),
        )
        .await
        .unwrap();

    let read = snapshot(&services, created.property.id).await;
    assert_eq!(read, created);
    assert_eq!(read.property.owner_id, 5);
    assert_eq!(read.property.place_id, 42);
    assert_eq!(read.property.version, 1);
    assert_eq!(read.owner.id, 5);
    assert_eq!(read.place.name, "Harbor View");
    assert_eq!(read.facility_ids(), ids(&[1, 2]));
    // sorted by name
    let facility_names: Vec<&str> = read.facilities.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(facility_names, vec!["Parking", "Pool"]);

    assert_eq!(read.rooms.len(), 1);
    let room = &read.rooms[0];
    assert_eq!(room.room.room_type, "Deluxe");
    assert_eq!(room.room.price_per_night, 100.0);
    assert_eq!(room.room.max_guests, 2);
    assert_eq!(room.amenity_ids(), ids(&[3]));
}

#[tokio::test]
async fn test_reconcile_twice_is_idempotent() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;

    let mut desired = desired_from(&created);
    desired.facility_ids = ids(&[2, 3]);
    desired.rooms[0].price_per_night = 85.0;
    desired.rooms[1].amenity_ids = ids(&[4, 5]);
    desired.rooms.push(RoomDescriptor::new("Suite", 3, 220.0).with_amenities([3]));

    let first = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired.clone(), &admin())
        .await
        .unwrap();
    assert_eq!(first.summary.rooms_created, 1);
    assert_eq!(first.summary.rooms_updated, 1);
    assert_eq!(first.summary.rooms_unchanged, 1);

    // resubmit what is now stored, new room included
    let second = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired_from(&first.aggregate), &admin())
        .await
        .unwrap();

    assert!(second.summary.is_noop());
    assert_eq!(second.summary.rooms_unchanged, 3);
    assert_eq!(second.aggregate.room_ids(), first.aggregate.room_ids());
    assert_eq!(second.aggregate.facilities, first.aggregate.facilities);
    assert_eq!(second.aggregate.rooms, first.aggregate.rooms);

    let pool = services.pool();
    assert_eq!(count(pool, "SELECT COUNT(*) FROM room_properties").await, 3);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM property_facilities").await, 2);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM room_property_amenities").await, 5);
}

#[tokio::test]
async fn test_persisted_state_matches_desired_state() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;
    let kept = created.rooms[1].room.id;

    let desired = DesiredPropertyState {
        owner_id: 6,
        facility_ids: ids(&[3]),
        rooms: vec![
            RoomDescriptor::new("Family Plus", 5, 175.0).with_id(kept).with_amenities([3, 4, 5]),
            RoomDescriptor::new("Budget", 1, 40.0),
        ],
        expected_version: None,
    };

    let reconciled = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired, &admin())
        .await
        .unwrap();

    let pool = services.pool();
    let stored_rooms: Vec<i64> = sqlx::query_scalar("SELECT id FROM room_properties WHERE property_id = ? ORDER BY id")
        .bind(created.property.id)
        .fetch_all(pool)
        .await
        .unwrap();
    assert_eq!(stored_rooms.len(), 2);
    assert!(stored_rooms.contains(&kept));
    assert_eq!(reconciled.aggregate.room_ids(), stored_rooms.iter().copied().collect());

    let kept_amenities: Vec<i64> = sqlx::query_scalar("SELECT amenity_id FROM room_property_amenities WHERE room_property_id = ? ORDER BY amenity_id")
        .bind(kept)
        .fetch_all(pool)
        .await
        .unwrap();
    assert_eq!(kept_amenities, vec![3, 4, 5]);

    let budget = reconciled.aggregate.rooms.iter().find(|r| r.room.room_type == "Budget").unwrap();
    assert!(budget.amenities.is_empty());

    let facilities: Vec<i64> = sqlx::query_scalar("SELECT facility_id FROM property_facilities WHERE property_id = ?")
        .bind(created.property.id)
        .fetch_all(pool)
        .await
        .unwrap();
    assert_eq!(facilities, vec![3]);

    assert_eq!(reconciled.aggregate.property.owner_id, 6);
    assert_eq!(reconciled.aggregate.owner.id, 6);
    assert_eq!(reconciled.aggregate.property.version, 2);
}

#[tokio::test]
async fn test_one_invalid_room_changes_nothing() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;
    let before = snapshot(&services, created.property.id).await;

    let mut desired = desired_from(&before);
    desired.rooms.push(RoomDescriptor::new("New A", 2, 90.0));
    desired.rooms.push(RoomDescriptor::new("New B", 2, -5.0));
    desired.rooms.push(RoomDescriptor::new("New C", 2, 95.0));
    desired.facility_ids = BTreeSet::new();

    let err = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("rooms[3]"));

    assert_eq!(snapshot(&services, created.property.id).await, before);
}

#[tokio::test]
async fn test_unknown_amenity_changes_nothing() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;
    let before = snapshot(&services, created.property.id).await;

    let mut desired = desired_from(&before);
    desired.rooms.clear();
    desired.rooms.push(RoomDescriptor::new("Loft", 2, 130.0).with_amenities([3, 999]));

    let err = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("999"));

    assert_eq!(snapshot(&services, created.property.id).await, before);
}

#[tokio::test]
async fn test_store_failure_after_partial_writes_rolls_back() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;
    let before = snapshot(&services, created.property.id).await;

    // Fails the insert that runs after the room update has been written
    sqlx::query(
        "CREATE TRIGGER reject_room BEFORE INSERT ON room_properties
         WHEN NEW.room_type = 'Rejected'
         BEGIN SELECT RAISE(ABORT, 'rejected by test'); END"
    )
    .execute(services.pool())
    .await
    .unwrap();

    let desired = DesiredPropertyState {
        owner_id: 5,
        facility_ids: ids(&[1]),
        rooms: vec![
            RoomDescriptor::new("Renamed", 2, 99.0).with_id(before.rooms[0].room.id),
            RoomDescriptor::new("Rejected", 2, 50.0),
        ],
        expected_version: None,
    };

    let err = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    assert_eq!(snapshot(&services, created.property.id).await, before);
}

#[tokio::test]
async fn test_empty_rooms_delete_everything() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;
    let pool = services.pool();
    assert_eq!(count(pool, "SELECT COUNT(*) FROM room_property_amenities").await, 3);

    let reconciled = services
        .properties
        .reconcile_property_aggregate(
            created.property.id,
            DesiredPropertyState {
                owner_id: 5,
                facility_ids: BTreeSet::new(),
                rooms: Vec::new(),
                expected_version: None,
            },
            &owner(5),
        )
        .await
        .unwrap();

    assert!(reconciled.aggregate.rooms.is_empty());
    assert!(reconciled.aggregate.facilities.is_empty());
    assert_eq!(reconciled.summary.rooms_deleted, 2);
    assert_eq!(reconciled.summary.amenities_detached, 3);
    assert_eq!(reconciled.summary.facilities_detached, 2);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM room_properties").await, 0);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM room_property_amenities").await, 0);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM property_facilities").await, 0);
}

#[tokio::test]
async fn test_partial_update_keeps_listed_room_only() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;
    let room_a = created.rooms[0].room.id;
    let room_b = created.rooms[1].room.id;

    let reconciled = services
        .properties
        .reconcile_property_aggregate(
            created.property.id,
            DesiredPropertyState {
                owner_id: 5,
                facility_ids: ids(&[1, 2]),
                rooms: vec![RoomDescriptor::new("Suite", 2, 80.0).with_id(room_a).with_amenities([3, 4])],
                expected_version: None,
            },
            &admin(),
        )
        .await
        .unwrap();

    assert_eq!(reconciled.aggregate.room_ids(), ids(&[room_a]));
    assert_eq!(reconciled.aggregate.rooms[0].room.room_type, "Suite");
    assert_eq!(reconciled.summary.rooms_created, 0);
    assert_eq!(reconciled.summary.rooms_updated, 1);
    assert_eq!(reconciled.summary.rooms_deleted, 1);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM room_properties WHERE id = ?")
        .bind(room_b)
        .fetch_one(services.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_create_on_bound_place_conflicts() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;

    let err = services
        .properties
        .create_property_aggregate(
            NewPropertyAggregate {
                owner_id: 6,
                place_id: 42,
                facility_ids: ids(&[3]),
                rooms: vec![deluxe()],
            },
            &admin(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(snapshot(&services, created.property.id).await, created);
    assert_eq!(count(services.pool(), "SELECT COUNT(*) FROM properties").await, 1);
}

#[tokio::test]
async fn test_create_rejects_unknown_references() {
    let services = setup().await;
    seed(&services).await;

    let base = NewPropertyAggregate {
        owner_id: 5,
        place_id: 43,
        facility_ids: ids(&[1]),
        rooms: vec![deluxe()],
    };

    let unknown_place = NewPropertyAggregate { place_id: 4242, ..base.clone() };
    let unknown_owner = NewPropertyAggregate { owner_id: 77, ..base.clone() };
    let unknown_facility = NewPropertyAggregate { facility_ids: ids(&[1, 50]), ..base.clone() };

    for input in [unknown_place, unknown_owner, unknown_facility] {
        let err = services
            .properties
            .create_property_aggregate(input, &admin())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", err);
    }

    assert_eq!(count(services.pool(), "SELECT COUNT(*) FROM properties").await, 0);
    assert_eq!(count(services.pool(), "SELECT COUNT(*) FROM room_properties").await, 0);
}

#[tokio::test]
async fn test_reconcile_unknown_property_is_not_found() {
    let services = setup().await;
    seed(&services).await;

    let err = services
        .properties
        .reconcile_property_aggregate(
            999,
            DesiredPropertyState {
                owner_id: 5,
                facility_ids: BTreeSet::new(),
                rooms: Vec::new(),
                expected_version: None,
            },
            &admin(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_inactive_owner_rejected() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;
    services.users.deactivate_user(6, &admin()).await.unwrap();

    let mut desired = desired_from(&created);
    desired.owner_id = 6;
    let err = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(snapshot(&services, created.property.id).await.property.owner_id, 5);
}

#[tokio::test]
async fn test_stale_version_conflicts() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;

    let mut desired = desired_from(&created);
    desired.expected_version = Some(1);
    let first = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired.clone(), &admin())
        .await
        .unwrap();
    assert_eq!(first.aggregate.property.version, 2);

    // same version again: someone else already moved it on
    desired.rooms.clear();
    let err = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let after = snapshot(&services, created.property.id).await;
    assert_eq!(after.rooms.len(), 2);
    assert_eq!(after.property.version, 2);
}

#[tokio::test]
async fn test_unknown_room_id_creates_room() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;

    let mut desired = desired_from(&created);
    desired.rooms.push(RoomDescriptor::new("Ghost", 2, 60.0).with_id(9_999));

    let reconciled = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired, &admin())
        .await
        .unwrap();

    assert_eq!(reconciled.summary.rooms_created, 1);
    assert_eq!(reconciled.aggregate.rooms.len(), 3);
    assert!(reconciled.aggregate.room(9_999).is_none());
}

#[tokio::test]
async fn test_duplicate_room_ids_rejected() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;

    let mut desired = desired_from(&created);
    let mut duplicate = desired.rooms[0].clone();
    duplicate.room_type = "Copy".to_string();
    desired.rooms.push(duplicate);

    let err = services
        .properties
        .reconcile_property_aggregate(created.property.id, desired, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_authorization_gate() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;
    let desired = desired_from(&created);

    let denied = [staff(7), owner(6)];
    for auth in denied.iter() {
        let err = services
            .properties
            .reconcile_property_aggregate(created.property.id, desired.clone(), auth)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    // the owner may edit but not hand the property to someone else
    assert!(services
        .properties
        .reconcile_property_aggregate(created.property.id, desired.clone(), &owner(5))
        .await
        .is_ok());

    let mut transfer = desired_from(&snapshot(&services, created.property.id).await);
    transfer.owner_id = 6;
    let err = services
        .properties
        .reconcile_property_aggregate(created.property.id, transfer, &owner(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = services
        .properties
        .create_property_aggregate(
            NewPropertyAggregate {
                owner_id: 7,
                place_id: 43,
                facility_ids: BTreeSet::new(),
                rooms: Vec::new(),
            },
            &staff(7),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_delete_property_cascades() {
    let services = setup().await;
    seed(&services).await;
    let created = create_two_room_property(&services).await;

    services.properties.delete_property(created.property.id, &admin()).await.unwrap();

    let pool = services.pool();
    assert_eq!(count(pool, "SELECT COUNT(*) FROM properties").await, 0);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM room_properties").await, 0);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM property_facilities").await, 0);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM room_property_amenities").await, 0);

    let err = services.properties.get_property_aggregate(created.property.id, &admin()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // the place is free again
    let page = services.properties.list_properties(PaginationParams::default(), &admin()).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(services
        .properties
        .create_property_aggregate(
            NewPropertyAggregate {
                owner_id: 5,
                place_id: 42,
                facility_ids: BTreeSet::new(),
                rooms: vec![deluxe()],
            },
            &admin(),
        )
        .await
        .is_ok());
}
