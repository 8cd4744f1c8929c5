mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{admin, count, owner, seed, setup, staff};
use hospitality_core::domains::booking::{Booking, BookingStatus, NewBooking, NewPayment, PaymentStatus};
use hospitality_core::domains::property::{NewPropertyAggregate, PropertyAggregate, RoomDescriptor};
use hospitality_core::errors::{ErrorKind, ServiceResult};
use hospitality_core::types::PaginationParams;
use hospitality_core::CoreServices;
use std::collections::BTreeSet;

struct Fixture {
    services: CoreServices,
    harbor: PropertyAggregate,
    old_town: PropertyAggregate,
}

impl Fixture {
    fn standard_room(&self) -> i64 {
        self.harbor.rooms[0].room.id
    }

    fn family_room(&self) -> i64 {
        self.harbor.rooms[1].room.id
    }

    fn loft_room(&self) -> i64 {
        self.old_town.rooms[0].room.id
    }
}

/// Harbor View with a $80 and a $150 room, Old Town Inn with one $200 room
async fn fixture() -> Fixture {
    let services = setup().await;
    seed(&services).await;

    let harbor = services
        .properties
        .create_property_aggregate(
            NewPropertyAggregate {
                owner_id: 5,
                place_id: 42,
                facility_ids: BTreeSet::new(),
                rooms: vec![
                    RoomDescriptor::new("Standard", 2, 80.0),
                    RoomDescriptor::new("Family", 4, 150.0),
                ],
            },
            &admin(),
        )
        .await
        .unwrap();

    let old_town = services
        .properties
        .create_property_aggregate(
            NewPropertyAggregate {
                owner_id: 6,
                place_id: 43,
                facility_ids: BTreeSet::new(),
                rooms: vec![RoomDescriptor::new("Loft", 2, 200.0)],
            },
            &admin(),
        )
        .await
        .unwrap();

    Fixture { services, harbor, old_town }
}

async fn book(services: &CoreServices, room: i64, check_in: &str, check_out: &str, guests: i64) -> ServiceResult<Booking> {
    services
        .bookings
        .create_booking(
            NewBooking {
                room_property_id: room,
                user_id: 7,
                check_in: check_in.to_string(),
                check_out: check_out.to_string(),
                guests,
            },
            &staff(7),
        )
        .await
}

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

async fn set_column(services: &CoreServices, table: &str, column: &str, id: i64, value: &str) {
    sqlx::query(&format!("UPDATE {} SET {} = ? WHERE id = ?", table, column))
        .bind(value)
        .bind(id)
        .execute(services.pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_booking_is_priced_per_night() {
    let fx = fixture().await;

    let booking = book(&fx.services, fx.standard_room(), "2030-06-01", "2030-06-04", 2).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.nights(), 3);
    assert_eq!(booking.total_price, 240.0);
    assert_eq!(booking.check_in, date("2030-06-01"));

    let stored = fx.services.bookings.get_booking(booking.id, &admin()).await.unwrap();
    assert_eq!(stored, booking);
}

#[tokio::test]
async fn test_booking_input_rules() {
    let fx = fixture().await;

    let too_many = book(&fx.services, fx.standard_room(), "2030-06-01", "2030-06-02", 3).await.unwrap_err();
    assert_eq!(too_many.kind(), ErrorKind::Validation);

    let empty_stay = book(&fx.services, fx.standard_room(), "2030-06-01", "2030-06-01", 1).await.unwrap_err();
    assert_eq!(empty_stay.kind(), ErrorKind::Validation);

    let bad_date = book(&fx.services, fx.standard_room(), "June 1st", "2030-06-02", 1).await.unwrap_err();
    assert_eq!(bad_date.kind(), ErrorKind::Validation);

    let no_room = book(&fx.services, 9_999, "2030-06-01", "2030-06-02", 1).await.unwrap_err();
    assert_eq!(no_room.kind(), ErrorKind::NotFound);

    fx.services.users.deactivate_user(7, &admin()).await.unwrap();
    let inactive = book(&fx.services, fx.family_room(), "2030-06-01", "2030-06-02", 1).await.unwrap_err();
    assert_eq!(inactive.kind(), ErrorKind::Validation);

    let bookings = fx.services.bookings.list_bookings_for_room(fx.standard_room(), &admin()).await.unwrap();
    assert!(bookings.is_empty());
}

#[tokio::test]
async fn test_overlapping_stays_conflict_until_cancelled() {
    let fx = fixture().await;
    let room = fx.standard_room();

    let first = book(&fx.services, room, "2030-06-01", "2030-06-04", 2).await.unwrap();

    let overlap = book(&fx.services, room, "2030-06-03", "2030-06-05", 1).await.unwrap_err();
    assert_eq!(overlap.kind(), ErrorKind::Conflict);

    // checkout day is free for the next guest
    assert!(book(&fx.services, room, "2030-06-04", "2030-06-06", 1).await.is_ok());
    // other rooms are unaffected
    assert!(book(&fx.services, fx.family_room(), "2030-06-02", "2030-06-03", 1).await.is_ok());

    fx.services.bookings.cancel_booking(first.id, &staff(7)).await.unwrap();
    assert!(book(&fx.services, room, "2030-06-02", "2030-06-04", 1).await.is_ok());
}

#[tokio::test]
async fn test_booking_lifecycle() {
    let fx = fixture().await;
    let auth = staff(7);
    let booking = book(&fx.services, fx.loft_room(), "2030-07-01", "2030-07-03", 2).await.unwrap();

    let err = fx.services.bookings.complete_booking(booking.id, &auth).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let confirmed = fx.services.bookings.confirm_booking(booking.id, &auth).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let completed = fx.services.bookings.complete_booking(booking.id, &auth).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);

    let err = fx.services.bookings.cancel_booking(booking.id, &auth).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = fx.services.bookings.confirm_booking(4_242, &auth).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_payment_lifecycle() {
    let fx = fixture().await;
    let auth = staff(7);
    let booking = book(&fx.services, fx.loft_room(), "2030-07-01", "2030-07-03", 2).await.unwrap();

    let payment = fx
        .services
        .bookings
        .record_payment(NewPayment { booking_id: booking.id, amount: 400.0, method: "card".to_string() }, &auth)
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.paid_at.is_none());

    let paid = fx.services.bookings.mark_payment_paid(payment.id, &auth).await.unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert!(paid.paid_at.is_some());

    let err = fx.services.bookings.mark_payment_failed(payment.id, &auth).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let refunded = fx.services.bookings.mark_payment_refunded(payment.id, &auth).await.unwrap();
    assert_eq!(refunded.status, PaymentStatus::Refunded);
    assert_eq!(refunded.paid_at, paid.paid_at);

    let payments = fx.services.bookings.list_payments_for_booking(booking.id, &admin()).await.unwrap();
    assert_eq!(payments, vec![refunded]);
}

#[tokio::test]
async fn test_payment_rules() {
    let fx = fixture().await;
    let booking = book(&fx.services, fx.loft_room(), "2030-07-01", "2030-07-03", 2).await.unwrap();

    let bad_amount = fx
        .services
        .bookings
        .record_payment(NewPayment { booking_id: booking.id, amount: 0.0, method: "cash".to_string() }, &staff(7))
        .await
        .unwrap_err();
    assert_eq!(bad_amount.kind(), ErrorKind::Validation);

    let bad_method = fx
        .services
        .bookings
        .record_payment(NewPayment { booking_id: booking.id, amount: 10.0, method: "barter".to_string() }, &staff(7))
        .await
        .unwrap_err();
    assert_eq!(bad_method.kind(), ErrorKind::Validation);

    // owners take bookings but do not handle money
    let denied = fx
        .services
        .bookings
        .record_payment(NewPayment { booking_id: booking.id, amount: 10.0, method: "cash".to_string() }, &owner(6))
        .await
        .unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::PermissionDenied);

    fx.services.bookings.cancel_booking(booking.id, &staff(7)).await.unwrap();
    let cancelled = fx
        .services
        .bookings
        .record_payment(NewPayment { booking_id: booking.id, amount: 10.0, method: "cash".to_string() }, &staff(7))
        .await
        .unwrap_err();
    assert_eq!(cancelled.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_dashboard_totals_and_month_over_month() {
    let fx = fixture().await;
    let services = &fx.services;
    let auth = staff(7);

    let june_a = book(services, fx.standard_room(), "2030-06-01", "2030-06-03", 1).await.unwrap();
    let june_b = book(services, fx.loft_room(), "2030-06-01", "2030-06-02", 1).await.unwrap();
    let may = book(services, fx.family_room(), "2030-05-01", "2030-05-02", 1).await.unwrap();

    set_column(services, "bookings", "created_at", june_a.id, "2030-06-10T09:00:00.000Z").await;
    set_column(services, "bookings", "created_at", june_b.id, "2030-06-15T12:00:00.000Z").await;
    set_column(services, "bookings", "created_at", may.id, "2030-05-20T09:00:00.000Z").await;

    let mut payment_ids = Vec::new();
    for (booking, amount) in [(june_a.id, 160.0), (june_b.id, 200.0), (may.id, 150.0)] {
        let payment = services
            .bookings
            .record_payment(NewPayment { booking_id: booking, amount, method: "card".to_string() }, &auth)
            .await
            .unwrap();
        services.bookings.mark_payment_paid(payment.id, &auth).await.unwrap();
        payment_ids.push(payment.id);
    }
    set_column(services, "payments", "paid_at", payment_ids[0], "2030-06-11T09:00:00.000Z").await;
    // after as_of: counted in the totals only
    set_column(services, "payments", "paid_at", payment_ids[1], "2030-06-20T09:00:00.000Z").await;
    set_column(services, "payments", "paid_at", payment_ids[2], "2030-05-21T09:00:00.000Z").await;

    set_column(services, "properties", "created_at", fx.harbor.property.id, "2030-05-02T00:00:00.000Z").await;
    set_column(services, "properties", "created_at", fx.old_town.property.id, "2030-04-30T23:59:59.999Z").await;

    let as_of = Utc.with_ymd_and_hms(2030, 6, 15, 12, 0, 0).unwrap();
    let stats = services.dashboard.dashboard_stats(as_of, &admin()).await.unwrap();

    assert_eq!(stats.total_properties, 2);
    assert_eq!(stats.total_rooms, 3);
    assert_eq!(stats.total_bookings, 3);
    assert_eq!(stats.total_revenue, 510.0);

    assert_eq!(stats.new_bookings.current, 2.0);
    assert_eq!(stats.new_bookings.previous, 1.0);
    assert_eq!(stats.new_bookings.delta_percent, 100.0);

    assert_eq!(stats.revenue.current, 160.0);
    assert_eq!(stats.revenue.previous, 150.0);

    assert_eq!(stats.new_properties.current, 0.0);
    assert_eq!(stats.new_properties.previous, 1.0);
    assert_eq!(stats.new_properties.delta_percent, -100.0);

    assert!(services.dashboard.dashboard_stats(as_of, &owner(5)).await.is_ok());
}

#[tokio::test]
async fn test_booking_status_counts_list_every_status() {
    let fx = fixture().await;
    let services = &fx.services;
    let auth = staff(7);

    let a = book(services, fx.standard_room(), "2030-06-01", "2030-06-02", 1).await.unwrap();
    let b = book(services, fx.family_room(), "2030-06-01", "2030-06-02", 1).await.unwrap();
    book(services, fx.loft_room(), "2030-06-01", "2030-06-02", 1).await.unwrap();
    services.bookings.confirm_booking(a.id, &auth).await.unwrap();
    services.bookings.cancel_booking(b.id, &auth).await.unwrap();

    let counts = services.dashboard.booking_status_counts(&admin()).await.unwrap();
    let pairs: Vec<(BookingStatus, i64)> = counts.iter().map(|c| (c.status, c.count)).collect();
    assert_eq!(
        pairs,
        vec![
            (BookingStatus::Pending, 1),
            (BookingStatus::Confirmed, 1),
            (BookingStatus::Cancelled, 1),
            (BookingStatus::Completed, 0),
        ]
    );
}

#[tokio::test]
async fn test_top_properties_by_paid_revenue() {
    let fx = fixture().await;
    let services = &fx.services;
    let auth = staff(7);

    let harbor_stay = book(services, fx.standard_room(), "2030-06-01", "2030-06-04", 1).await.unwrap();
    let loft_stay = book(services, fx.loft_room(), "2030-06-01", "2030-06-02", 1).await.unwrap();

    let paid = services
        .bookings
        .record_payment(NewPayment { booking_id: harbor_stay.id, amount: 240.0, method: "card".to_string() }, &auth)
        .await
        .unwrap();
    services.bookings.mark_payment_paid(paid.id, &auth).await.unwrap();
    // pending money is not revenue
    services
        .bookings
        .record_payment(NewPayment { booking_id: loft_stay.id, amount: 900.0, method: "cash".to_string() }, &auth)
        .await
        .unwrap();

    let top = services.dashboard.top_properties_by_revenue(10, &admin()).await.unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].property_id, fx.harbor.property.id);
    assert_eq!(top[0].place_name, "Harbor View");
    assert_eq!(top[0].revenue, 240.0);
    assert_eq!(top[0].paid_payments, 1);
    assert_eq!(top[1].property_id, fx.old_town.property.id);
    assert_eq!(top[1].revenue, 0.0);

    let limited = services.dashboard.top_properties_by_revenue(1, &admin()).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_property_listings_show_prices_and_availability() {
    let fx = fixture().await;
    let services = &fx.services;

    services
        .properties
        .create_property_aggregate(
            NewPropertyAggregate { owner_id: 5, place_id: 44, facility_ids: BTreeSet::new(), rooms: Vec::new() },
            &admin(),
        )
        .await
        .unwrap();

    book(services, fx.standard_room(), "2030-06-01", "2030-06-05", 1).await.unwrap();

    let page = services
        .dashboard
        .property_listings(date("2030-06-03"), date("2030-06-04"), PaginationParams::default(), &owner(5))
        .await
        .unwrap();
    assert_eq!(page.total, 3);

    let names: Vec<&str> = page.items.iter().map(|l| l.place_name.as_str()).collect();
    assert_eq!(names, vec!["Beach House", "Harbor View", "Old Town Inn"]);

    let beach = &page.items[0];
    assert_eq!(beach.room_count, 0);
    assert_eq!(beach.available_rooms, 0);
    assert_eq!(beach.price_range, "N/A");

    let harbor = &page.items[1];
    assert_eq!(harbor.room_count, 2);
    assert_eq!(harbor.available_rooms, 1);
    assert_eq!(harbor.price_range, "$80.00 - $150.00");

    let old_town = &page.items[2];
    assert_eq!(old_town.available_rooms, 1);
    assert_eq!(old_town.price_range, "$200.00");

    // a stay after the booking leaves every room free
    let later = services
        .dashboard
        .property_listings(date("2030-06-05"), date("2030-06-06"), PaginationParams::default(), &admin())
        .await
        .unwrap();
    assert_eq!(later.items[1].available_rooms, 2);

    let err = services
        .dashboard
        .property_listings(date("2030-06-05"), date("2030-06-05"), PaginationParams::default(), &admin())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_booked_room_survives_reconciliation() {
    let fx = fixture().await;
    let services = &fx.services;
    let auth = staff(7);

    let stay = book(services, fx.standard_room(), "2030-06-01", "2030-06-03", 2).await.unwrap();
    services.bookings.confirm_booking(stay.id, &auth).await.unwrap();
    let payment = services
        .bookings
        .record_payment(NewPayment { booking_id: stay.id, amount: 160.0, method: "card".to_string() }, &auth)
        .await
        .unwrap();
    services.bookings.mark_payment_paid(payment.id, &auth).await.unwrap();
    let before = services.properties.get_property_aggregate(fx.harbor.property.id, &admin()).await.unwrap();

    let mut without_standard = before.desired_state();
    without_standard.rooms.retain(|r| r.room_id != Some(fx.standard_room()));
    let mut without_rooms = before.desired_state();
    without_rooms.rooms.clear();

    for desired in [without_standard, without_rooms] {
        let err = services
            .properties
            .reconcile_property_aggregate(fx.harbor.property.id, desired, &admin())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains(&fx.standard_room().to_string()));
    }

    let after = services.properties.get_property_aggregate(fx.harbor.property.id, &admin()).await.unwrap();
    assert_eq!(after, before);
    let pool = services.pool();
    assert_eq!(count(pool, "SELECT COUNT(*) FROM bookings").await, 1);
    assert_eq!(count(pool, "SELECT COUNT(*) FROM payments WHERE status = 'paid'").await, 1);
    let stats = services.dashboard.dashboard_stats(Utc::now(), &admin()).await.unwrap();
    assert_eq!(stats.total_revenue, 160.0);

    // a cancelled stay is still history
    services.bookings.cancel_booking(stay.id, &auth).await.unwrap();
    let mut desired = after.desired_state();
    desired.rooms.clear();
    let err = services
        .properties
        .reconcile_property_aggregate(fx.harbor.property.id, desired, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // unbooked rooms can still go
    let mut desired = after.desired_state();
    desired.rooms.retain(|r| r.room_id == Some(fx.standard_room()));
    let reconciled = services
        .properties
        .reconcile_property_aggregate(fx.harbor.property.id, desired, &admin())
        .await
        .unwrap();
    assert_eq!(reconciled.summary.rooms_deleted, 1);
    assert_eq!(reconciled.aggregate.room_ids(), [fx.standard_room()].into_iter().collect());
}

#[tokio::test]
async fn test_booked_property_cannot_be_deleted() {
    let fx = fixture().await;
    let services = &fx.services;

    book(services, fx.loft_room(), "2030-06-01", "2030-06-02", 1).await.unwrap();

    let err = services.properties.delete_property(fx.old_town.property.id, &admin()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(count(services.pool(), "SELECT COUNT(*) FROM bookings").await, 1);
    assert!(services.properties.get_property_aggregate(fx.old_town.property.id, &admin()).await.is_ok());

    services.properties.delete_property(fx.harbor.property.id, &admin()).await.unwrap();
    assert_eq!(count(services.pool(), "SELECT COUNT(*) FROM properties").await, 1);
}
