use crate::auth::AuthContext;
use crate::database::TransactionScope;
use crate::domains::booking::payment_repository::PaymentRepository;
use crate::domains::booking::repository::{BookingRecord, BookingRepository};
use crate::domains::booking::types::{
    Booking, BookingStatus, NewBooking, NewPayment, Payment, PaymentMethod, PaymentStatus,
};
use crate::domains::permission::Permission;
use crate::domains::property::room_repository::RoomPropertyRepository;
use crate::domains::user::repository::UserRepository;
use crate::errors::{DomainError, ServiceResult, ValidationError};
use crate::validation::Validate;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Bookings of rooms and the payments recorded against them
pub struct BookingService {
    pool: SqlitePool,
    booking_repo: Arc<dyn BookingRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    room_repo: Arc<dyn RoomPropertyRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl BookingService {
    pub fn new(
        pool: SqlitePool,
        booking_repo: Arc<dyn BookingRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        room_repo: Arc<dyn RoomPropertyRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            pool,
            booking_repo,
            payment_repo,
            room_repo,
            user_repo,
        }
    }

    /// Create a pending booking priced at nights × the room's nightly price
    pub async fn create_booking(&self, new_booking: NewBooking, auth: &AuthContext) -> ServiceResult<Booking> {
        auth.authorize(Permission::ManageBookings)?;
        new_booking.validate()?;
        let (check_in, check_out) = new_booking.stay()?;

        let mut scope = TransactionScope::begin(&self.pool, "create_booking").await?;
        let result: Result<Booking, DomainError> = async {
            let tx = scope.tx()?;

            let room = self.room_repo.find_by_id_with_tx(new_booking.room_property_id, tx).await?;

            if self.user_repo.find_active_by_id_with_tx(new_booking.user_id, tx).await?.is_none() {
                return Err(DomainError::Validation(ValidationError::relationship(&format!(
                    "user_id: user {} does not exist or is inactive",
                    new_booking.user_id
                ))));
            }

            if new_booking.guests > room.max_guests {
                return Err(DomainError::Validation(ValidationError::range(
                    "guests",
                    1,
                    room.max_guests,
                )));
            }

            if self
                .booking_repo
                .has_overlap_with_tx(room.id, check_in, check_out, tx)
                .await?
            {
                return Err(DomainError::Conflict(format!(
                    "Room {} is already booked between {} and {}",
                    room.id, check_in, check_out
                )));
            }

            let nights = (check_out - check_in).num_days();
            let record = BookingRecord {
                room_property_id: room.id,
                user_id: new_booking.user_id,
                check_in,
                check_out,
                guests: new_booking.guests,
                total_price: nights as f64 * room.price_per_night,
            };
            self.booking_repo.insert_with_tx(&record, tx).await
        }
        .await;

        let booking = scope.finish(result).await?;
        log::info!(
            "Booked room {} for user {} ({} nights, {:.2})",
            booking.room_property_id,
            booking.user_id,
            booking.nights(),
            booking.total_price
        );
        Ok(booking)
    }

    pub async fn get_booking(&self, id: i64, auth: &AuthContext) -> ServiceResult<Booking> {
        auth.authorize(Permission::ViewBookings)?;
        Ok(self.booking_repo.find_by_id(id).await?)
    }

    pub async fn list_bookings_for_room(&self, room_property_id: i64, auth: &AuthContext) -> ServiceResult<Vec<Booking>> {
        auth.authorize(Permission::ViewBookings)?;
        Ok(self.booking_repo.list_by_room(room_property_id).await?)
    }

    pub async fn confirm_booking(&self, id: i64, auth: &AuthContext) -> ServiceResult<Booking> {
        self.transition_booking(id, BookingStatus::Confirmed, auth).await
    }

    pub async fn cancel_booking(&self, id: i64, auth: &AuthContext) -> ServiceResult<Booking> {
        self.transition_booking(id, BookingStatus::Cancelled, auth).await
    }

    pub async fn complete_booking(&self, id: i64, auth: &AuthContext) -> ServiceResult<Booking> {
        self.transition_booking(id, BookingStatus::Completed, auth).await
    }

    async fn transition_booking(&self, id: i64, to: BookingStatus, auth: &AuthContext) -> ServiceResult<Booking> {
        auth.authorize(Permission::ManageBookings)?;

        let mut scope = TransactionScope::begin(&self.pool, "transition_booking").await?;
        let result: Result<Booking, DomainError> = async {
            let tx = scope.tx()?;
            let booking = self.booking_repo.find_by_id_with_tx(id, tx).await?;

            if !booking.status.can_transition_to(to) {
                return Err(DomainError::Validation(ValidationError::invalid_value(
                    "status",
                    &format!("cannot move booking from {} to {}", booking.status.as_str(), to.as_str()),
                )));
            }

            if !self.booking_repo.update_status_with_tx(id, booking.status, to, tx).await? {
                return Err(DomainError::Conflict(format!("Booking {} changed concurrently", id)));
            }

            self.booking_repo.find_by_id_with_tx(id, tx).await
        }
        .await;

        let booking = scope.finish(result).await?;
        log::info!("Booking {} is now {}", id, booking.status.as_str());
        Ok(booking)
    }

    /// Record a pending payment against a booking that is not cancelled
    pub async fn record_payment(&self, new_payment: NewPayment, auth: &AuthContext) -> ServiceResult<Payment> {
        auth.authorize(Permission::ManagePayments)?;
        new_payment.validate()?;
        let method = PaymentMethod::from_str(&new_payment.method).ok_or_else(|| {
            ValidationError::invalid_value("method", "Invalid payment method")
        })?;

        let mut scope = TransactionScope::begin(&self.pool, "record_payment").await?;
        let result: Result<Payment, DomainError> = async {
            let tx = scope.tx()?;
            let booking = self.booking_repo.find_by_id_with_tx(new_payment.booking_id, tx).await?;

            if booking.status == BookingStatus::Cancelled {
                return Err(DomainError::Validation(ValidationError::invalid_value(
                    "booking_id",
                    &format!("booking {} is cancelled", booking.id),
                )));
            }

            self.payment_repo
                .insert_with_tx(booking.id, new_payment.amount, method, tx)
                .await
        }
        .await;

        Ok(scope.finish(result).await?)
    }

    pub async fn list_payments_for_booking(&self, booking_id: i64, auth: &AuthContext) -> ServiceResult<Vec<Payment>> {
        auth.authorize(Permission::ViewBookings)?;
        Ok(self.payment_repo.list_by_booking(booking_id).await?)
    }

    pub async fn mark_payment_paid(&self, id: i64, auth: &AuthContext) -> ServiceResult<Payment> {
        self.transition_payment(id, PaymentStatus::Paid, auth).await
    }

    pub async fn mark_payment_failed(&self, id: i64, auth: &AuthContext) -> ServiceResult<Payment> {
        self.transition_payment(id, PaymentStatus::Failed, auth).await
    }

    pub async fn mark_payment_refunded(&self, id: i64, auth: &AuthContext) -> ServiceResult<Payment> {
        self.transition_payment(id, PaymentStatus::Refunded, auth).await
    }

    async fn transition_payment(&self, id: i64, to: PaymentStatus, auth: &AuthContext) -> ServiceResult<Payment> {
        auth.authorize(Permission::ManagePayments)?;

        let mut scope = TransactionScope::begin(&self.pool, "transition_payment").await?;
        let result: Result<Payment, DomainError> = async {
            let tx = scope.tx()?;
            let payment = self.payment_repo.find_by_id_with_tx(id, tx).await?;

            if !payment.status.can_transition_to(to) {
                return Err(DomainError::Validation(ValidationError::invalid_value(
                    "status",
                    &format!("cannot move payment from {} to {}", payment.status.as_str(), to.as_str()),
                )));
            }

            if !self.payment_repo.update_status_with_tx(id, payment.status, to, tx).await? {
                return Err(DomainError::Conflict(format!("Payment {} changed concurrently", id)));
            }

            self.payment_repo.find_by_id_with_tx(id, tx).await
        }
        .await;

        let payment = scope.finish(result).await?;
        log::info!("Payment {} is now {}", id, payment.status.as_str());
        Ok(payment)
    }
}
