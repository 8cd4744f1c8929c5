pub mod types;
pub mod repository;
pub mod payment_repository;
pub mod service;

pub use types::{Booking, BookingStatus, NewBooking, NewPayment, Payment, PaymentMethod, PaymentStatus};
pub use repository::{BookingRepository, SqliteBookingRepository};
pub use payment_repository::{PaymentRepository, SqlitePaymentRepository};
pub use service::BookingService;
