pub mod booking;
pub mod catalog;
pub mod core;
pub mod dashboard;
pub mod permission;
pub mod place;
pub mod property;
pub mod user;

pub use property::{PropertyService, PropertyServiceImpl};
pub use user::{User, UserService};
