pub mod types;
pub mod repository;
pub mod room_repository;
pub mod reconciler;
pub mod service;

pub use types::{
    DesiredPropertyState, NewPropertyAggregate, Property, PropertyAggregate, ReconciledProperty,
    ReconciliationSummary, RoomAggregate, RoomDescriptor, RoomProperty,
};
pub use repository::{PropertyRepository, SqlitePropertyRepository};
pub use room_repository::{RoomPropertyRepository, SqliteRoomPropertyRepository};
pub use reconciler::AggregateReconciler;
pub use service::{PropertyService, PropertyServiceImpl};
