pub mod types;
pub mod repository;
pub mod service;

pub use types::{Place, PlaceType, NewPlace, PlaceSummary};
pub use repository::{PlaceRepository, SqlitePlaceRepository};
pub use service::PlaceService;
