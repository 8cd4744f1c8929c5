pub mod types;
pub mod repository;
pub mod service;

pub use types::{CatalogItem, CatalogKind, NewCatalogItem};
pub use repository::{CatalogRepository, SqliteCatalogRepository};
pub use service::CatalogService;
