use crate::domains::booking::{BookingService, SqliteBookingRepository, SqlitePaymentRepository};
use crate::domains::catalog::{CatalogKind, CatalogRepository, CatalogService, SqliteCatalogRepository};
use crate::domains::dashboard::{DashboardService, SqliteDashboardRepository};
use crate::domains::place::{PlaceRepository, PlaceService, SqlitePlaceRepository};
use crate::domains::property::{
    AggregateReconciler, PropertyRepository, PropertyService, PropertyServiceImpl,
    RoomPropertyRepository, SqlitePropertyRepository, SqliteRoomPropertyRepository,
};
use crate::domains::user::{SqliteUserRepository, UserRepository, UserService};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Every service of the core, wired against one pool.
///
/// Built once by `initialize` and handed to the request layer, which shares it
/// across requests. Cloning is cheap.
#[derive(Clone)]
pub struct CoreServices {
    pool: SqlitePool,
    pub users: Arc<UserService>,
    pub places: Arc<PlaceService>,
    pub catalog: Arc<CatalogService>,
    pub properties: Arc<dyn PropertyService>,
    pub bookings: Arc<BookingService>,
    pub dashboard: Arc<DashboardService>,
}

impl CoreServices {
    pub fn new(pool: SqlitePool) -> Self {
        // Repositories
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
        let place_repo: Arc<dyn PlaceRepository> = Arc::new(SqlitePlaceRepository::new(pool.clone()));
        let facility_repo: Arc<dyn CatalogRepository> =
            Arc::new(SqliteCatalogRepository::new(pool.clone(), CatalogKind::Facility));
        let amenity_repo: Arc<dyn CatalogRepository> =
            Arc::new(SqliteCatalogRepository::new(pool.clone(), CatalogKind::Amenity));
        let property_repo: Arc<dyn PropertyRepository> = Arc::new(SqlitePropertyRepository::new(pool.clone()));
        let room_repo: Arc<dyn RoomPropertyRepository> = Arc::new(SqliteRoomPropertyRepository::new(pool.clone()));

        let reconciler = Arc::new(AggregateReconciler::new(
            property_repo.clone(),
            room_repo.clone(),
            user_repo.clone(),
            place_repo.clone(),
            facility_repo.clone(),
            amenity_repo.clone(),
        ));

        // Services
        let properties: Arc<dyn PropertyService> = Arc::new(PropertyServiceImpl::new(
            pool.clone(),
            property_repo,
            place_repo.clone(),
            reconciler,
        ));
        let bookings = Arc::new(BookingService::new(
            pool.clone(),
            Arc::new(SqliteBookingRepository::new(pool.clone())),
            Arc::new(SqlitePaymentRepository::new(pool.clone())),
            room_repo,
            user_repo.clone(),
        ));

        Self {
            users: Arc::new(UserService::new(user_repo)),
            places: Arc::new(PlaceService::new(place_repo)),
            catalog: Arc::new(CatalogService::new(facility_repo, amenity_repo)),
            properties,
            bookings,
            dashboard: Arc::new(DashboardService::new(Arc::new(SqliteDashboardRepository::new(pool.clone())))),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
