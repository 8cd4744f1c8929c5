use crate::errors::{ServiceError, ServiceResult};
use crate::domains::place::types::{Place, PlaceType, NewPlace};
use crate::domains::place::repository::PlaceRepository;
use crate::auth::AuthContext;
use crate::types::{Permission, PaginatedResult, PaginationParams};
use crate::validation::Validate;
use std::sync::Arc;

pub struct PlaceService {
    place_repo: Arc<dyn PlaceRepository>,
}

impl PlaceService {
    pub fn new(place_repo: Arc<dyn PlaceRepository>) -> Self {
        Self { place_repo }
    }

    pub async fn create_place(&self, place: NewPlace, auth: &AuthContext) -> ServiceResult<Place> {
        auth.authorize(Permission::ManagePlaces)?;
        place.validate().map_err(ServiceError::Domain)?;

        let created = self.place_repo.create(&place).await?;
        log::info!("Created place {} ({})", created.id, created.place_type.as_str());
        Ok(created)
    }

    pub async fn get_place(&self, id: i64, auth: &AuthContext) -> ServiceResult<Place> {
        auth.authorize(Permission::ViewProperties)?;
        Ok(self.place_repo.find_by_id(id).await?)
    }

    pub async fn list_places(
        &self,
        params: PaginationParams,
        place_type: Option<PlaceType>,
        auth: &AuthContext,
    ) -> ServiceResult<PaginatedResult<Place>> {
        auth.authorize(Permission::ViewProperties)?;
        Ok(self.place_repo.find_all(params, place_type).await?)
    }
}
