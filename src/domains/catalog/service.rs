use crate::errors::{ServiceError, ServiceResult};
use crate::domains::catalog::types::{CatalogItem, CatalogKind, NewCatalogItem};
use crate::domains::catalog::repository::CatalogRepository;
use crate::auth::AuthContext;
use crate::types::Permission;
use crate::validation::Validate;
use std::sync::Arc;

/// Facility and amenity management
pub struct CatalogService {
    facility_repo: Arc<dyn CatalogRepository>,
    amenity_repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(
        facility_repo: Arc<dyn CatalogRepository>,
        amenity_repo: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self { facility_repo, amenity_repo }
    }

    fn repo(&self, kind: CatalogKind) -> &Arc<dyn CatalogRepository> {
        match kind {
            CatalogKind::Facility => &self.facility_repo,
            CatalogKind::Amenity => &self.amenity_repo,
        }
    }

    pub async fn create_item(
        &self,
        kind: CatalogKind,
        item: NewCatalogItem,
        auth: &AuthContext,
    ) -> ServiceResult<CatalogItem> {
        auth.authorize(Permission::ManageCatalog)?;
        item.validate().map_err(ServiceError::Domain)?;

        let created = self.repo(kind).create(&item.name).await?;
        log::info!("Created {} {} '{}'", kind.entity_name(), created.id, created.name);
        Ok(created)
    }

    pub async fn list_items(&self, kind: CatalogKind, auth: &AuthContext) -> ServiceResult<Vec<CatalogItem>> {
        auth.authorize(Permission::ViewProperties)?;
        Ok(self.repo(kind).find_all().await?)
    }

    pub async fn rename_item(
        &self,
        kind: CatalogKind,
        id: i64,
        item: NewCatalogItem,
        auth: &AuthContext,
    ) -> ServiceResult<CatalogItem> {
        auth.authorize(Permission::ManageCatalog)?;
        item.validate().map_err(ServiceError::Domain)?;

        Ok(self.repo(kind).rename(id, &item.name).await?)
    }

    /// Delete a catalog entry. Properties and rooms that referenced it simply lose the membership.
    pub async fn delete_item(&self, kind: CatalogKind, id: i64, auth: &AuthContext) -> ServiceResult<()> {
        auth.authorize(Permission::ManageCatalog)?;
        self.repo(kind).delete(id).await?;
        log::info!("Deleted {} {}", kind.entity_name(), id);
        Ok(())
    }
}
