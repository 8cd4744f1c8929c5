use crate::auth::AuthContext;
use crate::database::TransactionScope;
use crate::domains::permission::Permission;
use crate::domains::place::repository::PlaceRepository;
use crate::domains::property::reconciler::AggregateReconciler;
use crate::domains::property::repository::PropertyRepository;
use crate::domains::property::types::{
    DesiredPropertyState, NewPropertyAggregate, Property, PropertyAggregate, ReconciledProperty,
};
use crate::errors::{DomainError, DomainResult, ServiceError, ServiceResult, ValidationError};
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::Validate;
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

/// Trait defining property aggregate operations
#[async_trait]
pub trait PropertyService: Send + Sync {
    /// Create a property on an unbound place together with its facilities and rooms
    async fn create_property_aggregate(
        &self,
        new_property: NewPropertyAggregate,
        auth: &AuthContext,
    ) -> ServiceResult<PropertyAggregate>;

    /// Make the stored property equal `desired`, all or nothing
    async fn reconcile_property_aggregate(
        &self,
        property_id: i64,
        desired: DesiredPropertyState,
        auth: &AuthContext,
    ) -> ServiceResult<ReconciledProperty>;

    async fn get_property_aggregate(
        &self,
        property_id: i64,
        auth: &AuthContext,
    ) -> ServiceResult<PropertyAggregate>;

    async fn list_properties(
        &self,
        params: PaginationParams,
        auth: &AuthContext,
    ) -> ServiceResult<PaginatedResult<Property>>;

    async fn delete_property(&self, property_id: i64, auth: &AuthContext) -> ServiceResult<()>;
}

/// Implementation of the property service
pub struct PropertyServiceImpl {
    pool: SqlitePool,
    property_repo: Arc<dyn PropertyRepository>,
    place_repo: Arc<dyn PlaceRepository>,
    reconciler: Arc<AggregateReconciler>,
}

impl PropertyServiceImpl {
    pub fn new(
        pool: SqlitePool,
        property_repo: Arc<dyn PropertyRepository>,
        place_repo: Arc<dyn PlaceRepository>,
        reconciler: Arc<AggregateReconciler>,
    ) -> Self {
        Self {
            pool,
            property_repo,
            place_repo,
            reconciler,
        }
    }

    /// Properties whose rooms carry booking history are kept
    async fn delete_unbooked_with_tx(
        &self,
        property_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<()> {
        let bookings = self.property_repo.booking_count_with_tx(property_id, tx).await?;
        if bookings > 0 {
            return Err(DomainError::Conflict(format!(
                "Property {} has {} bookings and cannot be deleted",
                property_id, bookings
            )));
        }
        self.property_repo.delete_with_tx(property_id, tx).await
    }

    /// Owners may only assign properties to themselves; moving ownership needs the broader permission
    fn authorize_owner_assignment(&self, owner_id: i64, auth: &AuthContext) -> ServiceResult<()> {
        if owner_id != auth.user_id && !auth.has_permission(Permission::EditProperties) {
            return Err(ServiceError::PermissionDenied(
                "Only administrators can assign a property to another owner".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyService for PropertyServiceImpl {
    async fn create_property_aggregate(
        &self,
        new_property: NewPropertyAggregate,
        auth: &AuthContext,
    ) -> ServiceResult<PropertyAggregate> {
        auth.authorize(Permission::CreateProperties)?;
        self.authorize_owner_assignment(new_property.owner_id, auth)?;

        new_property.validate()?;
        let desired = new_property.desired_state();

        let mut scope = TransactionScope::begin(&self.pool, "create_property_aggregate").await?;
        let result: Result<PropertyAggregate, DomainError> = async {
            let tx = scope.tx()?;

            match self.place_repo.find_by_id_with_tx(new_property.place_id, tx).await {
                Ok(_) => {}
                Err(DomainError::EntityNotFound(_, _)) => {
                    return Err(DomainError::Validation(ValidationError::relationship(&format!(
                        "place_id: place {} does not exist",
                        new_property.place_id
                    ))));
                }
                Err(e) => return Err(e),
            }

            if let Some(existing) = self
                .property_repo
                .find_by_place_id_with_tx(new_property.place_id, tx)
                .await?
            {
                return Err(DomainError::Conflict(format!(
                    "Place {} already has property {}",
                    new_property.place_id, existing.id
                )));
            }

            self.reconciler.check_references_with_tx(&desired, tx).await?;

            let property = self
                .property_repo
                .insert_with_tx(new_property.owner_id, new_property.place_id, tx)
                .await?;
            let reconciled = self.reconciler.apply_new_with_tx(&property, &desired, tx).await?;
            Ok(reconciled.aggregate)
        }
        .await;

        let aggregate = scope.finish(result).await?;
        log::info!(
            "Created property {} on place {} for owner {}",
            aggregate.property.id,
            aggregate.property.place_id,
            aggregate.property.owner_id
        );
        Ok(aggregate)
    }

    async fn reconcile_property_aggregate(
        &self,
        property_id: i64,
        desired: DesiredPropertyState,
        auth: &AuthContext,
    ) -> ServiceResult<ReconciledProperty> {
        let property = self.property_repo.find_by_id(property_id).await?;
        auth.authorize_owner_or(
            property.owner_id,
            Permission::EditOwnProperties,
            Permission::EditProperties,
        )?;
        self.authorize_owner_assignment(desired.owner_id, auth)?;

        // Scalar checks run before the transaction opens
        desired.validate()?;

        let mut scope = TransactionScope::begin(&self.pool, "reconcile_property_aggregate").await?;
        let result = match scope.tx() {
            Ok(tx) => self.reconciler.apply_with_tx(property_id, &desired, tx).await,
            Err(e) => Err(e),
        };

        Ok(scope.finish(result).await?)
    }

    async fn get_property_aggregate(
        &self,
        property_id: i64,
        auth: &AuthContext,
    ) -> ServiceResult<PropertyAggregate> {
        auth.authorize(Permission::ViewProperties)?;

        // Read through one transaction so rooms and memberships come from the same snapshot
        let mut scope = TransactionScope::begin(&self.pool, "get_property_aggregate").await?;
        let result = match scope.tx() {
            Ok(tx) => self.reconciler.load_aggregate_with_tx(property_id, tx).await,
            Err(e) => Err(e),
        };

        Ok(scope.finish(result).await?)
    }

    async fn list_properties(
        &self,
        params: PaginationParams,
        auth: &AuthContext,
    ) -> ServiceResult<PaginatedResult<Property>> {
        auth.authorize(Permission::ViewProperties)?;
        Ok(self.property_repo.find_all(params).await?)
    }

    async fn delete_property(&self, property_id: i64, auth: &AuthContext) -> ServiceResult<()> {
        auth.authorize(Permission::DeleteProperties)?;

        let mut scope = TransactionScope::begin(&self.pool, "delete_property").await?;
        let result = match scope.tx() {
            Ok(tx) => self.delete_unbooked_with_tx(property_id, tx).await,
            Err(e) => Err(e),
        };

        scope.finish(result).await?;
        log::info!("Deleted property {}", property_id);
        Ok(())
    }
}
