use crate::errors::{ServiceError, ServiceResult};
use crate::domains::user::types::{User, NewUser};
use crate::domains::user::repository::UserRepository;
use crate::auth::AuthContext;
use crate::types::Permission;
use crate::validation::Validate;
use std::sync::Arc;

/// Service for user-related operations
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: i64, auth: &AuthContext) -> ServiceResult<User> {
        if id != auth.user_id {
            auth.authorize(Permission::ManageUsers)?;
        }

        self.user_repo.find_by_id(id)
            .await
            .map_err(ServiceError::Domain)
    }

    /// Get all users
    pub async fn get_all_users(&self, auth: &AuthContext) -> ServiceResult<Vec<User>> {
        auth.authorize(Permission::ManageUsers)?;

        self.user_repo.find_all()
            .await
            .map_err(ServiceError::Domain)
    }

    /// Create a new user
    pub async fn create_user(&self, user: NewUser, auth: &AuthContext) -> ServiceResult<User> {
        auth.authorize(Permission::ManageUsers)?;

        user.validate().map_err(ServiceError::Domain)?;

        let created = self.user_repo.create(&user)
            .await
            .map_err(ServiceError::Domain)?;

        log::info!("Created user {} ({})", created.id, created.role.as_str());
        Ok(created)
    }

    /// Deactivate a user. Inactive users can no longer own properties or book rooms.
    pub async fn deactivate_user(&self, id: i64, auth: &AuthContext) -> ServiceResult<User> {
        auth.authorize(Permission::ManageUsers)?;

        if id == auth.user_id {
            return Err(ServiceError::from(
                crate::errors::ValidationError::custom("Cannot deactivate your own user account")
            ));
        }

        self.user_repo.set_active(id, false)
            .await
            .map_err(ServiceError::Domain)
    }

    /// Re-activate a previously deactivated user
    pub async fn activate_user(&self, id: i64, auth: &AuthContext) -> ServiceResult<User> {
        auth.authorize(Permission::ManageUsers)?;

        self.user_repo.set_active(id, true)
            .await
            .map_err(ServiceError::Domain)
    }
}
