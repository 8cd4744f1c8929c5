use crate::types::{UserRole, Permission};
use crate::errors::ServiceError;

/// Represents the authenticated caller for the current operation.
///
/// The request layer builds this after authenticating; the core never looks up
/// the current user on its own.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The ID of the authenticated user
    pub user_id: i64,

    /// The role of the authenticated user
    pub role: UserRole,
}

impl AuthContext {
    /// Create a new authentication context
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Check if user has a specific permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    /// Authorize a specific permission, returning an error if not allowed
    pub fn authorize(&self, permission: Permission) -> Result<(), ServiceError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "User does not have permission: {}",
                permission.as_str()
            )))
        }
    }

    /// Allow when the caller holds `any_permission`, or holds `own_permission` and owns the resource
    pub fn authorize_owner_or(
        &self,
        resource_owner_id: i64,
        own_permission: Permission,
        any_permission: Permission,
    ) -> Result<(), ServiceError> {
        if self.has_permission(any_permission)
            || (self.user_id == resource_owner_id && self.has_permission(own_permission))
        {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(
                "You do not have permission to modify this resource".to_string()
            ))
        }
    }
}
