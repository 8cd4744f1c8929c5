use serde::{Deserialize, Serialize};

// --- User Role Definition ---

/// UserRole enum for authorization in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Owner,
    Staff,
}

// --- Permission Enum Definition ---

/// Permission enum representing individual permissions in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    // User management
    ManageUsers,

    // Property permissions
    ViewProperties,
    CreateProperties,
    EditProperties,
    EditOwnProperties,
    DeleteProperties,

    // Catalog and place permissions
    ManageCatalog,
    ManagePlaces,

    // Booking and payment permissions
    ViewBookings,
    ManageBookings,
    ManagePayments,

    // Reporting
    ViewDashboard,
}

// --- UserRole Implementation ---

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Owner => "owner",
            UserRole::Staff => "staff",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "owner" => Some(UserRole::Owner),
            "staff" => Some(UserRole::Staff),
            _ => None,
        }
    }

    pub fn all_variants() -> Vec<&'static str> {
        vec!["admin", "owner", "staff"]
    }

    /// Check if the user has a specific permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        match self {
            UserRole::Admin => true, // Admin has all permissions
            UserRole::Owner => {
                match permission {
                    // Owners run their own hotels; everything global is admin-only
                    Permission::ViewProperties
                    | Permission::CreateProperties
                    | Permission::EditOwnProperties
                    | Permission::ViewBookings
                    | Permission::ManageBookings
                    | Permission::ViewDashboard => true,

                    Permission::ManageUsers
                    | Permission::EditProperties
                    | Permission::DeleteProperties
                    | Permission::ManageCatalog
                    | Permission::ManagePlaces
                    | Permission::ManagePayments => false,
                }
            }
            UserRole::Staff => {
                match permission {
                    Permission::ViewProperties
                    | Permission::ViewBookings
                    | Permission::ManageBookings
                    | Permission::ManagePayments
                    | Permission::ViewDashboard => true,

                    Permission::ManageUsers
                    | Permission::CreateProperties
                    | Permission::EditProperties
                    | Permission::EditOwnProperties
                    | Permission::DeleteProperties
                    | Permission::ManageCatalog
                    | Permission::ManagePlaces => false,
                }
            }
        }
    }
}

// --- Permission Implementation (String Conversions & Listing) ---

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageUsers => "manage_users",
            Permission::ViewProperties => "view_properties",
            Permission::CreateProperties => "create_properties",
            Permission::EditProperties => "edit_properties",
            Permission::EditOwnProperties => "edit_own_properties",
            Permission::DeleteProperties => "delete_properties",
            Permission::ManageCatalog => "manage_catalog",
            Permission::ManagePlaces => "manage_places",
            Permission::ViewBookings => "view_bookings",
            Permission::ManageBookings => "manage_bookings",
            Permission::ManagePayments => "manage_payments",
            Permission::ViewDashboard => "view_dashboard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|p| p.as_str() == s)
    }

    /// Get all permissions in the system
    pub fn all() -> Vec<Permission> {
        vec![
            Permission::ManageUsers,
            Permission::ViewProperties, Permission::CreateProperties, Permission::EditProperties,
            Permission::EditOwnProperties, Permission::DeleteProperties,
            Permission::ManageCatalog, Permission::ManagePlaces,
            Permission::ViewBookings, Permission::ManageBookings, Permission::ManagePayments,
            Permission::ViewDashboard,
        ]
    }
}
