pub mod membership;
pub mod repository;

// Re-export the TRAITS and core types, not specific implementations usually
pub use membership::{MembershipDiff, MembershipTable};
pub use repository::FindById;
