// Team domain module
// Buyer teams: aggregate root, membership and permissions, setup validation

#![allow(clippy::module_inception)]

pub mod team;
pub mod validator;
pub mod value_objects;

// Re-export main types for convenience
pub use team::{Team, TeamCreation, TeamUpdate};
pub use validator::{TeamContext, TeamValidator};
pub use value_objects::{Permission, TeamMember, TeamStatus};
