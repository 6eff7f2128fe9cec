// Domain layer module exports
// Aggregates, value objects and business rules for the marketplace
// Domain is independent of infrastructure concerns

pub mod application;
pub mod audit;
pub mod brief;
pub mod brief_response;
pub mod eligibility;
pub mod errors;
pub mod events;
pub mod evidence;
pub mod framework;
pub mod repositories;
pub mod supplier;
pub mod team;
pub mod user;
pub mod user_claim;
pub mod validation;

pub use errors::{DomainError, DomainResult};
pub use events::DomainEvent;
