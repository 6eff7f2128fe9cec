// Brief (opportunity) domain module
// Aggregate root, derived status, deadline rules and per-lot data validation

#![allow(clippy::module_inception)]

pub mod brief;
pub mod deadlines;
pub mod validator;
pub mod value_objects;

pub use brief::{Brief, BriefHistory, LiveEdits, DEFAULT_NUMBER_OF_SUPPLIERS};
pub use deadlines::DeadlineRules;
pub use value_objects::{BriefStatus, OpenTo, SellerSelector};
