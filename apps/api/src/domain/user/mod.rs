// User domain module
// Accounts, roles and the email value object

#![allow(clippy::module_inception)]

pub mod user;
pub mod value_objects;

pub use user::{User, UserRole};
pub use value_objects::Email;
