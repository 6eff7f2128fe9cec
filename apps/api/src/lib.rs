//! Marketplace API Library
//!
//! Buyer opportunities, seller responses, seller applications, domain
//! assessments, buyer teams, user claims and the audit log, served as a
//! JSON API over PostgreSQL.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod telemetry;
