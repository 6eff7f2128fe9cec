// HTTP handlers, one module per resource
// Handlers parse requests, call a service and shape the response

pub mod applications;
pub mod audit;
pub mod auth;
pub mod brief_responses;
pub mod briefs;
pub mod claims;
pub mod evidence;
pub mod teams;
