use crate::services::{Repositories, ServiceSettings};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub settings: ServiceSettings,
    pub jwt_secret: String,
    /// bcrypt work factor for new password hashes
    pub password_cost: u32,
}
