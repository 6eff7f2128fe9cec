// Authentication utilities
// Bearer tokens for API callers and bcrypt password storage

pub mod jwt;
pub mod password;

use thiserror::Error;

/// Failures while issuing or checking credentials
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}
