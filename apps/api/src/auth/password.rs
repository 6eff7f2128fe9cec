// Password hashing utilities
// bcrypt with a configurable cost

use bcrypt::{hash, verify};

use super::AuthError;

/// Hashes a password with bcrypt
///
/// # Arguments
/// * `password` - The plaintext password
/// * `cost` - bcrypt work factor (`bcrypt::DEFAULT_COST` in production)
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(hash(password, cost)?)
}

/// Checks a plaintext password against a stored hash
///
/// A malformed stored hash is an error, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    Ok(verify(password, hash)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct horse", COST).unwrap();

        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same", COST).unwrap();
        let b = hash_password("same", COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-bcrypt-hash").is_err());
    }
}
