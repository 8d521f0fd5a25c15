/// Password Hashing and Verification
///
/// Stored credentials are bcrypt hashes; the hashing policy (cost) is fixed
/// by whoever writes the credential store.

use bcrypt::{hash, verify};

use crate::error::AppError;

pub use bcrypt::DEFAULT_COST;

/// Checks a plaintext password against a stored adaptive hash
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError>;
}

/// bcrypt-backed verifier
#[derive(Debug, Default, Clone, Copy)]
pub struct BcryptVerifier;

impl CredentialVerifier for BcryptVerifier {
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        verify(password, password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if bcrypt rejects the cost or hashing fails
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}
