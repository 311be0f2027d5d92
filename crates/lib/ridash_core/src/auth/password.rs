//! Password hashing and credential verification via bcrypt.

use super::AuthError;
use crate::models::auth::User;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Check a login attempt against the stored user.
///
/// Unknown users, OAuth-only users and wrong passwords all yield the same
/// [`AuthError::CredentialError`] so callers cannot probe for accounts.
pub fn verify_credentials(user: Option<&User>, password: &str) -> Result<i64, AuthError> {
    let Some(user) = user else {
        return Err(AuthError::CredentialError);
    };
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(AuthError::CredentialError);
    };
    // A malformed stored hash is treated like a mismatch.
    match verify_password(password, hash) {
        Ok(true) => Ok(user.id),
        Ok(false) | Err(_) => Err(AuthError::CredentialError),
    }
}
