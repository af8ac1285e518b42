// Credential and token collaborators.
//
// The resource tree treats the `password_hash` attribute as opaque; this
// module is the only place that reads or writes it.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::{Node, PASSWORD_FIELD};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("credential hashing failed: {0}")]
    Hashing(String),
}

/// JWT claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id of the actor.
    pub sub: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Argon2 hash of `password`, in PHC string form.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Store an argon2 hash of `password` in the user's attributes. Only the
/// hash is kept.
pub fn set_password(user: &mut Node, password: &str) -> Result<(), AuthError> {
    let hash = hash_password(password)?;
    user.attributes.insert(PASSWORD_FIELD.into(), Value::String(hash));
    Ok(())
}

/// Verify `password` against the user's stored hash. A user without a hash
/// is never verified, and a malformed hash is logged and treated as a
/// mismatch.
pub fn verify_password(user: &Node, password: &str) -> bool {
    let Some(hash) = user.attributes.get(PASSWORD_FIELD).and_then(Value::as_str) else {
        return false;
    };
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(user = %user.id, error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

pub fn issue_token(user: &Node, secret: &str, expiry_hours: i64) -> Result<String, AuthError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        name: user.name().to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    Ok(data.claims)
}
