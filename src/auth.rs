//! Credential handling: bcrypt password hashes and HS256 bearer tokens.
//!
//! A token is scoped to exactly one vault and carries the caller's role.
//! Owners hold full read/write access, guests may only read public files.
//! Handlers pull `Claims` out of the `Authorization` header via the axum
//! extractor below and call [`Claims::require_owner`] before any mutation.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::{AppError, VaultError, VaultResult};

/// Caller role carried inside a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Guest,
}

/// Bearer token payload: one vault, one role, one expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub vault_id: Uuid,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    /// Reject guest tokens before a mutating operation runs.
    pub fn require_owner(&self) -> VaultResult<()> {
        if self.role == Role::Owner {
            Ok(())
        } else {
            Err(VaultError::Forbidden)
        }
    }
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Arc<String>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            ttl,
        }
    }

    /// Issue a token for `vault_id` with the given role, valid for the
    /// configured TTL.
    pub fn issue(&self, vault_id: Uuid, role: Role) -> VaultResult<String> {
        let exp = chrono::Utc::now().timestamp() as usize + self.ttl.as_secs() as usize;
        let claims = Claims {
            vault_id,
            role,
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| VaultError::Internal(format!("token encoding failed: {}", err)))
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }
}

/// Hash a vault password for storage.
pub fn hash_password(password: &str) -> VaultResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|err| VaultError::Internal(format!("password hashing failed: {}", err)))
}

/// Check a login password against the stored hash.
pub fn verify_password(password: &str, hash: &str) -> VaultResult<bool> {
    bcrypt::verify(password, hash)
        .map_err(|err| VaultError::Internal(format!("password verification failed: {}", err)))
}

impl<S> FromRequestParts<S> for Claims
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        tokens
            .verify(token)
            .map_err(|_| AppError::unauthorized("invalid or expired token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let tokens = service();
        let vault_id = Uuid::new_v4();

        let token = tokens.issue(vault_id, Role::Owner).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.vault_id, vault_id);
        assert_eq!(claims.role, Role::Owner);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = service().issue(Uuid::new_v4(), Role::Owner).unwrap();
        let other = TokenService::new("different-secret", Duration::from_secs(3600));

        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        // Well past the default validation leeway.
        let claims = Claims {
            vault_id: Uuid::new_v4(),
            role: Role::Owner,
            exp: (chrono::Utc::now().timestamp() - 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn guest_claims_fail_the_owner_guard() {
        let claims = Claims {
            vault_id: Uuid::new_v4(),
            role: Role::Guest,
            exp: usize::MAX,
        };

        assert!(matches!(
            claims.require_owner(),
            Err(VaultError::Forbidden)
        ));
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("hunter2").unwrap();

        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }
}
