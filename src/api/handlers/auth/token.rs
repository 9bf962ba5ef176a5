//! Signed session tokens (HS256 JWT).
//!
//! A token is a pure function of the administrator id, the clock and the
//! server secret. Verification never touches a store.

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;
use uuid::Uuid;

use super::principal::Principal;

/// HS256 wants at least as many key bytes as the hash output.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenService {
    /// # Errors
    /// Returns an error if the secret is shorter than [`MIN_SECRET_BYTES`] or
    /// the TTL is not positive.
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Result<Self> {
        let secret = secret.expose_secret().as_bytes();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(anyhow!(
                "JWT secret must be at least {MIN_SECRET_BYTES} bytes, got {}",
                secret.len()
            ));
        }
        if ttl_seconds <= 0 {
            return Err(anyhow!("session TTL must be positive, got {ttl_seconds}"));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds,
        })
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token for a verified administrator.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(&self, admin_id: Uuid) -> Result<String> {
        self.issue_at(admin_id, now_unix_seconds())
    }

    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue_at(&self, admin_id: Uuid, now: i64) -> Result<String> {
        let claims = Claims {
            sub: admin_id.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("failed to sign session token")
    }

    /// Verify signature and expiry.
    ///
    /// # Errors
    /// [`TokenError::InvalidSignature`] when the signature does not match the
    /// secret, [`TokenError::Expired`] once `exp` is not strictly in the future,
    /// [`TokenError::Malformed`] for anything that cannot be parsed.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        self.verify_at(token, now_unix_seconds())
    }

    /// # Errors
    /// See [`TokenService::verify`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Principal, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below with zero leeway and a caller-supplied clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;
        let claims = data.claims;

        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        let admin_id = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Malformed)?;

        Ok(Principal {
            admin_id,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

/// Unix seconds for token issue/expiry.
pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
