//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$...`) so the salt and
//! parameters travel with the hash. Argon2 is CPU and memory hard, so the
//! async entry points run it on the blocking pool.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tokio::task::spawn_blocking;

/// Well-formed hash that matches no password. Verified against when the email
/// is unknown so both login failure paths cost one Argon2 run.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// # Errors
/// Returns an error if hashing fails or the blocking task panics.
pub(super) async fn hash_password(password: String) -> Result<String> {
    spawn_blocking(move || hash_password_blocking(&password))
        .await
        .context("password hashing task failed")?
}

/// Constant-time comparison through Argon2's own verifier.
///
/// # Errors
/// Returns an error if the stored hash cannot be parsed, verification fails
/// for a reason other than a wrong password, or the blocking task panics.
pub(super) async fn verify_password(password: String, stored_hash: String) -> Result<bool> {
    spawn_blocking(move || verify_password_blocking(&password, &stored_hash))
        .await
        .context("password verification task failed")?
}

/// Burn one verification against [`DUMMY_HASH`].
pub(super) async fn verify_dummy(password: String) {
    let _ = verify_password(password, DUMMY_HASH.to_string()).await;
}

fn hash_password_blocking(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}

fn verify_password_blocking(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| anyhow!("invalid stored password hash: {e}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("failed to verify password: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() -> Result<()> {
        let hash = hash_password("password123".to_string()).await?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("password123".to_string(), hash.clone()).await?);
        assert!(!verify_password("wrongpass".to_string(), hash).await?);
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash_password_blocking("password123")?;
        let second = hash_password_blocking("password123")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn dummy_hash_parses_and_never_matches() -> Result<()> {
        assert!(!verify_password_blocking("password123", DUMMY_HASH)?);
        assert!(!verify_password_blocking("", DUMMY_HASH)?);
        Ok(())
    }

    #[tokio::test]
    async fn garbage_hash_is_an_error() {
        assert!(
            verify_password("password123".to_string(), "not-a-phc-string".to_string())
                .await
                .is_err()
        );
    }
}
