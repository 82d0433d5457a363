//! Password hashing logic.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;
use crate::error::{Result, ServerError};

/// Minimum pre-hash password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum pre-hash password length.
pub const MAX_PASSWORD_LENGTH: usize = 32;

const OUTPUT_LENGTH: usize = 32;

/// Argon2id password manager with fixed-cost parameters.
#[derive(Clone)]
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(OUTPUT_LENGTH),
        )
        .map_err(ServerError::internal)?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2 {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash a plaintext password into a PHC string.
    ///
    /// The plaintext length is gated to [`MIN_PASSWORD_LENGTH`],
    /// [`MAX_PASSWORD_LENGTH`] before any work is done.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        if plaintext.len() < MIN_PASSWORD_LENGTH
            || plaintext.len() > MAX_PASSWORD_LENGTH
        {
            return Err(ServerError::PasswordLength);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(ServerError::internal)?;

        Ok(hash.to_string())
    }

    /// Verify a candidate password against a stored PHC hash.
    ///
    /// Any failure, mismatch or malformed hash alike, surfaces the same
    /// [`ServerError::InvalidPassword`].
    pub fn verify(&self, hash: &str, candidate: &str) -> Result<()> {
        let parsed =
            PasswordHash::new(hash).map_err(|_| ServerError::InvalidPassword)?;

        self.argon2()
            .verify_password(candidate.as_bytes(), &parsed)
            .map_err(|_| ServerError::InvalidPassword)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PasswordManager {
        // Low-cost parameters to keep tests fast.
        PasswordManager::new(Some(ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let pwd = manager();

        for plaintext in ["12345678", "longenough1", &"a".repeat(32)] {
            let hash = pwd.hash(plaintext).unwrap();
            assert_ne!(hash, plaintext);
            assert!(pwd.verify(&hash, plaintext).is_ok());
        }
    }

    #[test]
    fn test_hash_rejects_out_of_range_lengths() {
        let pwd = manager();

        let err = pwd.hash("1234567").unwrap_err();
        assert!(matches!(err, ServerError::PasswordLength));

        let err = pwd.hash(&"a".repeat(33)).unwrap_err();
        assert!(matches!(err, ServerError::PasswordLength));
    }

    #[test]
    fn test_verify_fails_uniformly() {
        let pwd = manager();
        let hash = pwd.hash("longenough1").unwrap();

        let err = pwd.verify(&hash, "longenough2").unwrap_err();
        assert!(matches!(err, ServerError::InvalidPassword));

        // A corrupt hash is indistinguishable from a wrong password.
        let err = pwd.verify("not-a-phc-string", "longenough1").unwrap_err();
        assert!(matches!(err, ServerError::InvalidPassword));
    }
}
