use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::{auth::error::AuthError, config::PasswordConfig};

/// Argon2id hasher with a configurable cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cfg: PasswordConfig,
}

impl PasswordHasher {
    pub fn new(cfg: PasswordConfig) -> Result<Self, AuthError> {
        // Reject unusable parameters at startup rather than on the first signup.
        Self::params(&cfg)?;
        Ok(Self { cfg })
    }

    fn params(cfg: &PasswordConfig) -> Result<Params, AuthError> {
        Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None).map_err(|e| {
            error!(error = %e, "invalid argon2 params");
            AuthError::Hashing(e.to_string())
        })
    }

    fn argon2(&self) -> Result<Argon2<'static>, AuthError> {
        Ok(Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Self::params(&self.cfg)?,
        ))
    }

    pub fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AuthError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// The cost recorded in `hash` wins over the configured one, so digests
    /// made under an older configuration keep verifying.
    pub fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AuthError::Hashing(e.to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> PasswordHasher {
    PasswordHasher::new(PasswordConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .expect("minimal argon2 params are valid")
}
