//! Salted one-way password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, so the salt and the cost parameters
//! travel with the hash and verification needs nothing else.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::{CrmError, Result};

#[derive(Clone)]
pub struct Hasher {
    argon2: Argon2<'static>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Hasher {
    /// Argon2id with explicit memory (KiB) and iteration costs
    pub fn with_costs(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| CrmError::Config(format!("invalid hashing parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)?;

        Ok(hash.to_string())
    }

    /// False for a wrong password and for a stored hash that does not parse
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
