//! bcrypt-backed `PasswordHasher`.

use crate::domain::AccessError;
use crate::ports::PasswordHasher;

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AccessError> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AccessError::Backend(format!("password hashing failed: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AccessError> {
        bcrypt::verify(password, hash)
            .map_err(|e| AccessError::Backend(format!("password verification failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(hasher.verify("hunter2", &hash).unwrap());
        assert!(!hasher.verify("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(BcryptHasher::new(4).verify("x", "not-a-hash").is_err());
    }
}
