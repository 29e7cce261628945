//! Adapters implementing Access Controller outbound ports.

pub mod bcrypt_hasher;

pub use bcrypt_hasher::BcryptHasher;
