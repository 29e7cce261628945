//! # Domain Layer - Access Controller
//!
//! - `entities`: users, sessions, claims, audit entries, configuration
//! - `lockout`: failed-login tracking
//! - `tokens`: JWT signing and token digests
//! - `errors`: `AccessError`

pub mod entities;
pub mod errors;
pub mod lockout;
pub mod tokens;

pub use entities::*;
pub use errors::*;
pub use lockout::LockoutTracker;
pub use tokens::{token_digest, token_fingerprint, TokenIssuer};
