//! # Access Controller Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Authenticates operators, issues scoped sessions and answers the security
//! gate's question: "is this token valid for this scope right now?"
//!
//! ## Session Model
//!
//! | Property | Rule |
//! |----------|------|
//! | Token | HS256 JWT: `sub`, `username`, `role`, `scope`, `iat`, `exp`, `jti` |
//! | Storage key | hex SHA-256 of the token; raw tokens are never stored |
//! | Scope | A session is valid for exactly one `Scope` |
//! | Expiry | Checked against the injected `TimeSource`; lazily on use and by the sweep |
//! | Concurrency | Any number of sessions per user |
//! | Revocation | `logout`, `deactivate_user` |
//!
//! ## Lockout
//!
//! ```text
//! failure ─► count += 1 ──► count ≥ max? ──yes──► LOCKED until last_failure + window
//!                                │                        │
//!                                no                  window elapsed
//!                                │                        ▼
//!                           keep counting            counter reset
//! ```
//!
//! Attempts while locked are rejected without being counted. A success
//! resets the counter.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/bcrypt_hasher.rs - BcryptHasher                       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - AccessControllerApi trait                  │
//! │  ports/outbound.rs - PasswordHasher trait                       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/entities.rs - User, Session, Claims, SecurityEvent      │
//! │  domain/lockout.rs  - LockoutTracker                            │
//! │  domain/tokens.rs   - TokenIssuer, token_digest                 │
//! │  domain/errors.rs   - AccessError                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::AccessControllerService;
