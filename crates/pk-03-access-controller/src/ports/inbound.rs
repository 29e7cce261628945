//! # Inbound Port - AccessControllerApi

use async_trait::async_trait;
use shared_types::Scope;

use crate::domain::{
    AccessError, LoginOutcome, NewUser, SecurityEvent, SecurityEventFilter, Session, UserProfile,
};

/// Primary API for the Access Controller.
#[async_trait]
pub trait AccessControllerApi: Send + Sync {
    /// # Errors
    /// - `UsernameTaken`
    /// - `InvalidInput`: empty username or password
    async fn register_user(&self, user: NewUser) -> Result<UserProfile, AccessError>;

    /// Verifies credentials and opens a session scoped to `scope`.
    ///
    /// # Errors
    /// - `AccountLocked`: threshold reached inside the lockout window
    /// - `InvalidCredentials`
    /// - `AccountInactive`
    async fn login(
        &self,
        username: &str,
        password: &str,
        scope: Scope,
    ) -> Result<LoginOutcome, AccessError>;

    /// Returns whether a session was removed.
    async fn logout(&self, token: &str) -> bool;

    /// `Some` only for a correctly signed, known, unexpired token of an
    /// active user whose session scope equals `scope`.
    async fn validate_session(&self, token: &str, scope: Scope) -> Option<Session>;

    /// Emits `PermissionDenied` when the answer is `false`.
    async fn check_permission(&self, user_id: &str, permission: &str) -> bool;

    /// Marks the user inactive and revokes every session. Returns the number
    /// revoked.
    async fn deactivate_user(&self, user_id: &str) -> Result<usize, AccessError>;

    /// Drops sessions past expiry. Returns how many were removed.
    async fn sweep_expired_sessions(&self) -> usize;

    /// Audit log entries matching `filter`, oldest first.
    fn security_events(&self, filter: &SecurityEventFilter) -> Vec<SecurityEvent>;

    fn user(&self, user_id: &str) -> Option<UserProfile>;

    fn active_sessions(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_is_object_safe() {
        fn _assert_object_safe(_: &dyn AccessControllerApi) {}
    }
}
