//! Users, sessions, audit entries and configuration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{Role, Scope, UserId};

/// Placeholder secret shipped in defaults. Startup validation rejects it.
pub const DEFAULT_JWT_SECRET: &str = "change-me";

/// Grants every permission.
pub const WILDCARD_PERMISSION: &str = "*";

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.role == Role::Admin
            || self
                .permissions
                .iter()
                .any(|p| p == permission || p == WILDCARD_PERMISSION)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
            permissions: self.permissions.clone(),
            active: self.active,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Input to `register_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
            permissions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub scope: Scope,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// A live, scoped authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Token id (`jti`).
    pub id: String,
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub scope: Scope,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Short token digest, safe to log.
    pub fingerprint: String,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserProfile,
    pub session: Session,
}

/// Category of an audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    Login,
    Logout,
    FailedLogin,
    PermissionDenied,
    SessionExpired,
    SystemAlert,
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub details: String,
    pub at: DateTime<Utc>,
}

/// Conjunctive filter over the audit log. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityEventFilter {
    pub kind: Option<SecurityEventKind>,
    pub user_id: Option<UserId>,
    pub since: Option<DateTime<Utc>>,
}

impl SecurityEventFilter {
    pub fn matches(&self, event: &SecurityEvent) -> bool {
        self.kind.map_or(true, |kind| event.kind == kind)
            && self
                .user_id
                .as_ref()
                .map_or(true, |id| event.user_id.as_ref() == Some(id))
            && self.since.map_or(true, |since| event.at >= since)
    }
}

/// Access Controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub jwt_secret: String,
    pub jwt_expiry_secs: i64,
    pub bcrypt_cost: u32,
    /// Failed attempts that trigger the lockout.
    pub max_login_attempts: u32,
    pub lockout_window_secs: i64,
    pub session_ttl_secs: i64,
    pub audit_log_capacity: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiry_secs: 24 * 3600,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            max_login_attempts: 3,
            lockout_window_secs: 15 * 60,
            session_ttl_secs: 8 * 3600,
            audit_log_capacity: 1000,
        }
    }
}

impl AccessConfig {
    pub fn lockout_window(&self) -> Duration {
        Duration::seconds(self.lockout_window_secs)
    }

    /// Session lifetime: the shorter of the session TTL and the JWT expiry.
    pub fn session_lifetime(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs.min(self.jwt_expiry_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, permissions: &[&str]) -> User {
        User {
            id: "USR_1".into(),
            username: "ops".into(),
            password_hash: String::new(),
            role,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            active: true,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_permissions() {
        assert!(user(Role::Admin, &[]).has_permission("refund"));
        assert!(user(Role::Operator, &["refund"]).has_permission("refund"));
        assert!(user(Role::Operator, &["*"]).has_permission("anything"));
        assert!(!user(Role::Viewer, &["reports"]).has_permission("refund"));
    }

    #[test]
    fn test_audit_filter() {
        let now = Utc::now();
        let event = SecurityEvent {
            kind: SecurityEventKind::FailedLogin,
            user_id: None,
            username: Some("ops".into()),
            details: "invalid credentials".into(),
            at: now,
        };
        assert!(SecurityEventFilter::default().matches(&event));
        assert!(SecurityEventFilter {
            kind: Some(SecurityEventKind::FailedLogin),
            since: Some(now - Duration::seconds(1)),
            ..Default::default()
        }
        .matches(&event));
        assert!(!SecurityEventFilter {
            user_id: Some("USR_1".into()),
            ..Default::default()
        }
        .matches(&event));
    }

    #[test]
    fn test_session_lifetime_is_shorter_bound() {
        let config = AccessConfig {
            session_ttl_secs: 600,
            jwt_expiry_secs: 300,
            ..AccessConfig::default()
        };
        assert_eq!(config.session_lifetime(), Duration::seconds(300));
    }
}
