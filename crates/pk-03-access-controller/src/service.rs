//! # Access Controller Service
//!
//! Users, scoped sessions keyed by token digest, sliding login lockout and
//! a bounded audit log. Session checks fail closed: anything short of a
//! fully valid session yields `None`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_bus::{EventPublisher, ParkingEvent};
use shared_types::{prefixed_id, Scope, TimeSource, UserId};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::BcryptHasher;
use crate::domain::{
    token_digest, token_fingerprint, AccessConfig, AccessError, Claims, LockoutTracker,
    LoginOutcome, NewUser, SecurityEvent, SecurityEventFilter, SecurityEventKind, Session,
    TokenIssuer, User, UserProfile,
};
use crate::ports::{AccessControllerApi, PasswordHasher};

struct AccessState {
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    /// Keyed by `token_digest`.
    sessions: HashMap<String, Session>,
    lockout: LockoutTracker,
    audit: VecDeque<SecurityEvent>,
    audit_capacity: usize,
}

impl AccessState {
    fn user_by_name(&self, username: &str) -> Option<&User> {
        self.usernames.get(username).and_then(|id| self.users.get(id))
    }

    fn audit(
        &mut self,
        kind: SecurityEventKind,
        user_id: Option<&str>,
        username: Option<&str>,
        details: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        if self.audit.len() >= self.audit_capacity {
            self.audit.pop_front();
        }
        self.audit.push_back(SecurityEvent {
            kind,
            user_id: user_id.map(str::to_string),
            username: username.map(str::to_string),
            details: details.into(),
            at,
        });
    }
}

enum Verdict {
    Valid(Session),
    Expired(Session),
    Rejected(&'static str),
}

/// The Access Controller.
pub struct AccessControllerService {
    config: AccessConfig,
    state: RwLock<AccessState>,
    issuer: TokenIssuer,
    hasher: Arc<dyn PasswordHasher>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl AccessControllerService {
    /// Service using bcrypt at the configured cost.
    pub fn new(
        config: AccessConfig,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost));
        Self::with_hasher(config, hasher, publisher, clock)
    }

    pub fn with_hasher(
        config: AccessConfig,
        hasher: Arc<dyn PasswordHasher>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let state = AccessState {
            users: HashMap::new(),
            usernames: HashMap::new(),
            sessions: HashMap::new(),
            lockout: LockoutTracker::new(config.max_login_attempts, config.lockout_window()),
            audit: VecDeque::with_capacity(config.audit_log_capacity.min(1024)),
            audit_capacity: config.audit_log_capacity.max(1),
        };
        Self {
            issuer: TokenIssuer::new(&config.jwt_secret),
            config,
            state: RwLock::new(state),
            hasher,
            publisher,
            clock,
        }
    }

    /// bcrypt is CPU-bound and runs on the blocking pool.
    async fn hash_password(&self, password: &str) -> Result<String, AccessError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AccessError::Backend(format!("password hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: &str, hash: String) -> Result<bool, AccessError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AccessError::Backend(format!("password verification task failed: {e}")))?
    }

    async fn auth_failed(&self, username: &str, reason: &str) {
        self.publisher
            .publish(ParkingEvent::AuthFailed {
                username: Some(username.to_string()),
                reason: reason.to_string(),
            })
            .await;
    }

    fn open_session(
        &self,
        user_id: &str,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AccessError> {
        let (username, role) = {
            let state = self.state.read();
            let user = state
                .users
                .get(user_id)
                .ok_or_else(|| AccessError::UserNotFound(user_id.to_string()))?;
            (user.username.clone(), user.role)
        };

        let expires_at = now + self.config.session_lifetime();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.clone(),
            role,
            scope,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.issuer.issue(&claims)?;
        let digest = token_digest(&token);
        let session = Session {
            id: claims.jti,
            user_id: user_id.to_string(),
            username: username.clone(),
            role,
            scope,
            issued_at: now,
            expires_at,
            fingerprint: token_fingerprint(&digest),
        };

        let mut state = self.state.write();
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| AccessError::UserNotFound(user_id.to_string()))?;
        if !user.active {
            return Err(AccessError::AccountInactive(username));
        }
        user.last_login = Some(now);
        let profile = user.profile();
        state.lockout.reset(&username);
        state.sessions.insert(digest, session.clone());
        state.audit(
            SecurityEventKind::Login,
            Some(user_id),
            Some(&username),
            format!("scope={scope}"),
            now,
        );

        Ok(LoginOutcome {
            token,
            user: profile,
            session,
        })
    }

    fn judge(&self, token: &str, scope: Scope, now: DateTime<Utc>) -> Verdict {
        let Some(claims) = self.issuer.verify(token) else {
            return Verdict::Rejected("bad signature");
        };
        let digest = token_digest(token);
        let mut state = self.state.write();

        let Some(session) = state.sessions.get(&digest).cloned() else {
            return Verdict::Rejected("unknown token");
        };
        if session.user_id != claims.sub || session.scope != claims.scope {
            return Verdict::Rejected("claims mismatch");
        }
        if session.is_expired(now) {
            state.sessions.remove(&digest);
            state.audit(
                SecurityEventKind::SessionExpired,
                Some(&session.user_id),
                Some(&session.username),
                "expired on use",
                now,
            );
            return Verdict::Expired(session);
        }
        if session.scope != scope {
            return Verdict::Rejected("scope mismatch");
        }
        if !state.users.get(&session.user_id).is_some_and(|u| u.active) {
            state.sessions.remove(&digest);
            return Verdict::Rejected("inactive user");
        }
        Verdict::Valid(session)
    }
}

#[async_trait]
impl AccessControllerApi for AccessControllerService {
    async fn register_user(&self, new_user: NewUser) -> Result<UserProfile, AccessError> {
        let username = new_user.username.trim().to_string();
        if username.is_empty() || new_user.password.is_empty() {
            return Err(AccessError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }
        if self.state.read().usernames.contains_key(&username) {
            return Err(AccessError::UsernameTaken(username));
        }

        let password_hash = self.hash_password(&new_user.password).await?;
        let now = self.clock.now();
        let user = User {
            id: prefixed_id("USR"),
            username: username.clone(),
            password_hash,
            role: new_user.role,
            permissions: new_user.permissions,
            active: true,
            created_at: now,
            last_login: None,
        };

        let mut state = self.state.write();
        if state.usernames.contains_key(&username) {
            return Err(AccessError::UsernameTaken(username));
        }
        let profile = user.profile();
        state.usernames.insert(username.clone(), user.id.clone());
        state.users.insert(user.id.clone(), user);
        info!(user_id = %profile.id, username = %username, "[pk-03] User registered");
        Ok(profile)
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
        scope: Scope,
    ) -> Result<LoginOutcome, AccessError> {
        let now = self.clock.now();

        let lookup = {
            let mut state = self.state.write();
            match state.lockout.locked_for(username, now) {
                Some(retry_after_secs) => {
                    state.audit(
                        SecurityEventKind::FailedLogin,
                        None,
                        Some(username),
                        "account locked",
                        now,
                    );
                    Err(retry_after_secs)
                }
                None => Ok(state
                    .user_by_name(username)
                    .map(|u| (u.id.clone(), u.password_hash.clone(), u.active))),
            }
        };

        let candidate = match lookup {
            Ok(candidate) => candidate,
            Err(retry_after_secs) => {
                warn!(username, retry_after_secs, "[pk-03] Login rejected: account locked");
                self.auth_failed(username, "account_locked").await;
                return Err(AccessError::AccountLocked {
                    username: username.to_string(),
                    retry_after_secs,
                });
            }
        };

        let verified = match &candidate {
            Some((_, hash, _)) => self.verify_password(password, hash.clone()).await?,
            None => false,
        };

        let (user_id, active) = match candidate {
            Some((id, _, active)) if verified => (id, active),
            _ => {
                let failures = {
                    let mut state = self.state.write();
                    let failures = state.lockout.record_failure(username, now);
                    state.audit(
                        SecurityEventKind::FailedLogin,
                        None,
                        Some(username),
                        format!("invalid credentials (attempt {failures})"),
                        now,
                    );
                    failures
                };
                warn!(username, failures, "[pk-03] Login failed");
                self.auth_failed(username, "invalid_credentials").await;
                return Err(AccessError::InvalidCredentials);
            }
        };

        if !active {
            self.auth_failed(username, "account_inactive").await;
            return Err(AccessError::AccountInactive(username.to_string()));
        }

        let outcome = self.open_session(&user_id, scope, now)?;
        info!(
            user_id = %user_id,
            %scope,
            session = %outcome.session.fingerprint,
            "[pk-03] Login succeeded"
        );
        self.publisher
            .publish(ParkingEvent::AuthSuccess {
                user_id,
                username: username.to_string(),
                scope,
            })
            .await;
        Ok(outcome)
    }

    async fn logout(&self, token: &str) -> bool {
        let now = self.clock.now();
        let digest = token_digest(token);
        let mut state = self.state.write();
        match state.sessions.remove(&digest) {
            Some(session) => {
                state.audit(
                    SecurityEventKind::Logout,
                    Some(&session.user_id),
                    Some(&session.username),
                    format!("scope={}", session.scope),
                    now,
                );
                debug!(session = %session.fingerprint, "[pk-03] Logged out");
                true
            }
            None => false,
        }
    }

    async fn validate_session(&self, token: &str, scope: Scope) -> Option<Session> {
        let now = self.clock.now();
        match self.judge(token, scope, now) {
            Verdict::Valid(session) => Some(session),
            Verdict::Expired(session) => {
                debug!(session = %session.fingerprint, "[pk-03] Session expired");
                self.publisher
                    .publish(ParkingEvent::SessionExpired {
                        user_id: session.user_id,
                        scope: session.scope,
                    })
                    .await;
                None
            }
            Verdict::Rejected(reason) => {
                debug!(reason, %scope, "[pk-03] Session rejected");
                None
            }
        }
    }

    async fn check_permission(&self, user_id: &str, permission: &str) -> bool {
        let now = self.clock.now();
        let allowed = {
            let mut state = self.state.write();
            let allowed = state
                .users
                .get(user_id)
                .is_some_and(|u| u.active && u.has_permission(permission));
            if !allowed {
                state.audit(
                    SecurityEventKind::PermissionDenied,
                    Some(user_id),
                    None,
                    permission,
                    now,
                );
            }
            allowed
        };

        if !allowed {
            warn!(user_id, permission, "[pk-03] Permission denied");
            self.publisher
                .publish(ParkingEvent::PermissionDenied {
                    user_id: user_id.to_string(),
                    permission: permission.to_string(),
                })
                .await;
        }
        allowed
    }

    async fn deactivate_user(&self, user_id: &str) -> Result<usize, AccessError> {
        let now = self.clock.now();
        let revoked = {
            let mut state = self.state.write();
            let user = state
                .users
                .get_mut(user_id)
                .ok_or_else(|| AccessError::UserNotFound(user_id.to_string()))?;
            user.active = false;
            let username = user.username.clone();

            let before = state.sessions.len();
            state.sessions.retain(|_, session| session.user_id != user_id);
            let revoked = before - state.sessions.len();
            state.audit(
                SecurityEventKind::SystemAlert,
                Some(user_id),
                Some(&username),
                format!("deactivated, {revoked} sessions revoked"),
                now,
            );
            revoked
        };

        warn!(user_id, revoked, "[pk-03] User deactivated");
        self.publisher
            .publish(ParkingEvent::UserDeactivated {
                user_id: user_id.to_string(),
                sessions_revoked: revoked,
            })
            .await;
        Ok(revoked)
    }

    async fn sweep_expired_sessions(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<Session> = {
            let mut state = self.state.write();
            let digests: Vec<String> = state
                .sessions
                .iter()
                .filter(|(_, session)| session.is_expired(now))
                .map(|(digest, _)| digest.clone())
                .collect();
            let mut expired = Vec::with_capacity(digests.len());
            for digest in digests {
                if let Some(session) = state.sessions.remove(&digest) {
                    state.audit(
                        SecurityEventKind::SessionExpired,
                        Some(&session.user_id),
                        Some(&session.username),
                        "swept",
                        now,
                    );
                    expired.push(session);
                }
            }
            let forgotten = state.lockout.prune(now);
            if forgotten > 0 {
                debug!(forgotten, "[pk-03] Stale login failures dropped");
            }
            expired
        };

        let count = expired.len();
        for session in expired {
            self.publisher
                .publish(ParkingEvent::SessionExpired {
                    user_id: session.user_id,
                    scope: session.scope,
                })
                .await;
        }
        if count > 0 {
            info!(count, "[pk-03] Expired sessions swept");
        }
        count
    }

    fn security_events(&self, filter: &SecurityEventFilter) -> Vec<SecurityEvent> {
        self.state
            .read()
            .audit
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect()
    }

    fn user(&self, user_id: &str) -> Option<UserProfile> {
        self.state.read().users.get(user_id).map(User::profile)
    }

    fn active_sessions(&self) -> usize {
        self.state.read().sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
    use std::thread::{self, ThreadId};
    use shared_types::{MockTimeSource, Role};

    fn config() -> AccessConfig {
        AccessConfig {
            jwt_secret: "test-secret".into(),
            bcrypt_cost: 4,
            max_login_attempts: 3,
            lockout_window_secs: 900,
            session_ttl_secs: 3600,
            audit_log_capacity: 8,
            ..AccessConfig::default()
        }
    }

    async fn setup() -> (AccessControllerService, Arc<MockTimeSource>, Arc<InMemoryEventBus>) {
        let clock = Arc::new(MockTimeSource::new(
            Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap(),
        ));
        let bus = Arc::new(InMemoryEventBus::new());
        let service = AccessControllerService::new(config(), bus.clone(), clock.clone());
        service
            .register_user(NewUser::new("ops", "correct-horse", Role::Operator).with_permissions(["refund"]))
            .await
            .unwrap();
        (service, clock, bus)
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let (service, _clock, _bus) = setup().await;
        let err = service
            .register_user(NewUser::new("ops", "x", Role::Viewer))
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::UsernameTaken("ops".into()));
        assert!(matches!(
            service.register_user(NewUser::new(" ", "x", Role::Viewer)).await,
            Err(AccessError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_login_and_validate() {
        let (service, _clock, bus) = setup().await;
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Security]));

        let outcome = service
            .login("ops", "correct-horse", Scope::Payment)
            .await
            .unwrap();

        assert!(matches!(
            sub.try_recv(),
            Ok(Some(ParkingEvent::AuthSuccess { scope: Scope::Payment, .. }))
        ));
        let session = service
            .validate_session(&outcome.token, Scope::Payment)
            .await
            .unwrap();
        assert_eq!(session.user_id, outcome.user.id);
        assert!(outcome.user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_validate_fails_closed() {
        let (service, clock, bus) = setup().await;
        let outcome = service
            .login("ops", "correct-horse", Scope::Payment)
            .await
            .unwrap();

        assert!(service.validate_session("garbage", Scope::Payment).await.is_none());
        assert!(service
            .validate_session(&outcome.token, Scope::Reporting)
            .await
            .is_none());

        // signed with another secret
        let forged = TokenIssuer::new("other-secret")
            .issue(&Claims {
                sub: outcome.user.id.clone(),
                username: "ops".into(),
                role: Role::Admin,
                scope: Scope::Payment,
                iat: 0,
                exp: i64::MAX,
                jti: "forged".into(),
            })
            .unwrap();
        assert!(service.validate_session(&forged, Scope::Payment).await.is_none());

        let mut sub = bus.subscribe(EventFilter::all());
        clock.advance(Duration::seconds(3600));
        assert!(service
            .validate_session(&outcome.token, Scope::Payment)
            .await
            .is_none());
        assert!(matches!(
            sub.try_recv(),
            Ok(Some(ParkingEvent::SessionExpired { .. }))
        ));
        assert_eq!(service.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_lockout_and_reset() {
        let (service, clock, _bus) = setup().await;
        for _ in 0..3 {
            assert_eq!(
                service.login("ops", "wrong", Scope::Parking).await.unwrap_err(),
                AccessError::InvalidCredentials
            );
        }

        let err = service
            .login("ops", "correct-horse", Scope::Parking)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AccountLocked { .. }));

        clock.advance(Duration::seconds(900));
        assert!(service.login("ops", "correct-horse", Scope::Parking).await.is_ok());

        // counter was reset by the success
        service.login("ops", "wrong", Scope::Parking).await.unwrap_err();
        assert!(service.login("ops", "correct-horse", Scope::Parking).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_sessions_and_logout() {
        let (service, _clock, _bus) = setup().await;
        let a = service.login("ops", "correct-horse", Scope::Payment).await.unwrap();
        let b = service.login("ops", "correct-horse", Scope::Parking).await.unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(service.active_sessions(), 2);

        assert!(service.logout(&a.token).await);
        assert!(!service.logout(&a.token).await);
        assert!(service.validate_session(&a.token, Scope::Payment).await.is_none());
        assert!(service.validate_session(&b.token, Scope::Parking).await.is_some());
    }

    #[tokio::test]
    async fn test_deactivate_revokes_sessions() {
        let (service, _clock, _bus) = setup().await;
        let outcome = service.login("ops", "correct-horse", Scope::Payment).await.unwrap();
        service.login("ops", "correct-horse", Scope::Parking).await.unwrap();

        let revoked = service.deactivate_user(&outcome.user.id).await.unwrap();

        assert_eq!(revoked, 2);
        assert!(service
            .validate_session(&outcome.token, Scope::Payment)
            .await
            .is_none());
        assert_eq!(
            service.login("ops", "correct-horse", Scope::Payment).await.unwrap_err(),
            AccessError::AccountInactive("ops".into())
        );
        assert!(matches!(
            service.deactivate_user("USR_missing").await,
            Err(AccessError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_check_permission() {
        let (service, _clock, bus) = setup().await;
        let user_id = service.login("ops", "correct-horse", Scope::Payment).await.unwrap().user.id;
        let mut sub = bus.subscribe(EventFilter::all());

        assert!(service.check_permission(&user_id, "refund").await);
        assert!(!service.check_permission(&user_id, "delete_users").await);
        assert!(matches!(
            sub.try_recv(),
            Ok(Some(ParkingEvent::PermissionDenied { .. }))
        ));
    }

    #[tokio::test]
    async fn test_sweep() {
        let (service, clock, _bus) = setup().await;
        service.login("ops", "correct-horse", Scope::Payment).await.unwrap();
        clock.advance(Duration::minutes(30));
        service.login("ops", "correct-horse", Scope::Parking).await.unwrap();

        clock.advance(Duration::minutes(31));
        assert_eq!(service.sweep_expired_sessions().await, 1);
        assert_eq!(service.active_sessions(), 1);
        assert_eq!(service.sweep_expired_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_forgets_failures_past_the_window() {
        let (service, clock, _bus) = setup().await;
        for i in 0..50 {
            let _ = service.login(&format!("ghost-{i}"), "x", Scope::Payment).await;
        }
        assert_eq!(service.state.read().lockout.len(), 50);

        clock.advance(Duration::seconds(899));
        let _ = service.login("late", "x", Scope::Payment).await;
        service.sweep_expired_sessions().await;
        assert_eq!(service.state.read().lockout.len(), 51);

        clock.advance(Duration::seconds(1));
        service.sweep_expired_sessions().await;
        let state = service.state.read();
        assert_eq!(state.lockout.len(), 1);
        assert_eq!(state.lockout.failures("late"), 1);
    }

    struct ThreadRecordingHasher(Mutex<Vec<ThreadId>>);

    impl PasswordHasher for ThreadRecordingHasher {
        fn hash(&self, password: &str) -> Result<String, AccessError> {
            self.0.lock().push(thread::current().id());
            Ok(format!("plain:{password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, AccessError> {
            self.0.lock().push(thread::current().id());
            Ok(hash == format!("plain:{password}"))
        }
    }

    #[tokio::test]
    async fn test_password_work_leaves_the_runtime_thread() {
        let hasher = Arc::new(ThreadRecordingHasher(Mutex::new(Vec::new())));
        let service = AccessControllerService::with_hasher(
            config(),
            hasher.clone(),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(MockTimeSource::new(
                Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap(),
            )),
        );
        service
            .register_user(NewUser::new("ops", "pw", Role::Operator))
            .await
            .unwrap();
        service.login("ops", "pw", Scope::Parking).await.unwrap();

        let runtime_thread = thread::current().id();
        let seen = hasher.0.lock().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|id| *id != runtime_thread));
    }

    #[tokio::test]
    async fn test_audit_log_is_bounded() {
        let (service, _clock, _bus) = setup().await;
        for _ in 0..20 {
            let _ = service.login("nobody", "x", Scope::Payment).await;
        }
        let all = service.security_events(&SecurityEventFilter::default());
        assert_eq!(all.len(), 8);
        let failed = service.security_events(&SecurityEventFilter {
            kind: Some(SecurityEventKind::FailedLogin),
            ..Default::default()
        });
        assert_eq!(failed.len(), 8);
    }
}
