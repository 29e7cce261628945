//! # Security Gate
//!
//! Every call routed across subsystems passes through here first. The gate
//! fails closed: a missing, expired or wrong-scope session stops the call
//! before the target subsystem is touched.

use std::sync::Arc;

use pk_03_access_controller::{AccessControllerApi, Session};
use pk_telemetry::ACCESS_DENIED;
use shared_types::Scope;
use tracing::{debug, warn};

use crate::errors::CoordinationError;

pub struct SecurityGate {
    access: Arc<dyn AccessControllerApi>,
}

impl SecurityGate {
    pub fn new(access: Arc<dyn AccessControllerApi>) -> Self {
        Self { access }
    }

    /// Session for `token` if it is valid for `scope`.
    pub async fn authorize(&self, token: &str, scope: Scope) -> Result<Session, CoordinationError> {
        match self.access.validate_session(token, scope).await {
            Some(session) => {
                debug!(user_id = %session.user_id, %scope, "[gate] Session accepted");
                Ok(session)
            }
            None => {
                ACCESS_DENIED.with_label_values(&[scope.as_str()]).inc();
                warn!(%scope, "[gate] Call rejected: no valid session");
                Err(CoordinationError::Unauthorized { scope })
            }
        }
    }

    /// [`authorize`](Self::authorize) plus a permission check.
    pub async fn authorize_for(
        &self,
        token: &str,
        scope: Scope,
        permission: &str,
    ) -> Result<Session, CoordinationError> {
        let session = self.authorize(token, scope).await?;
        if !self.access.check_permission(&session.user_id, permission).await {
            ACCESS_DENIED.with_label_values(&[scope.as_str()]).inc();
            return Err(CoordinationError::PermissionDenied {
                permission: permission.to_string(),
            });
        }
        Ok(session)
    }
}
