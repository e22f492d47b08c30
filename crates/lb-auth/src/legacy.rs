use std::sync::Arc;

use lb_core::{RequestBody, StatusCode, Transport};
use tracing::{debug, instrument};
use url::Url;

use crate::chain::{decode, http_error};
use crate::errors::{AuthError, AuthErrorKind, Result, Step};
use crate::models::{YggdrasilRefreshResponse, YggdrasilRequest};
use crate::session::LegacySession;

/// Client for a Yggdrasil-style authentication server
///
/// `auth_server` is the `authserver` root, e.g.
/// `https://example.com/api/yggdrasil/authserver/`.
#[derive(Clone)]
pub struct LegacyClient {
    refresh_url: Url,
    validate_url: Url,
    transport: Arc<dyn Transport>,
}

impl LegacyClient {
    pub fn new(auth_server: Url, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut base = auth_server;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |endpoint: &str, step: Step| {
            base.join(endpoint)
                .map_err(|e| AuthError::new(step, AuthErrorKind::Url(e)))
        };

        Ok(Self {
            refresh_url: join("refresh", Step::SessionRefresh)?,
            validate_url: join("validate", Step::SessionValidate)?,
            transport,
        })
    }

    /// Exchange the session's access token for a fresh one
    ///
    /// Returns the refreshed session; `session` itself is never modified, so a
    /// failure leaves the caller with exactly what it had.
    #[instrument(skip(self, session))]
    pub async fn refresh(&self, session: &LegacySession) -> Result<LegacySession> {
        self.refresh_inner(session)
            .await
            .map_err(|kind| AuthError::new(Step::SessionRefresh, kind))
    }

    /// Check whether the access token is still accepted
    ///
    /// Only `204 No Content` counts as valid.
    #[instrument(skip(self, session))]
    pub async fn validate(&self, session: &LegacySession) -> Result<()> {
        self.validate_inner(session)
            .await
            .map_err(|kind| AuthError::new(Step::SessionValidate, kind))
    }

    async fn refresh_inner(&self, session: &LegacySession) -> std::result::Result<LegacySession, AuthErrorKind> {
        let request = YggdrasilRequest {
            access_token: &session.access_token,
            client_token: &session.client_token,
            selected_profile: session.requested_profile().cloned(),
        };
        let body = RequestBody::json(&request).map_err(AuthErrorKind::Encode)?;

        debug!("Refreshing legacy session");
        let response = self.transport.post(&self.refresh_url, body).await?;

        if response.status != StatusCode::OK {
            return Err(http_error(&response));
        }

        let refreshed: YggdrasilRefreshResponse = decode(&response)?;
        if refreshed.access_token.is_empty() {
            return Err(AuthErrorKind::InvalidResponse(
                "refresh response carried no access token".to_string(),
            ));
        }
        let profile = refreshed.selected_profile.ok_or_else(|| {
            AuthErrorKind::InvalidResponse("refresh response selected no profile".to_string())
        })?;

        Ok(LegacySession {
            access_token: refreshed.access_token,
            client_token: session.client_token.clone(),
            username: profile.name,
            id: profile.id,
            selected_profile: session.selected_profile.clone(),
        })
    }

    async fn validate_inner(&self, session: &LegacySession) -> std::result::Result<(), AuthErrorKind> {
        let request = YggdrasilRequest {
            access_token: &session.access_token,
            client_token: &session.client_token,
            selected_profile: None,
        };
        let body = RequestBody::json(&request).map_err(AuthErrorKind::Encode)?;

        debug!("Validating legacy session");
        let response = self.transport.post(&self.validate_url, body).await?;

        if response.status == StatusCode::NO_CONTENT {
            Ok(())
        } else {
            Err(AuthErrorKind::SessionUnusable {
                status: response.status,
            })
        }
    }
}

impl std::fmt::Debug for LegacyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyClient")
            .field("refresh_url", &self.refresh_url)
            .field("validate_url", &self.validate_url)
            .finish_non_exhaustive()
    }
}
