use std::sync::Arc;

use lb_core::{HttpResponse, RequestBody, StatusCode, Transport};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::{AuthConfig, IDENTITY_SCHEME, RP_MINECRAFT, RP_XBOXLIVE_AUTH};
use crate::errors::{AuthError, AuthErrorKind, Result, Step, XstsError};
use crate::models::*;
use crate::session::{FederationToken, GameAccessToken, Profile, SecurityToken, XboxLiveToken};

type StageResult<T> = std::result::Result<T, AuthErrorKind>;

/// Runs the Microsoft → Xbox Live → XSTS → Minecraft token exchange
///
/// Each stage is also exposed on its own. Nothing is retried here: a failed
/// stage ends the run and the caller starts over with a fresh authorization code.
#[derive(Clone)]
pub struct FederationChain {
    config: AuthConfig,
    transport: Arc<dyn Transport>,
}

impl FederationChain {
    pub fn new(config: AuthConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Complete login flow from authorization code to game profile
    #[instrument(skip(self, code))]
    pub async fn authenticate(&self, code: &str) -> Result<Profile> {
        debug!("Starting federation chain");

        // Step 1: Exchange code for MS token
        let ms = self.exchange_code(code).await?;

        // Step 2: Authenticate with Xbox Live
        let xbl = self.xbl_authenticate(&ms).await?;

        // Step 3: Authorize with XSTS
        let xsts = self.xsts_authorize(&xbl).await?;

        // Step 4: Login to Minecraft
        let mc = self.mc_login(&xbl.user_hash, &xsts).await?;

        // Step 5: Fetch profile
        let profile = self.fetch_profile(&mc).await?;

        debug!(profile_id = %profile.id, "Federation chain completed");
        Ok(profile)
    }

    /// Exchange authorization code for a Microsoft access token
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<FederationToken> {
        self.exchange_code_stage(code)
            .await
            .map_err(|kind| AuthError::new(Step::CodeExchange, kind))
    }

    /// Authenticate with Xbox Live
    #[instrument(skip(self, token))]
    pub async fn xbl_authenticate(&self, token: &FederationToken) -> Result<XboxLiveToken> {
        self.xbl_stage(token)
            .await
            .map_err(|kind| AuthError::new(Step::XboxLiveAuth, kind))
    }

    /// Authorize with XSTS for Minecraft Services
    #[instrument(skip(self, token))]
    pub async fn xsts_authorize(&self, token: &XboxLiveToken) -> Result<SecurityToken> {
        self.xsts_stage(&token.token)
            .await
            .map_err(|kind| AuthError::new(Step::XstsAuth, kind))
    }

    /// Login to Minecraft with the user hash and XSTS token
    #[instrument(skip(self, user_hash, token))]
    pub async fn mc_login(&self, user_hash: &str, token: &SecurityToken) -> Result<GameAccessToken> {
        self.mc_login_stage(user_hash, &token.token)
            .await
            .map_err(|kind| AuthError::new(Step::GameLogin, kind))
    }

    /// Fetch the Minecraft profile owned by the token
    #[instrument(skip(self, token))]
    pub async fn fetch_profile(&self, token: &GameAccessToken) -> Result<Profile> {
        self.profile_stage(&token.access_token)
            .await
            .map_err(|kind| AuthError::new(Step::ProfileFetch, kind))
    }

    async fn exchange_code_stage(&self, code: &str) -> StageResult<FederationToken> {
        let body = RequestBody::form([
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", self.config.scope.as_str()),
        ]);

        debug!("Exchanging authorization code for tokens");
        let response = self
            .transport
            .post(&self.config.endpoints.ms_token, body)
            .await?;

        // OAuth rejections (invalid_grant, invalid_request, ...) carry an `error` code
        if let Ok(MsTokenResponse { error: Some(error), .. }) = response.json::<MsTokenResponse>() {
            debug!(%error, status = %response.status, "Authorization code rejected");
            return Err(AuthErrorKind::InvalidCode);
        }

        if !response.is_success() {
            return Err(http_error(&response));
        }

        let token: MsTokenResponse = decode(&response)?;
        if token.access_token.is_empty() {
            return Err(AuthErrorKind::InvalidCode);
        }

        Ok(FederationToken {
            access_token: token.access_token,
        })
    }

    async fn xbl_stage(&self, token: &FederationToken) -> StageResult<XboxLiveToken> {
        let request = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS",
                site_name: "user.auth.xboxlive.com",
                rps_ticket: &token.access_token,
            },
            relying_party: RP_XBOXLIVE_AUTH,
            token_type: "JWT",
        };
        let body = RequestBody::json(&request).map_err(AuthErrorKind::Encode)?;

        debug!("Authenticating with Xbox Live");
        let response = self
            .transport
            .post(&self.config.endpoints.xbl_authenticate, body)
            .await?;

        if response.status == StatusCode::BAD_REQUEST || response.status == StatusCode::UNAUTHORIZED {
            return Err(AuthErrorKind::InvalidToken);
        }

        if !response.is_success() {
            return Err(http_error(&response));
        }

        let xbl: XboxTokenResponse = decode(&response)?;
        let user_hash = xbl
            .display_claims
            .xui
            .first()
            .map(|claim| claim.uhs.clone())
            .ok_or(AuthErrorKind::InvalidToken)?;

        if xbl.token.is_empty() || user_hash.is_empty() {
            return Err(AuthErrorKind::InvalidToken);
        }

        Ok(XboxLiveToken {
            token: xbl.token,
            user_hash,
        })
    }

    async fn xsts_stage(&self, xbl_token: &str) -> StageResult<SecurityToken> {
        let request = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: "RETAIL",
                user_tokens: [xbl_token],
            },
            relying_party: RP_MINECRAFT,
            token_type: "JWT",
        };
        let body = RequestBody::json(&request).map_err(AuthErrorKind::Encode)?;

        debug!("Authorizing with XSTS");
        let response = self
            .transport
            .post(&self.config.endpoints.xsts_authorize, body)
            .await?;

        if response.status == StatusCode::UNAUTHORIZED {
            return match response.json::<XstsErrorResponse>() {
                Ok(denied) => Err(XstsError::from_xerr(denied.xerr).into()),
                Err(_) => Err(http_error(&response)),
            };
        }

        if !response.is_success() {
            return Err(http_error(&response));
        }

        let xsts: XboxTokenResponse = decode(&response)?;
        if xsts.token.is_empty() {
            return Err(AuthErrorKind::InvalidResponse(
                "XSTS response carried no token".to_string(),
            ));
        }

        Ok(SecurityToken {
            token: xsts.token,
        })
    }

    async fn mc_login_stage(&self, user_hash: &str, xsts_token: &str) -> StageResult<GameAccessToken> {
        let request = McLoginRequest {
            identity_token: format!("{} x={};{}", IDENTITY_SCHEME, user_hash, xsts_token),
        };
        let body = RequestBody::json(&request).map_err(AuthErrorKind::Encode)?;

        debug!("Logging in to Minecraft Services");
        let response = self
            .transport
            .post(&self.config.endpoints.mc_login, body)
            .await?;

        if !response.is_success() {
            return Err(http_error(&response));
        }

        let mc: McLoginResponse = decode(&response)?;
        if mc.access_token.is_empty() {
            return Err(AuthErrorKind::InvalidResponse(
                "Minecraft login response carried no access token".to_string(),
            ));
        }

        Ok(GameAccessToken {
            access_token: mc.access_token,
        })
    }

    async fn profile_stage(&self, access_token: &str) -> StageResult<Profile> {
        debug!("Fetching Minecraft profile");
        let response = self
            .transport
            .get(&self.config.endpoints.mc_profile, Some(access_token))
            .await?;

        // Accounts without a license get NOT_FOUND rather than an empty profile
        if response.status == StatusCode::NOT_FOUND {
            return Err(AuthErrorKind::NoLicense);
        }

        if !response.is_success() {
            return Err(http_error(&response));
        }

        let profile: McProfileResponse = decode(&response)?;
        if profile.id.is_empty() {
            return Err(AuthErrorKind::NoLicense);
        }

        Ok(Profile {
            id: profile.id,
            name: profile.name,
            access_token: access_token.to_string(),
        })
    }
}

impl std::fmt::Debug for FederationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationChain")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

pub(crate) fn decode<T: DeserializeOwned>(response: &HttpResponse) -> StageResult<T> {
    response.json().map_err(AuthErrorKind::Decode)
}

pub(crate) fn http_error(response: &HttpResponse) -> AuthErrorKind {
    AuthErrorKind::Http {
        status: response.status,
        body_snippet: response.snippet(),
    }
}
