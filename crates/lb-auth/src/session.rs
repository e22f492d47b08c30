use serde::{Deserialize, Serialize};

/// Stage 1 output: Microsoft OAuth access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationToken {
    pub access_token: String,
}

/// Stage 2 output: Xbox Live user token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XboxLiveToken {
    pub token: String,
    /// `uhs` of the first identity claim
    pub user_hash: String,
}

/// Stage 3 output: XSTS token for Minecraft Services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityToken {
    pub token: String,
}

/// Stage 4 output: Minecraft Services access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameAccessToken {
    pub access_token: String,
}

/// Playable identity produced by a successful chain run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// UUID without dashes
    pub id: String,
    /// Player name
    pub name: String,
    /// Minecraft Services access token (stage 4 output)
    pub access_token: String,
}

/// A profile as named by a Yggdrasil server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
}

/// Direct-login session kept alive through refresh/validate
///
/// `client_token` identifies the installation and never changes across refreshes.
/// Callers must not refresh the same session concurrently: a refresh invalidates
/// the previous access token server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegacySession {
    pub access_token: String,
    pub client_token: String,
    pub username: String,
    pub id: String,
    /// Profile to request on refresh, for accounts owning several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_profile: Option<GameProfile>,
}

impl LegacySession {
    pub fn new(access_token: impl Into<String>, client_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            client_token: client_token.into(),
            username: String::new(),
            id: String::new(),
            selected_profile: None,
        }
    }

    pub fn with_selected_profile(mut self, profile: GameProfile) -> Self {
        self.selected_profile = Some(profile);
        self
    }

    /// Selected profile worth sending to the server
    pub(crate) fn requested_profile(&self) -> Option<&GameProfile> {
        self.selected_profile
            .as_ref()
            .filter(|profile| !profile.name.is_empty())
    }
}
