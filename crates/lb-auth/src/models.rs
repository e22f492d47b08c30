use serde::{Deserialize, Serialize};

use crate::session::GameProfile;

/// Microsoft OAuth token response
#[derive(Debug, Clone, Deserialize)]
pub struct MsTokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Xbox Live user.authenticate request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XblAuthRequest<'a> {
    pub properties: XblAuthProperties<'a>,
    pub relying_party: &'a str,
    pub token_type: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XblAuthProperties<'a> {
    pub auth_method: &'a str,
    pub site_name: &'a str,
    pub rps_ticket: &'a str,
}

/// XSTS authorize request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsAuthRequest<'a> {
    pub properties: XstsAuthProperties<'a>,
    pub relying_party: &'a str,
    pub token_type: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsAuthProperties<'a> {
    pub sandbox_id: &'a str,
    pub user_tokens: [&'a str; 1],
}

/// Response shape shared by user.authenticate and xsts/authorize
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XboxTokenResponse {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub display_claims: DisplayClaims,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayClaims {
    #[serde(default)]
    pub xui: Vec<UserClaim>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserClaim {
    #[serde(default)]
    pub uhs: String,
}

/// XSTS error response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsErrorResponse {
    #[serde(rename = "XErr")]
    pub xerr: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Minecraft login_with_xbox request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McLoginRequest {
    pub identity_token: String,
}

/// Minecraft login_with_xbox response
#[derive(Debug, Clone, Deserialize)]
pub struct McLoginResponse {
    #[serde(default)]
    pub access_token: String,
}

/// Minecraft profile response
#[derive(Debug, Clone, Deserialize)]
pub struct McProfileResponse {
    /// UUID without dashes, empty when the account owns no license
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Body shared by the Yggdrasil refresh and validate endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YggdrasilRequest<'a> {
    pub access_token: &'a str,
    pub client_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_profile: Option<GameProfile>,
}

/// Yggdrasil refresh response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YggdrasilRefreshResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub client_token: Option<String>,
    #[serde(default)]
    pub selected_profile: Option<GameProfile>,
}
