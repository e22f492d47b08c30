use url::Url;

/// Microsoft / Xbox / Minecraft service endpoints
pub mod endpoints {
    pub const MS_TOKEN: &str = "https://login.live.com/oauth20_token.srf";
    pub const XBL_AUTHENTICATE: &str = "https://user.auth.xboxlive.com/user/authenticate";
    pub const XSTS_AUTHORIZE: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
    pub const MC_LOGIN: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
    pub const MC_PROFILE: &str = "https://api.minecraftservices.com/minecraft/profile";
}

/// Official Minecraft launcher OAuth configuration
pub mod official {
    pub const CLIENT_ID: &str = "00000000402b5328";
    pub const REDIRECT_URI: &str = "https://login.live.com/oauth20_desktop.srf";
    pub const SCOPE: &str = "service::user.auth.xboxlive.com::MBI_SSL";
}

/// Relying parties
pub const RP_XBOXLIVE_AUTH: &str = "http://auth.xboxlive.com";
pub const RP_MINECRAFT: &str = "rp://api.minecraftservices.com/";

/// Scheme prefix of the composite identity token sent to Minecraft Services
pub const IDENTITY_SCHEME: &str = "XBL3.0";

/// Resolved URLs for the five chain stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub ms_token: Url,
    pub xbl_authenticate: Url,
    pub xsts_authorize: Url,
    pub mc_login: Url,
    pub mc_profile: Url,
}

impl Endpoints {
    /// Production endpoints
    pub fn official() -> Self {
        Self {
            ms_token: Url::parse(endpoints::MS_TOKEN).expect("valid token URL"),
            xbl_authenticate: Url::parse(endpoints::XBL_AUTHENTICATE).expect("valid XBL URL"),
            xsts_authorize: Url::parse(endpoints::XSTS_AUTHORIZE).expect("valid XSTS URL"),
            mc_login: Url::parse(endpoints::MC_LOGIN).expect("valid login URL"),
            mc_profile: Url::parse(endpoints::MC_PROFILE).expect("valid profile URL"),
        }
    }

    /// Same paths as production, served from a single base (stub servers, reverse proxies)
    pub fn rooted_at(base: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            ms_token: base.join("/oauth20_token.srf")?,
            xbl_authenticate: base.join("/user/authenticate")?,
            xsts_authorize: base.join("/xsts/authorize")?,
            mc_login: base.join("/authentication/login_with_xbox")?,
            mc_profile: base.join("/minecraft/profile")?,
        })
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::official()
    }
}

/// Configuration for [`FederationChain`](crate::FederationChain)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// Redirect URI the authorization code was issued for
    pub redirect_uri: String,

    /// OAuth scope
    pub scope: String,

    /// Stage endpoints
    pub endpoints: Endpoints,
}

impl AuthConfig {
    /// Official launcher client against the production services
    pub fn official() -> Self {
        Self {
            client_id: official::CLIENT_ID.to_string(),
            redirect_uri: official::REDIRECT_URI.to_string(),
            scope: official::SCOPE.to_string(),
            endpoints: Endpoints::official(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::official()
    }
}
