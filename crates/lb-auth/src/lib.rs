//! Session identity for the launcher
//!
//! Two independent ways of obtaining something the game accepts as a session:
//!
//! # Federation chain
//!
//! [`FederationChain::authenticate`] turns a one-time Microsoft authorization code
//! into a playable [`Profile`]:
//!
//! 1. Microsoft OAuth code exchange
//! 2. Xbox Live authentication
//! 3. XSTS authorization
//! 4. Minecraft Services login
//! 5. Profile retrieval
//!
//! The first failing stage ends the run. Errors carry the [`Step`] that failed, and
//! an account that authenticates but owns no license is reported as
//! [`AuthErrorKind::NoLicense`] rather than as a transport problem.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lb_auth::{AuthConfig, FederationChain};
//! use lb_core::{HttpTransport, TransportConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let transport = Arc::new(HttpTransport::new(TransportConfig::default())?);
//! let chain = FederationChain::new(AuthConfig::official(), transport);
//!
//! // The code comes from the browser/device-code prompt
//! let profile = chain.authenticate("M.R3_BAY.code").await?;
//! println!("Logged in as: {}", profile.name);
//! # Ok(())
//! # }
//! ```
//!
//! # Legacy sessions
//!
//! [`LegacyClient`] keeps a Yggdrasil-style direct-login session alive. `refresh`
//! returns a new [`LegacySession`] and leaves the old one alone; `validate`
//! succeeds only on `204 No Content`.
//!
//! # Important Notes
//!
//! - Tokens are never logged; spans skip them
//! - Persisting sessions is the caller's business

pub mod chain;
pub mod config;
pub mod errors;
pub mod legacy;
pub mod models;
pub mod session;

// Re-export main types
pub use chain::FederationChain;
pub use config::{AuthConfig, Endpoints};
pub use errors::{AuthError, AuthErrorKind, Result, Step, XstsError};
pub use legacy::LegacyClient;
pub use session::{
    FederationToken, GameAccessToken, GameProfile, LegacySession, Profile, SecurityToken,
    XboxLiveToken,
};
