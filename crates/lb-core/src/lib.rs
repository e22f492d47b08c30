//! HTTP plumbing shared by the launcher bootstrap crates
//!
//! Every network call made by `lb-auth` and `lb-artifact` goes through the
//! [`Transport`] trait. [`HttpTransport`] is the production implementation: one
//! reqwest client built once with a fixed user agent, `Accept: */*` and a
//! 15 second timeout. Tests plug in their own implementation.
//!
//! No retry logic lives here.

pub mod config;
pub mod errors;
pub mod transport;

pub use config::TransportConfig;
pub use errors::TransportError;
pub use transport::{HttpResponse, HttpTransport, RequestBody, Transport};

pub use reqwest::StatusCode;
pub use url::Url;
