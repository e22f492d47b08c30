use std::fmt;

use lb_core::{StatusCode, TransportError};
use thiserror::Error;

/// Operation that produced an [`AuthError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Chain stage 1: authorization code to Microsoft token
    CodeExchange,
    /// Chain stage 2: Xbox Live user authentication
    XboxLiveAuth,
    /// Chain stage 3: XSTS authorization
    XstsAuth,
    /// Chain stage 4: Minecraft Services login
    GameLogin,
    /// Chain stage 5: profile lookup
    ProfileFetch,
    SessionRefresh,
    SessionValidate,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeExchange => "code exchange",
            Self::XboxLiveAuth => "Xbox Live authentication",
            Self::XstsAuth => "XSTS authorization",
            Self::GameLogin => "Minecraft login",
            Self::ProfileFetch => "profile fetch",
            Self::SessionRefresh => "session refresh",
            Self::SessionValidate => "session validation",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authentication failure tagged with the step that produced it
#[derive(Error, Debug)]
#[error("{step} failed: {kind}")]
pub struct AuthError {
    pub step: Step,
    #[source]
    pub kind: AuthErrorKind,
}

impl AuthError {
    pub fn new(step: Step, kind: impl Into<AuthErrorKind>) -> Self {
        Self {
            step,
            kind: kind.into(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn kind(&self) -> &AuthErrorKind {
        &self.kind
    }

    /// Network failures, timeouts and undecodable bodies; protocol rejections are never worth retrying as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, AuthErrorKind::Transport(_) | AuthErrorKind::Decode(_))
    }
}

/// What went wrong, independent of where
#[derive(Error, Debug)]
pub enum AuthErrorKind {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: StatusCode,
        body_snippet: String,
    },

    #[error("Malformed response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Authorization code is invalid or already used")]
    InvalidCode,

    #[error("Xbox Live rejected the Microsoft token")]
    InvalidToken,

    #[error("XSTS authorization denied: {0}")]
    XstsDenied(#[from] XstsError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Account does not own the game")]
    NoLicense,

    #[error("Access token can no longer be used (status {status})")]
    SessionUnusable { status: StatusCode },
}

/// XSTS-specific error codes from XErr field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XstsError {
    #[error("Account doesn't have an Xbox account (XErr: 2148916233)")]
    NoXboxAccount,

    #[error("Xbox Live not available in this country (XErr: 2148916235)")]
    RegionNotSupported,

    #[error("Adult verification required on Xbox page (XErr: 2148916236/2148916237)")]
    AdultVerificationRequired,

    #[error("Child account requires Family (XErr: 2148916238)")]
    ChildAccountRequiresFamily,

    #[error("Unknown XSTS error code: {0}")]
    Unknown(u64),
}

impl XstsError {
    /// Parse XErr code from XSTS response
    pub fn from_xerr(code: u64) -> Self {
        match code {
            2148916233 => Self::NoXboxAccount,
            2148916235 => Self::RegionNotSupported,
            2148916236 | 2148916237 => Self::AdultVerificationRequired,
            2148916238 => Self::ChildAccountRequiresFamily,
            code => Self::Unknown(code),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
