//! Verified, mirrored download of launcher support artifacts
//!
//! [`ArtifactFetcher::ensure`] guarantees that an [`ArtifactDescriptor`]'s file
//! exists and matches its SHA-1. An existing file that verifies costs no network
//! call; otherwise the fetcher downloads from the descriptor's mirrors, rotating
//! to a different mirror each round, until a download verifies or the
//! [`FetchPolicy`] round budget runs out.
//!
//! Bytes are checked before they reach the target path and are moved into place
//! with an atomic rename, so a failed `ensure` never leaves a corrupt file behind.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use lb_artifact::{ArtifactDescriptor, ArtifactFetcher};
//! use lb_core::{HttpTransport, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new(TransportConfig::default())?);
//! let mut fetcher = ArtifactFetcher::new(transport);
//!
//! let authlib = ArtifactDescriptor::authlib_injector(Path::new(".minecraft"));
//! fetcher.ensure(&authlib).await?;
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod descriptor;
pub mod errors;
pub mod fetcher;

pub use descriptor::ArtifactDescriptor;
pub use errors::{ArtifactError, FailedRound, Result, RoundFailure};
pub use fetcher::{ArtifactFetcher, EnsureOutcome, FetchPolicy, FetchState};
