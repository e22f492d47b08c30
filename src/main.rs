use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use directories::ProjectDirs;
use lb_artifact::{ArtifactDescriptor, ArtifactFetcher, EnsureOutcome};
use lb_auth::{AuthConfig, FederationChain};
use lb_core::{HttpTransport, TransportConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Overrides the platform data directory as game directory
const GAME_DIR_ENV: &str = "LAUNCH_BOOTSTRAP_GAME_DIR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let game_dir = game_dir()?;
    let transport = Arc::new(
        HttpTransport::new(TransportConfig::default()).context("Failed to build HTTP transport")?,
    );

    let mut fetcher = ArtifactFetcher::new(transport.clone());
    let authlib = ArtifactDescriptor::authlib_injector(&game_dir);
    match fetcher
        .ensure(&authlib)
        .await
        .context("Failed to prepare authlib-injector")?
    {
        EnsureOutcome::AlreadyVerified => {
            info!("authlib-injector already present at {}", authlib.local_path.display());
        }
        EnsureOutcome::Downloaded { mirror, rounds } => {
            info!(%mirror, rounds, "Downloaded authlib-injector to {}", authlib.local_path.display());
        }
    }

    // Authorization code from the browser prompt, when a Microsoft login is wanted
    if let Some(code) = std::env::args().nth(1) {
        let chain = FederationChain::new(AuthConfig::official(), transport);
        let profile = chain
            .authenticate(&code)
            .await
            .context("Microsoft login failed")?;
        info!(id = %profile.id, "Logged in as {}", profile.name);
    }

    Ok(())
}

fn game_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os(GAME_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let proj_dirs = ProjectDirs::from("com", "rauncher", "launch-bootstrap")
        .context("Failed to get project directories")?;
    Ok(proj_dirs.data_dir().join("minecraft"))
}
