use std::path::{Path, PathBuf};

use url::Url;

/// authlib-injector build required by third-party auth servers
pub mod authlib {
    pub const VERSION: &str = "1.1.27-5ef5f8e";
    pub const SHA1: &str = "EBE6CEFF486816E060356B9657A9263616AFB8C1";
    pub const MIRRORS: &[&str] = &[
        "https://authlib-injector.yushi.moe/artifact/27/authlib-injector-1.1.27-5ef5f8e.jar",
        "https://download.mcbbs.net/mirrors/authlib-injector/artifact/27/authlib-injector-1.1.27-5ef5f8e.jar",
    ];
}

/// A file that must exist locally with a known SHA-1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub local_path: PathBuf,
    /// Interchangeable download locations
    pub mirror_urls: Vec<Url>,
    /// Hex SHA-1, any case
    pub expected_checksum: String,
}

impl ArtifactDescriptor {
    pub fn new(
        local_path: impl Into<PathBuf>,
        mirror_urls: Vec<Url>,
        expected_checksum: impl Into<String>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            mirror_urls,
            expected_checksum: expected_checksum.into(),
        }
    }

    /// authlib-injector inside the game directory's `libraries` tree
    pub fn authlib_injector(game_dir: &Path) -> Self {
        let local_path = game_dir
            .join("libraries")
            .join("moe/yushi/authlibinjector/authlib-injector")
            .join(authlib::VERSION)
            .join(format!("authlib-injector-{}.jar", authlib::VERSION));

        let mirror_urls = authlib::MIRRORS
            .iter()
            .map(|url| Url::parse(url).expect("valid mirror URL"))
            .collect();

        Self::new(local_path, mirror_urls, authlib::SHA1)
    }
}
