use std::io;
use std::path::Path;

use sha1::{Digest, Sha1};

/// Lowercase hex SHA-1 of `bytes`
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Hex digests compare case-insensitively
pub fn matches(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}

/// State of a file on disk relative to an expected digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    Missing,
    Verified,
    Mismatch { actual: String },
}

pub async fn check_file(path: &Path, expected: &str) -> io::Result<FileCheck> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let actual = sha1_hex(&bytes);
            if matches(expected, &actual) {
                Ok(FileCheck::Verified)
            } else {
                Ok(FileCheck::Mismatch { actual })
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileCheck::Missing),
        Err(e) => Err(e),
    }
}
