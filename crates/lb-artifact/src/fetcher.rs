use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use lb_core::{HttpResponse, Transport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::checksum::{self, FileCheck};
use crate::descriptor::ArtifactDescriptor;
use crate::errors::{ArtifactError, FailedRound, Result, RoundFailure};

/// Round budget for [`ArtifactFetcher::ensure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Total download attempts across all mirrors
    pub max_rounds: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self { max_rounds: 3 }
    }
}

/// Progress of the most recent `ensure` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Pending,
    Downloading { round: u32 },
    Verifying { round: u32 },
    Verified,
    Failed,
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }
}

/// How `ensure` reached a verified file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The file was already in place; nothing was downloaded
    AlreadyVerified,
    /// Downloaded from `mirror` in round `rounds`
    Downloaded { mirror: Url, rounds: u32 },
}

/// Downloads artifacts from rotating mirrors and only ever places verified bytes
///
/// Consecutive rounds never hit the same mirror. The random source is injectable
/// so tests can pin the mirror sequence.
pub struct ArtifactFetcher<R = StdRng> {
    transport: Arc<dyn Transport>,
    policy: FetchPolicy,
    rng: R,
    state: FetchState,
}

impl ArtifactFetcher<StdRng> {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_rng(transport, StdRng::from_entropy())
    }
}

impl<R: Rng> ArtifactFetcher<R> {
    pub fn with_rng(transport: Arc<dyn Transport>, rng: R) -> Self {
        Self {
            transport,
            policy: FetchPolicy::default(),
            rng,
            state: FetchState::Pending,
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Make sure `descriptor.local_path` exists and matches its checksum
    ///
    /// Returns without touching the network when the file already verifies. On
    /// failure nothing unverified is left at `local_path`.
    #[instrument(skip(self, descriptor), fields(path = %descriptor.local_path.display()))]
    pub async fn ensure(&mut self, descriptor: &ArtifactDescriptor) -> Result<EnsureOutcome> {
        self.enter(FetchState::Pending);

        let path = &descriptor.local_path;
        let mirrors = distinct_mirrors(&descriptor.mirror_urls);
        if mirrors.len() < 2 {
            self.enter(FetchState::Failed);
            return Err(ArtifactError::InsufficientMirrors {
                path: path.clone(),
                count: mirrors.len(),
            });
        }
        if self.policy.max_rounds == 0 {
            self.enter(FetchState::Failed);
            return Err(ArtifactError::NoRounds);
        }

        let existing = checksum::check_file(path, &descriptor.expected_checksum)
            .await
            .map_err(|source| io_error(path, source))?;

        match existing {
            FileCheck::Verified => {
                debug!("Artifact already present and verified");
                self.enter(FetchState::Verified);
                return Ok(EnsureOutcome::AlreadyVerified);
            }
            FileCheck::Mismatch { actual } => {
                warn!(%actual, "Discarding artifact with wrong checksum");
                tokio::fs::remove_file(path)
                    .await
                    .map_err(|source| io_error(path, source))?;
            }
            FileCheck::Missing => {}
        }

        let mut attempts = Vec::new();
        let mut previous = None;

        for round in 1..=self.policy.max_rounds {
            let index = pick_mirror(mirrors.len(), previous, &mut self.rng);
            previous = Some(index);
            let mirror = mirrors[index];

            match self.download_round(round, mirror, &descriptor.expected_checksum).await {
                Ok(response) => {
                    if let Err(source) = place(path, &response.body) {
                        self.enter(FetchState::Failed);
                        return Err(io_error(path, source));
                    }
                    debug!(%mirror, round, "Artifact verified and placed");
                    self.enter(FetchState::Verified);
                    return Ok(EnsureOutcome::Downloaded {
                        mirror: mirror.clone(),
                        rounds: round,
                    });
                }
                Err(failure) => {
                    warn!(%mirror, round, "Download round failed: {}", failure);
                    attempts.push(FailedRound {
                        mirror: mirror.clone(),
                        failure,
                    });
                }
            }
        }

        self.enter(FetchState::Failed);
        Err(ArtifactError::DownloadFailed {
            path: path.clone(),
            attempts,
        })
    }

    /// One GET plus verification; the body is returned only if it matches
    async fn download_round(
        &mut self,
        round: u32,
        mirror: &Url,
        expected: &str,
    ) -> std::result::Result<HttpResponse, RoundFailure> {
        self.enter(FetchState::Downloading { round });
        let response = self.transport.get(mirror, None).await?;
        if !response.is_success() {
            return Err(RoundFailure::Status(response.status));
        }

        self.enter(FetchState::Verifying { round });
        let actual = checksum::sha1_hex(&response.body);
        if !checksum::matches(expected, &actual) {
            return Err(RoundFailure::ChecksumMismatch {
                expected: expected.to_string(),
                actual,
            });
        }

        Ok(response)
    }

    fn enter(&mut self, state: FetchState) {
        debug!(from = ?self.state, to = ?state, "Fetch state transition");
        self.state = state;
    }
}

impl<R> std::fmt::Debug for ArtifactFetcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactFetcher")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Mirror URLs with repeats removed, first occurrence kept
fn distinct_mirrors(urls: &[Url]) -> Vec<&Url> {
    let mut distinct: Vec<&Url> = Vec::with_capacity(urls.len());
    for url in urls {
        if !distinct.contains(&url) {
            distinct.push(url);
        }
    }
    distinct
}

/// Uniform choice among `count` mirrors, excluding `previous`. Requires `count >= 2`.
pub(crate) fn pick_mirror<R: Rng + ?Sized>(count: usize, previous: Option<usize>, rng: &mut R) -> usize {
    match previous {
        None => rng.gen_range(0..count),
        Some(previous) => {
            let index = rng.gen_range(0..count - 1);
            if index >= previous { index + 1 } else { index }
        }
    }
}

/// Write beside the target, sync, then rename into place
fn place(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;

    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use lb_core::{RequestBody, StatusCode, TransportError};
    use tempfile::TempDir;

    const GOOD: &[u8] = b"authlib-injector bytes";

    enum Reply {
        Body(u16, &'static [u8]),
        Timeout,
    }

    /// Serves scripted replies in order and records every requested URL
    struct ScriptedMirrors {
        replies: Mutex<VecDeque<Reply>>,
        requested: Mutex<Vec<Url>>,
    }

    impl ScriptedMirrors {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<Url> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedMirrors {
        async fn post(&self, url: &Url, _body: RequestBody) -> lb_core::errors::Result<HttpResponse> {
            panic!("unexpected POST to {}", url);
        }

        async fn get(&self, url: &Url, _bearer: Option<&str>) -> lb_core::errors::Result<HttpResponse> {
            self.requested.lock().unwrap().push(url.clone());
            match self.replies.lock().unwrap().pop_front() {
                Some(Reply::Body(status, body)) => Ok(HttpResponse::new(
                    StatusCode::from_u16(status).unwrap(),
                    bytes::Bytes::from_static(body),
                )),
                Some(Reply::Timeout) | None => Err(TransportError::Timeout {
                    url: url.to_string(),
                }),
            }
        }
    }

    fn mirrors(count: usize) -> Vec<Url> {
        (0..count)
            .map(|i| Url::parse(&format!("https://mirror{}.example.com/lib.jar", i)).unwrap())
            .collect()
    }

    fn descriptor(dir: &TempDir, mirror_count: usize) -> ArtifactDescriptor {
        ArtifactDescriptor::new(
            dir.path().join("libraries/lib.jar"),
            mirrors(mirror_count),
            checksum::sha1_hex(GOOD).to_uppercase(),
        )
    }

    fn fetcher(transport: Arc<ScriptedMirrors>, seed: u64) -> ArtifactFetcher<StdRng> {
        ArtifactFetcher::with_rng(transport, StdRng::seed_from_u64(seed))
    }

    fn assert_no_repeats(urls: &[Url]) {
        for pair in urls.windows(2) {
            assert_ne!(pair[0], pair[1], "same mirror used in consecutive rounds");
        }
    }

    #[tokio::test]
    async fn test_existing_verified_file_skips_network() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor(&dir, 2);
        std::fs::create_dir_all(descriptor.local_path.parent().unwrap()).unwrap();
        std::fs::write(&descriptor.local_path, GOOD).unwrap();

        let transport = ScriptedMirrors::new([]);
        let mut fetcher = fetcher(transport.clone(), 1);

        let outcome = fetcher.ensure(&descriptor).await.unwrap();

        assert_eq!(outcome, EnsureOutcome::AlreadyVerified);
        assert!(transport.requested().is_empty());
        assert_eq!(fetcher.state(), FetchState::Verified);
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor(&dir, 2);
        let transport = ScriptedMirrors::new([Reply::Body(200, GOOD)]);
        let mut fetcher = fetcher(transport.clone(), 7);

        let first = fetcher.ensure(&descriptor).await.unwrap();
        assert!(matches!(first, EnsureOutcome::Downloaded { rounds: 1, .. }));
        assert_eq!(transport.requested().len(), 1);

        let second = fetcher.ensure(&descriptor).await.unwrap();
        assert_eq!(second, EnsureOutcome::AlreadyVerified);
        assert_eq!(transport.requested().len(), 1);
        assert_eq!(std::fs::read(&descriptor.local_path).unwrap(), GOOD);
    }

    #[tokio::test]
    async fn test_corrupt_download_is_retried_on_other_mirror() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor(&dir, 2);
        let transport = ScriptedMirrors::new([Reply::Body(200, b"truncated"), Reply::Body(200, GOOD)]);
        let mut fetcher = fetcher(transport.clone(), 3);

        let outcome = fetcher.ensure(&descriptor).await.unwrap();

        let requested = transport.requested();
        assert_eq!(requested.len(), 2);
        assert_no_repeats(&requested);
        assert_eq!(
            outcome,
            EnsureOutcome::Downloaded {
                mirror: requested[1].clone(),
                rounds: 2,
            }
        );
        assert_eq!(std::fs::read(&descriptor.local_path).unwrap(), GOOD);
    }

    #[tokio::test]
    async fn test_exhausted_rounds_leave_no_file() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor(&dir, 2);
        let transport = ScriptedMirrors::new([
            Reply::Timeout,
            Reply::Body(500, b"oops"),
            Reply::Body(200, b"wrong bytes"),
            Reply::Body(200, GOOD),
        ]);
        let mut fetcher = fetcher(transport.clone(), 11);

        let err = fetcher.ensure(&descriptor).await.unwrap_err();

        match err {
            ArtifactError::DownloadFailed { path, attempts } => {
                assert_eq!(path, descriptor.local_path);
                assert_eq!(attempts.len(), 3);
                assert!(matches!(attempts[0].failure, RoundFailure::Transport(_)));
                assert!(matches!(
                    attempts[1].failure,
                    RoundFailure::Status(status) if status == StatusCode::INTERNAL_SERVER_ERROR
                ));
                assert!(matches!(attempts[2].failure, RoundFailure::ChecksumMismatch { .. }));
            }
            other => panic!("Expected DownloadFailed, got {:?}", other),
        }

        // the fourth, good reply is never requested
        assert_eq!(transport.requested().len(), 3);
        assert!(!descriptor.local_path.exists());
        assert_eq!(fetcher.state(), FetchState::Failed);
        assert!(fetcher.state().is_terminal());
    }

    #[tokio::test]
    async fn test_stale_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor(&dir, 2);
        std::fs::create_dir_all(descriptor.local_path.parent().unwrap()).unwrap();
        std::fs::write(&descriptor.local_path, b"old version").unwrap();

        let transport = ScriptedMirrors::new([Reply::Body(200, GOOD)]);
        let mut fetcher = fetcher(transport, 5);

        fetcher.ensure(&descriptor).await.unwrap();
        assert_eq!(std::fs::read(&descriptor.local_path).unwrap(), GOOD);
    }

    #[tokio::test]
    async fn test_stale_file_removed_even_when_download_fails() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor(&dir, 2);
        std::fs::create_dir_all(descriptor.local_path.parent().unwrap()).unwrap();
        std::fs::write(&descriptor.local_path, b"old version").unwrap();

        let transport = ScriptedMirrors::new([]);
        let mut fetcher = fetcher(transport, 5);

        assert!(fetcher.ensure(&descriptor).await.is_err());
        assert!(!descriptor.local_path.exists());

        // no staging files left behind either
        let leftovers = std::fs::read_dir(descriptor.local_path.parent().unwrap())
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    /// Serves good bytes, but turns the target's parent directory into a file first
    struct BlockingParent {
        parent: std::path::PathBuf,
        requests: Mutex<u32>,
    }

    #[async_trait::async_trait]
    impl Transport for BlockingParent {
        async fn post(&self, url: &Url, _body: RequestBody) -> lb_core::errors::Result<HttpResponse> {
            panic!("unexpected POST to {}", url);
        }

        async fn get(&self, _url: &Url, _bearer: Option<&str>) -> lb_core::errors::Result<HttpResponse> {
            *self.requests.lock().unwrap() += 1;
            std::fs::write(&self.parent, b"not a directory").unwrap();
            Ok(HttpResponse::new(StatusCode::OK, bytes::Bytes::from_static(GOOD)))
        }
    }

    #[tokio::test]
    async fn test_placement_failure_ends_ensure() {
        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("libraries");
        let descriptor = ArtifactDescriptor::new(parent.join("lib.jar"), mirrors(2), checksum::sha1_hex(GOOD));
        let transport = Arc::new(BlockingParent {
            parent: parent.clone(),
            requests: Mutex::new(0),
        });
        let mut fetcher = ArtifactFetcher::with_rng(transport.clone(), StdRng::seed_from_u64(2));

        let err = fetcher.ensure(&descriptor).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Io { ref path, .. } if *path == descriptor.local_path));
        // not retried on the other mirror
        assert_eq!(*transport.requests.lock().unwrap(), 1);
        assert_eq!(fetcher.state(), FetchState::Failed);
    }

    #[tokio::test]
    async fn test_single_mirror_is_rejected() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor(&dir, 1);
        let transport = ScriptedMirrors::new([Reply::Body(200, GOOD)]);
        let mut fetcher = fetcher(transport.clone(), 0);

        let err = fetcher.ensure(&descriptor).await.unwrap_err();

        assert!(matches!(err, ArtifactError::InsufficientMirrors { count: 1, .. }));
        assert!(transport.requested().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_mirror_url_counts_once() {
        let dir = TempDir::new().unwrap();
        let url = Url::parse("https://m.example.com/lib.jar").unwrap();
        let descriptor = ArtifactDescriptor::new(
            dir.path().join("lib.jar"),
            vec![url.clone(), url],
            checksum::sha1_hex(GOOD),
        );
        let transport = ScriptedMirrors::new([]);
        let mut fetcher = fetcher(transport.clone(), 4);

        let err = fetcher.ensure(&descriptor).await.unwrap_err();

        assert!(matches!(err, ArtifactError::InsufficientMirrors { count: 1, .. }));
        assert!(transport.requested().is_empty());
        assert_eq!(fetcher.state(), FetchState::Failed);
    }

    #[tokio::test]
    async fn test_duplicates_never_repeat_in_consecutive_rounds() {
        let mut urls = mirrors(2);
        urls.push(urls[0].clone());
        urls.push(urls[0].clone());

        for seed in 0..25 {
            let dir = TempDir::new().unwrap();
            let descriptor = ArtifactDescriptor::new(
                dir.path().join("lib.jar"),
                urls.clone(),
                checksum::sha1_hex(GOOD),
            );
            let transport = ScriptedMirrors::new([]);
            let mut fetcher = fetcher(transport.clone(), seed).with_policy(FetchPolicy { max_rounds: 6 });

            assert!(fetcher.ensure(&descriptor).await.is_err());

            let requested = transport.requested();
            assert_eq!(requested.len(), 6);
            assert_no_repeats(&requested);
        }
    }

    #[tokio::test]
    async fn test_zero_round_policy_is_rejected() {
        let dir = TempDir::new().unwrap();
        let transport = ScriptedMirrors::new([]);
        let mut fetcher = fetcher(transport, 0).with_policy(FetchPolicy { max_rounds: 0 });

        let err = fetcher.ensure(&descriptor(&dir, 2)).await.unwrap_err();
        assert!(matches!(err, ArtifactError::NoRounds));
    }

    #[tokio::test]
    async fn test_mirror_rotation_never_repeats() {
        for seed in 0..25 {
            let dir = TempDir::new().unwrap();
            let descriptor = descriptor(&dir, 3);
            let transport = ScriptedMirrors::new([]);
            let mut fetcher = fetcher(transport.clone(), seed).with_policy(FetchPolicy { max_rounds: 12 });

            assert!(fetcher.ensure(&descriptor).await.is_err());

            let requested = transport.requested();
            assert_eq!(requested.len(), 12);
            assert_no_repeats(&requested);
        }
    }

    #[test]
    fn test_pick_mirror_with_two_alternates() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(pick_mirror(2, Some(0), &mut rng), 1);
            assert_eq!(pick_mirror(2, Some(1), &mut rng), 0);
        }
    }

    #[test]
    fn test_pick_mirror_reaches_every_alternative() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = [false; 4];
        for _ in 0..200 {
            let index = pick_mirror(4, Some(2), &mut rng);
            assert_ne!(index, 2);
            seen[index] = true;
        }
        assert_eq!(seen, [true, true, false, true]);
    }
}
