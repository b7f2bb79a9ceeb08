//! Ordered source collection with a single read cursor.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use dataphile_core::emit;
use dataphile_core::metrics::events::{
    BytesRead, RemovalReason, SourceAdded, SourceExhausted, SourceRemoved,
};
use futures::stream::{self, Stream};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handle::{Source, SourceKind};
use super::watcher::Watcher;
use super::SourceSetConfig;
use crate::error::SourceError;

/// An ordered set of sources read through one cursor.
///
/// Non-live sets read every source once, in order, then return the empty
/// sentinel. Live sets start over after a latency pause and only stop when
/// cancelled.
pub struct SourceSet {
    sources: Vec<Source>,
    active: usize,
    config: SourceSetConfig,
    watcher: Option<Watcher>,
    shutdown: CancellationToken,
    closed: bool,
    bytes_read: u64,
}

impl SourceSet {
    /// Open the configured sources, using standard input as the default.
    ///
    /// With `live` and `watch` both set, a watcher on standard input is
    /// attached and announced paths join the set as they arrive.
    pub async fn open(config: SourceSetConfig) -> Result<Self, SourceError> {
        let attach_stdin_watcher = config.live && config.watch;
        let poll_timeout = config.poll_timeout;
        let set = Self::open_with(config, Box::new(tokio::io::stdin())).await?;
        if attach_stdin_watcher {
            info!("Watching standard input for new source paths");
            return Ok(set.with_watcher(Watcher::stdin(poll_timeout)));
        }
        Ok(set)
    }

    /// Open the configured sources with `default_input` standing in for
    /// standard input.
    ///
    /// No watcher is attached; see [`SourceSet::with_watcher`].
    pub async fn open_with(
        config: SourceSetConfig,
        default_input: Box<dyn AsyncRead + Send + Unpin>,
    ) -> Result<Self, SourceError> {
        if config.watch && !config.live {
            if config.paths.is_empty() {
                return Err(SourceError::Configuration {
                    message: "watch requires live mode when no paths are given".to_string(),
                });
            }
            debug!("Watch has no effect without live mode");
        }
        if config.latency.is_zero() && config.live {
            return Err(SourceError::Configuration {
                message: "live mode requires a non-zero latency".to_string(),
            });
        }

        let mut sources = Vec::with_capacity(config.paths.len().max(1));
        if config.paths.is_empty() {
            if !config.watch {
                sources.push(Source::default_input(default_input));
            }
        } else {
            for path in &config.paths {
                sources.push(Source::open(path).await?);
            }
        }

        info!(
            sources = sources.len(),
            live = config.live,
            watch = config.watch,
            "Opened source set"
        );

        Ok(Self {
            sources,
            active: 0,
            config,
            watcher: None,
            shutdown: CancellationToken::new(),
            closed: false,
            bytes_read: 0,
        })
    }

    /// Stop reading when `shutdown` is cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Run `watcher` at every live pass boundary.
    pub fn with_watcher(mut self, watcher: Watcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Read the next buffer of at most `buffer_size` bytes.
    ///
    /// An empty result is the end-of-data sentinel. Live sets only return it
    /// once cancelled.
    pub async fn read(&mut self, buffer_size: usize) -> Result<Bytes, SourceError> {
        if buffer_size == 0 {
            return Err(SourceError::Configuration {
                message: "buffer size must be positive".to_string(),
            });
        }
        let shutdown = self.shutdown.clone();

        loop {
            if self.closed || shutdown.is_cancelled() {
                return Ok(Bytes::new());
            }

            if let Some(source) = self.sources.get_mut(self.active) {
                let chunk = tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => {
                        debug!("Read cancelled");
                        return Ok(Bytes::new());
                    }
                    chunk = source.read(buffer_size, self.config.line_aligned) => chunk?,
                };

                if !chunk.is_empty() {
                    self.bytes_read += chunk.len() as u64;
                    emit!(BytesRead {
                        bytes: chunk.len() as u64
                    });
                    return Ok(chunk);
                }

                debug!(source = source.name(), "Source exhausted");
                emit!(SourceExhausted);
                if !self.config.live {
                    source.close();
                }
                self.active += 1;
                continue;
            }

            if !self.config.live {
                return Ok(Bytes::new());
            }
            if !self.next_pass().await {
                return Ok(Bytes::new());
            }
        }
    }

    /// Wait out the latency, refresh membership and rewind the cursor.
    ///
    /// Returns false when cancelled.
    async fn next_pass(&mut self) -> bool {
        let shutdown = self.shutdown.clone();
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => return false,
            _ = tokio::time::sleep(self.config.latency) => {}
        }

        if let Some(mut watcher) = self.watcher.take() {
            let updated = tokio::select! {
                biased;

                _ = shutdown.cancelled() => false,
                _ = watcher.update(self) => true,
            };
            self.watcher = Some(watcher);
            if !updated {
                return false;
            }
        } else {
            for path in self.remove_missing().await {
                warn!(path = %path.display(), "Source disappeared, removing");
            }
        }

        for source in &mut self.sources {
            source.rearm();
        }
        self.active = 0;
        true
    }

    /// Stream buffers until the first sentinel.
    pub fn iter_buffers(
        &mut self,
        buffer_size: usize,
    ) -> impl Stream<Item = Result<Bytes, SourceError>> + '_ {
        stream::try_unfold(self, move |set| next_buffer(set, buffer_size))
    }

    /// Close every file source. The default input is left open.
    pub fn close_all(&mut self) {
        if self.closed {
            return;
        }
        for source in &mut self.sources {
            source.close();
        }
        self.closed = true;
        debug!(sources = self.sources.len(), "Closed source set");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the shutdown token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Total bytes returned by [`SourceSet::read`] so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Whether a file source for `path` is in the set.
    pub fn contains(&self, path: &Path) -> bool {
        self.position(path).is_some()
    }

    /// Open `path` and append it to the read order.
    pub async fn add_path(&mut self, path: &Path) -> Result<(), SourceError> {
        let source = Source::open(path).await?;
        self.sources.push(source);
        emit!(SourceAdded);
        Ok(())
    }

    /// Drop the source for `path`, closing its handle.
    ///
    /// Returns false if it was not tracked.
    pub fn remove(&mut self, path: &Path) -> bool {
        let Some(index) = self.position(path) else {
            return false;
        };
        self.remove_at(index);
        emit!(SourceRemoved {
            reason: RemovalReason::Announced
        });
        true
    }

    /// Drop every file source whose backing file no longer exists.
    pub async fn remove_missing(&mut self) -> Vec<PathBuf> {
        let mut missing = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            if source.is_missing().await {
                missing.push(index);
            }
        }

        let mut removed = Vec::with_capacity(missing.len());
        for index in missing.into_iter().rev() {
            if let Some(path) = self.remove_at(index) {
                emit!(SourceRemoved {
                    reason: RemovalReason::Vanished
                });
                removed.push(path);
            }
        }
        removed.reverse();
        removed
    }

    /// Source names in read order.
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(Source::name).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.sources
            .iter()
            .position(|source| source.path() == Some(path))
    }

    fn remove_at(&mut self, index: usize) -> Option<PathBuf> {
        let mut source = self.sources.remove(index);
        source.close();
        if index < self.active {
            self.active -= 1;
        }
        match source.kind() {
            SourceKind::File(path) => Some(path.clone()),
            SourceKind::Default => None,
        }
    }
}

async fn next_buffer(
    set: &mut SourceSet,
    buffer_size: usize,
) -> Result<Option<(Bytes, &mut SourceSet)>, SourceError> {
    let chunk = set.read(buffer_size).await?;
    if chunk.is_empty() {
        Ok(None)
    } else {
        Ok(Some((chunk, set)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_files(temp: &TempDir, files: &[(&str, &str)]) -> Vec<PathBuf> {
        files
            .iter()
            .map(|(name, content)| {
                let path = temp.path().join(name);
                std::fs::write(&path, content).unwrap();
                path
            })
            .collect()
    }

    fn empty_input() -> Box<dyn AsyncRead + Send + Unpin> {
        Box::new(Cursor::new(Vec::new()))
    }

    async fn collect(set: &mut SourceSet, buffer_size: usize) -> Vec<Bytes> {
        set.iter_buffers(buffer_size).try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_iter_buffers_hello_world() {
        let temp = TempDir::new().unwrap();
        let paths = write_files(&temp, &[("a.txt", "hello "), ("b.txt", "world")]);
        let mut set = SourceSet::open_with(SourceSetConfig::new(paths), empty_input())
            .await
            .unwrap();

        let chunks = collect(&mut set, 4).await;
        assert_eq!(chunks.concat(), b"hello world");
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 4));
    }

    #[tokio::test]
    async fn test_ordering_independent_of_buffer_size() {
        let temp = TempDir::new().unwrap();
        let files = [("1", "alpha\n"), ("2", ""), ("3", "gamma delta\n"), ("4", "z")];
        let expected: String = files.iter().map(|(_, c)| *c).collect();

        for buffer_size in [1, 2, 3, 5, 8, 64, 1024] {
            let paths = write_files(&temp, &files);
            let mut set = SourceSet::open_with(SourceSetConfig::new(paths), empty_input())
                .await
                .unwrap();
            let chunks = collect(&mut set, buffer_size).await;
            assert_eq!(chunks.concat(), expected.as_bytes(), "buffer size {buffer_size}");
        }
    }

    #[tokio::test]
    async fn test_sentinel_after_all_data() {
        let temp = TempDir::new().unwrap();
        let paths = write_files(&temp, &[("a", "abc")]);
        let mut set = SourceSet::open_with(SourceSetConfig::new(paths), empty_input())
            .await
            .unwrap();

        assert_eq!(set.read(10).await.unwrap(), "abc");
        assert!(set.read(10).await.unwrap().is_empty());
        // Keeps returning the sentinel
        assert!(set.read(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_input_when_no_paths() {
        let mut set = SourceSet::open_with(SourceSetConfig::default(), empty_input())
            .await
            .unwrap();
        assert_eq!(set.names(), vec![crate::source::STDIN_NAME]);
        assert!(set.read(16).await.unwrap().is_empty());

        let input: Box<dyn AsyncRead + Send + Unpin> = Box::new(Cursor::new(b"piped".to_vec()));
        let mut set = SourceSet::open_with(SourceSetConfig::default(), input)
            .await
            .unwrap();
        assert_eq!(collect(&mut set, 2).await.concat(), b"piped");
    }

    #[tokio::test]
    async fn test_watch_without_live_or_paths_is_rejected() {
        let config = SourceSetConfig {
            watch: true,
            ..Default::default()
        };
        let result = SourceSet::open_with(config, empty_input()).await;
        assert!(matches!(result, Err(SourceError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_live_watch_without_paths_starts_empty() {
        let config = SourceSetConfig {
            live: true,
            watch: true,
            ..Default::default()
        };
        let set = SourceSet::open_with(config, empty_input()).await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_missing_path_fails_construction() {
        let temp = TempDir::new().unwrap();
        let config = SourceSetConfig::new(vec![temp.path().join("absent.log")]);
        let result = SourceSet::open_with(config, empty_input()).await;
        assert!(matches!(result, Err(SourceError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_zero_buffer_size_is_rejected() {
        let mut set = SourceSet::open_with(SourceSetConfig::default(), empty_input())
            .await
            .unwrap();
        assert!(matches!(
            set.read(0).await,
            Err(SourceError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_line_aligned_chunks() {
        let temp = TempDir::new().unwrap();
        let paths = write_files(&temp, &[("a", "one\ntwo\nthree"), ("b", "four\n")]);
        let config = SourceSetConfig {
            line_aligned: true,
            ..SourceSetConfig::new(paths)
        };
        let mut set = SourceSet::open_with(config, empty_input()).await.unwrap();

        let chunks = collect(&mut set, 2).await;
        assert_eq!(chunks, vec!["one\n", "two\n", "three", "four\n"]);
    }

    #[tokio::test]
    async fn test_live_round_robin_never_ends() {
        let temp = TempDir::new().unwrap();
        let paths = write_files(&temp, &[("a", "AAA"), ("b", "BBBBB")]);
        let config = SourceSetConfig {
            live: true,
            latency: Duration::from_millis(10),
            ..SourceSetConfig::new(paths.clone())
        };
        let mut set = SourceSet::open_with(config, empty_input()).await.unwrap();

        let append = |path: &PathBuf, extra: &str| {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
            file.write_all(extra.as_bytes()).unwrap();
        };

        assert_eq!(set.read(16).await.unwrap(), "AAA");
        assert_eq!(set.read(16).await.unwrap(), "BBBBB");

        // The cursor sits on B, so A's growth is seen after the pass wraps
        append(&paths[0], "aa");
        assert_eq!(set.read(16).await.unwrap(), "aa");
        append(&paths[1], "bb");
        assert_eq!(set.read(16).await.unwrap(), "bb");

        // No growth: the set keeps cycling instead of returning the sentinel
        let pending = tokio::time::timeout(Duration::from_millis(100), set.read(16)).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_live_set_returns_sentinel() {
        let temp = TempDir::new().unwrap();
        let paths = write_files(&temp, &[("a", "x")]);
        let shutdown = CancellationToken::new();
        let config = SourceSetConfig {
            live: true,
            latency: Duration::from_secs(60),
            ..SourceSetConfig::new(paths)
        };
        let mut set = SourceSet::open_with(config, empty_input())
            .await
            .unwrap()
            .with_shutdown(shutdown.clone());

        assert_eq!(set.read(8).await.unwrap(), "x");
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            shutdown.cancel();
        });
        let result = tokio::time::timeout(Duration::from_secs(5), set.read(8))
            .await
            .expect("cancellation should interrupt the latency wait");
        assert!(result.unwrap().is_empty());
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_live_pass_prunes_vanished_files() {
        let temp = TempDir::new().unwrap();
        let paths = write_files(&temp, &[("keep", "k"), ("gone", "g")]);
        let config = SourceSetConfig {
            live: true,
            latency: Duration::from_millis(5),
            ..SourceSetConfig::new(paths.clone())
        };
        let mut set = SourceSet::open_with(config, empty_input()).await.unwrap();
        assert_eq!(set.read(8).await.unwrap(), "k");
        assert_eq!(set.read(8).await.unwrap(), "g");

        std::fs::remove_file(&paths[1]).unwrap();
        let _ = tokio::time::timeout(Duration::from_millis(50), set.read(8)).await;
        assert_eq!(set.len(), 1);
        assert!(!set.contains(&paths[1]));
    }

    #[tokio::test]
    async fn test_membership_primitives() {
        let temp = TempDir::new().unwrap();
        let paths = write_files(&temp, &[("a", "1"), ("b", "2"), ("c", "3")]);
        let mut set = SourceSet::open_with(SourceSetConfig::new(paths[..1].to_vec()), empty_input())
            .await
            .unwrap();

        set.add_path(&paths[1]).await.unwrap();
        set.add_path(&paths[2]).await.unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&paths[1]));

        assert!(set.remove(&paths[1]));
        assert!(!set.remove(&paths[1]));
        assert_eq!(collect(&mut set, 8).await.concat(), b"13");

        std::fs::remove_file(&paths[2]).unwrap();
        assert_eq!(set.remove_missing().await, vec![paths[2].clone()]);
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_close_all_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let paths = write_files(&temp, &[("a", "data")]);
        let mut set = SourceSet::open_with(SourceSetConfig::new(paths), empty_input())
            .await
            .unwrap();

        set.close_all();
        set.close_all();
        assert!(set.is_closed());
        assert!(set.read(4).await.unwrap().is_empty());
    }
}
