//! Control-channel watcher for live source sets.
//!
//! Paths arrive one per line on a control channel (standard input by
//! default). A background task owns the channel and forwards lines over an
//! mpsc queue, so a poll that times out never drops a line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::handle::is_regular_file;
use super::set::SourceSet;

const CHANNEL_CAPACITY: usize = 1024;

/// Why an announced path left the set unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No regular file exists at the path.
    NotAFile,
    /// The path is already being read.
    AlreadyTracked,
    /// The file exists but could not be opened.
    Unreadable,
}

/// What happened to one path during a watch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PathBuf),
    /// Announced again after its file disappeared.
    Removed(PathBuf),
    /// Found missing by a sweep.
    Swept(PathBuf),
    Ignored { path: PathBuf, reason: IgnoreReason },
}

pub struct Watcher {
    lines: mpsc::Receiver<String>,
    poll_timeout: Duration,
    reader: JoinHandle<()>,
}

impl Watcher {
    /// Start reading newline-delimited paths from `control`.
    pub fn spawn<R>(control: R, poll_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(control).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Control channel closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read control channel");
                        break;
                    }
                }
            }
        });

        Self {
            lines: rx,
            poll_timeout,
            reader,
        }
    }

    /// Watch standard input.
    pub fn stdin(poll_timeout: Duration) -> Self {
        Self::spawn(tokio::io::stdin(), poll_timeout)
    }

    /// Collect announced paths until no new line arrives within the poll
    /// timeout, or the control channel closes.
    pub async fn poll_new_paths(&mut self) -> Vec<String> {
        let mut paths = Vec::new();
        while let Ok(Some(line)) = tokio::time::timeout(self.poll_timeout, self.lines.recv()).await
        {
            let line = line.trim();
            if !line.is_empty() {
                paths.push(line.to_string());
            }
        }
        if !paths.is_empty() {
            debug!(count = paths.len(), "Received source paths");
        }
        paths
    }

    /// Reconcile `set` with a batch of announced paths.
    pub async fn apply<P: AsRef<Path>>(paths: &[P], set: &mut SourceSet) -> Vec<WatchEvent> {
        let mut events = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let exists = is_regular_file(path).await;
            let tracked = set.contains(path);

            let event = match (exists, tracked) {
                (false, true) => {
                    set.remove(path);
                    warn!(path = %path.display(), "Source disappeared, removing");
                    WatchEvent::Removed(path.to_path_buf())
                }
                (false, false) => {
                    warn!(path = %path.display(), "Cannot watch a path that is not a file, ignoring");
                    WatchEvent::Ignored {
                        path: path.to_path_buf(),
                        reason: IgnoreReason::NotAFile,
                    }
                }
                (true, true) => {
                    debug!(path = %path.display(), "Source already tracked");
                    WatchEvent::Ignored {
                        path: path.to_path_buf(),
                        reason: IgnoreReason::AlreadyTracked,
                    }
                }
                (true, false) => match set.add_path(path).await {
                    Ok(()) => {
                        info!(path = %path.display(), "Added source");
                        WatchEvent::Added(path.to_path_buf())
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to open announced source");
                        WatchEvent::Ignored {
                            path: path.to_path_buf(),
                            reason: IgnoreReason::Unreadable,
                        }
                    }
                },
            };
            events.push(event);
        }
        events
    }

    /// Remove every tracked file source whose file no longer exists.
    pub async fn sweep_missing(set: &mut SourceSet) -> Vec<WatchEvent> {
        set.remove_missing()
            .await
            .into_iter()
            .map(|path| {
                warn!(path = %path.display(), "Source disappeared, removing");
                WatchEvent::Swept(path)
            })
            .collect()
    }

    /// Poll for new paths, apply them, then sweep.
    pub async fn update(&mut self, set: &mut SourceSet) -> Vec<WatchEvent> {
        let paths = self.poll_new_paths().await;
        let mut events = Self::apply(&paths, set).await;
        events.extend(Self::sweep_missing(set).await);
        events
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
