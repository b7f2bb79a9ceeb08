//! A single readable source: a file or the process default input.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use snafu::ResultExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::error::{OpenSourceSnafu, ReadSourceSnafu, SourceError};

/// Name reported for the default input.
pub const STDIN_NAME: &str = "<stdin>";

type Reader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Process standard input or an injected stand-in. Never closed here.
    Default,
    /// A file opened by explicit path, owned by its source set.
    File(PathBuf),
}

/// An open source with its read state.
pub struct Source {
    name: String,
    kind: SourceKind,
    reader: Option<Reader>,
    exhausted: bool,
}

impl Source {
    /// Open a regular file.
    pub async fn open(path: &Path) -> Result<Self, SourceError> {
        if !is_regular_file(path).await {
            return Err(SourceError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = tokio::fs::File::open(path)
            .await
            .context(OpenSourceSnafu { path })?;
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(file);
        Ok(Self {
            name: path.display().to_string(),
            kind: SourceKind::File(path.to_path_buf()),
            reader: Some(BufReader::new(reader)),
            exhausted: false,
        })
    }

    /// Wrap the default input.
    pub fn default_input(reader: Box<dyn AsyncRead + Send + Unpin>) -> Self {
        Self {
            name: STDIN_NAME.to_string(),
            kind: SourceKind::Default,
            reader: Some(BufReader::new(reader)),
            exhausted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.kind {
            SourceKind::File(path) => Some(path),
            SourceKind::Default => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Allow a live re-read of an exhausted source.
    pub(crate) fn rearm(&mut self) {
        self.exhausted = false;
    }

    /// Whether the backing file has gone away. The default input never does.
    pub async fn is_missing(&self) -> bool {
        match &self.kind {
            SourceKind::File(path) => !tokio::fs::try_exists(path).await.unwrap_or(false),
            SourceKind::Default => false,
        }
    }

    /// Read up to `size` bytes; an empty result marks the source exhausted.
    ///
    /// With `line_aligned`, a non-empty chunk is extended through the next
    /// newline.
    pub async fn read(&mut self, size: usize, line_aligned: bool) -> Result<Bytes, SourceError> {
        let Some(reader) = self.reader.as_mut() else {
            self.exhausted = true;
            return Ok(Bytes::new());
        };

        let mut buf = BytesMut::zeroed(size);
        let mut filled = 0;
        // Fill the whole buffer unless the source runs dry
        while filled < size {
            let n = reader
                .read(&mut buf[filled..])
                .await
                .context(ReadSourceSnafu { name: &self.name })?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        if filled == 0 {
            self.exhausted = true;
            return Ok(Bytes::new());
        }

        if line_aligned && buf.last() != Some(&b'\n') {
            let mut rest = Vec::new();
            reader
                .read_until(b'\n', &mut rest)
                .await
                .context(ReadSourceSnafu { name: &self.name })?;
            buf.extend_from_slice(&rest);
        }

        Ok(buf.freeze())
    }

    /// Release the handle of a file source. The default input is left open.
    pub fn close(&mut self) {
        if matches!(self.kind, SourceKind::File(_)) {
            self.reader = None;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("exhausted", &self.exhausted)
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub(crate) async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
