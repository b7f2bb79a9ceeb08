//! Deflate codec with gzip framing, using flate2.

use std::io::{self, Write};

use bytes::Bytes;
use flate2::Compression;
use flate2::write::{GzEncoder, MultiGzDecoder, ZlibDecoder};
use snafu::ResultExt;

use super::traits::{ChunkTransform, take_output};
use crate::error::{CodecError, CompressSnafu, CorruptStreamSnafu};

const NAME: &str = "gzip";

/// First two bytes of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Streaming gzip compressor.
pub struct GzipCompressor {
    encoder: GzEncoder<Vec<u8>>,
}

impl GzipCompressor {
    /// Create a compressor; `level` is 0-9 and is handed to flate2 as-is.
    pub fn new(level: u32) -> Self {
        Self {
            encoder: GzEncoder::new(Vec::new(), Compression::new(level)),
        }
    }
}

impl ChunkTransform for GzipCompressor {
    fn feed(&mut self, chunk: &[u8]) -> Result<Bytes, CodecError> {
        self.encoder
            .write_all(chunk)
            .context(CompressSnafu { algorithm: NAME })?;
        Ok(take_output(self.encoder.get_mut()))
    }

    fn flush(self: Box<Self>) -> Result<Bytes, CodecError> {
        let remaining = self
            .encoder
            .finish()
            .context(CompressSnafu { algorithm: NAME })?;
        Ok(Bytes::from(remaining))
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

enum Inflater {
    /// Waiting for enough bytes to tell gzip framing from zlib framing.
    Sniffing(Vec<u8>),
    /// Members are decoded back to back, like `gzip -d` does.
    Gzip(MultiGzDecoder<Vec<u8>>),
    Zlib(ZlibDecoder<Vec<u8>>),
}

/// Streaming inflater accepting either gzip or zlib framing.
///
/// The framing is detected from the first two bytes of input.
pub struct GzipDecompressor {
    state: Inflater,
}

impl GzipDecompressor {
    pub fn new() -> Self {
        Self {
            state: Inflater::Sniffing(Vec::new()),
        }
    }

    fn inflate(&mut self, data: &[u8]) -> Result<Bytes, CodecError> {
        match &mut self.state {
            Inflater::Gzip(decoder) => {
                decoder
                    .write_all(data)
                    .context(CorruptStreamSnafu { algorithm: NAME })?;
                Ok(take_output(decoder.get_mut()))
            }
            Inflater::Zlib(decoder) => {
                decoder
                    .write_all(data)
                    .context(CorruptStreamSnafu { algorithm: NAME })?;
                Ok(take_output(decoder.get_mut()))
            }
            Inflater::Sniffing(_) => Ok(Bytes::new()),
        }
    }
}

impl Default for GzipDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkTransform for GzipDecompressor {
    fn feed(&mut self, chunk: &[u8]) -> Result<Bytes, CodecError> {
        if let Inflater::Sniffing(pending) = &mut self.state {
            pending.extend_from_slice(chunk);
            if pending.len() < GZIP_MAGIC.len() {
                return Ok(Bytes::new());
            }
            let pending = std::mem::take(pending);
            self.state = if pending[..2] == GZIP_MAGIC {
                Inflater::Gzip(MultiGzDecoder::new(Vec::new()))
            } else {
                Inflater::Zlib(ZlibDecoder::new(Vec::new()))
            };
            return self.inflate(&pending);
        }
        self.inflate(chunk)
    }

    fn flush(self: Box<Self>) -> Result<Bytes, CodecError> {
        let remaining = match self.state {
            Inflater::Sniffing(pending) if pending.is_empty() => Vec::new(),
            Inflater::Sniffing(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside the header",
                ))
                .context(CorruptStreamSnafu { algorithm: NAME });
            }
            Inflater::Gzip(decoder) => decoder
                .finish()
                .context(CorruptStreamSnafu { algorithm: NAME })?,
            Inflater::Zlib(decoder) => decoder
                .finish()
                .context(CorruptStreamSnafu { algorithm: NAME })?,
        };
        Ok(Bytes::from(remaining))
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
