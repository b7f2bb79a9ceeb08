//! bzip2 codec.

use std::io::{self, Write};

use bytes::Bytes;
use bzip2::write::BzEncoder;
use bzip2::{Compression, Decompress, Status};
use snafu::ResultExt;

use super::traits::{ChunkTransform, take_output};
use crate::error::{CodecError, CompressSnafu, CorruptStreamSnafu};

const NAME: &str = "bzip";

/// Output buffer growth step for decompression.
const OUTPUT_CHUNK: usize = 64 * 1024;

/// Streaming bzip2 compressor.
///
/// bzip2 works on whole blocks (100-900 KB depending on level), so `feed`
/// usually returns nothing until a block fills up.
pub struct BzipCompressor {
    encoder: BzEncoder<Vec<u8>>,
}

impl BzipCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            encoder: BzEncoder::new(Vec::new(), Compression::new(level)),
        }
    }
}

impl ChunkTransform for BzipCompressor {
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

/// Streaming bzip2 decompressor.
///
/// Drives `bzip2::Decompress` directly so stream boundaries are visible:
/// concatenated streams are decoded back to back, and input that stops in the
/// middle of a stream is reported on flush.
pub struct BzipDecompressor {
    inner: Decompress,
    in_stream: bool,
}

impl BzipDecompressor {
    pub fn new() -> Self {
        Self {
            inner: Decompress::new(false),
            in_stream: false,
        }
    }
}

impl Default for BzipDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkTransform for BzipDecompressor {
    fn feed(&mut self, chunk: &[u8]) -> Result<Bytes, CodecError> {
        let mut out = Vec::with_capacity(OUTPUT_CHUNK);
        let mut consumed = 0;

        while consumed < chunk.len() || self.in_stream {
            if !self.in_stream {
                self.in_stream = true;
            }
            if out.capacity() - out.len() < OUTPUT_CHUNK / 4 {
                out.reserve(OUTPUT_CHUNK);
            }

            let in_before = self.inner.total_in();
            let out_before = self.inner.total_out();
            let status = self
                .inner
                .decompress_vec(&chunk[consumed..], &mut out)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
                .context(CorruptStreamSnafu { algorithm: NAME })?;
            consumed += (self.inner.total_in() - in_before) as usize;
            let produced = self.inner.total_out() - out_before;

            if status == Status::StreamEnd {
                // Anything after the end marker starts a new stream
                self.inner = Decompress::new(false);
                self.in_stream = false;
                continue;
            }

            let input_drained = consumed == chunk.len();
            let output_has_room = out.len() < out.capacity();
            if input_drained && output_has_room {
                break;
            }
            if produced == 0 && input_drained {
                break;
            }
        }

        Ok(Bytes::from(out))
    }

    fn flush(self: Box<Self>) -> Result<Bytes, CodecError> {
        if self.in_stream {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "bzip2 stream is truncated",
            ))
            .context(CorruptStreamSnafu { algorithm: NAME });
        }
        Ok(Bytes::new())
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
