//! xz/lzma codec, using xz2.

use std::io::Write;

use bytes::Bytes;
use snafu::ResultExt;
use xz2::stream::{CONCATENATED, Stream};
use xz2::write::{XzDecoder, XzEncoder};

use super::traits::{ChunkTransform, take_output};
use crate::error::{CodecError, CompressSnafu, CorruptStreamSnafu};

const NAME: &str = "lzma";

pub struct LzmaCompressor {
    encoder: XzEncoder<Vec<u8>>,
}

impl LzmaCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            encoder: XzEncoder::new(Vec::new(), level),
        }
    }
}

impl ChunkTransform for LzmaCompressor {
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

/// Streaming xz decompressor; concatenated `.xz` streams decode back to back.
pub struct LzmaDecompressor {
    decoder: XzDecoder<Vec<u8>>,
}

impl LzmaDecompressor {
    pub fn new() -> Result<Self, CodecError> {
        let stream = Stream::new_stream_decoder(u64::MAX, CONCATENATED)
            .map_err(std::io::Error::from)
            .context(CorruptStreamSnafu { algorithm: NAME })?;
        Ok(Self {
            decoder: XzDecoder::new_stream(Vec::new(), stream),
        })
    }
}

impl ChunkTransform for LzmaDecompressor {
    fn feed(&mut self, chunk: &[u8]) -> Result<Bytes, CodecError> {
        self.decoder
            .write_all(chunk)
            .context(CorruptStreamSnafu { algorithm: NAME })?;
        Ok(take_output(self.decoder.get_mut()))
    }

    fn flush(mut self: Box<Self>) -> Result<Bytes, CodecError> {
        let remaining = self
            .decoder
            .finish()
            .context(CorruptStreamSnafu { algorithm: NAME })?;
        Ok(Bytes::from(remaining))
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
