//! Uniform incremental transform interface over the compression backends.

use bytes::Bytes;

use crate::error::CodecError;

/// An incremental compressor or decompressor.
///
/// Each backend library exposes a different native streaming API. Adapters
/// implement this trait so callers only ever see `feed` and `flush`.
///
/// Implementations hold sequential state (dictionaries, block buffers, header
/// parsers) and must see the whole logical stream in order. A new stream needs
/// a new instance.
pub trait ChunkTransform: Send {
    /// Push one input chunk through the transform.
    ///
    /// Returns whatever output the backend produced for it, which may be empty
    /// because compressors buffer internally.
    fn feed(&mut self, chunk: &[u8]) -> Result<Bytes, CodecError>;

    /// Finish the stream and return any output still buffered.
    ///
    /// Consumes the transform, so a stream is flushed exactly once.
    fn flush(self: Box<Self>) -> Result<Bytes, CodecError>;

    /// Human-readable name of the backend (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// Move everything the backend has written so far out of its output buffer.
pub(crate) fn take_output(buf: &mut Vec<u8>) -> Bytes {
    Bytes::from(std::mem::take(buf))
}
