//! Stream adapters running buffers through a [`ChunkCodec`].

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use super::{Algorithm, ChunkCodec, TextEncoding, TextValidator};
use crate::error::CodecError;

/// A decompressed buffer: raw bytes, or text when an encoding was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buffer {
    Bytes(Bytes),
    Text(String),
}

impl Buffer {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Buffer::Bytes(bytes) => bytes,
            Buffer::Text(text) => text.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Buffer::Bytes(bytes) => bytes,
            Buffer::Text(text) => Bytes::from(text),
        }
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Bytes> for Buffer {
    fn from(bytes: Bytes) -> Self {
        Buffer::Bytes(bytes)
    }
}

struct Transforming<S> {
    input: Pin<Box<S>>,
    codec: Option<ChunkCodec>,
    validator: Option<TextValidator>,
}

/// Compress a stream of buffers.
///
/// Each input chunk yields one (possibly empty) output chunk, and exactly one
/// final chunk from the flush follows the end of input. With an encoding,
/// input is validated against it first.
///
/// The level is checked before any input is consumed.
pub fn compress<S, B, E>(
    buffers: S,
    algorithm: Algorithm,
    encoding: Option<TextEncoding>,
    level: u32,
) -> Result<impl Stream<Item = Result<Bytes, CodecError>>, CodecError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    CodecError: From<E>,
{
    let state = Transforming {
        input: Box::pin(buffers),
        codec: Some(ChunkCodec::compressor(algorithm, level)?),
        validator: encoding.map(TextValidator::new),
    };
    Ok(stream::try_unfold(state, compress_step::<S, B, E>))
}

async fn compress_step<S, B, E>(
    mut state: Transforming<S>,
) -> Result<Option<(Bytes, Transforming<S>)>, CodecError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    CodecError: From<E>,
{
    let Some(codec) = state.codec.as_mut() else {
        return Ok(None);
    };

    match state.input.next().await {
        Some(chunk) => {
            let chunk = chunk?;
            let chunk = chunk.as_ref();
            if let Some(validator) = state.validator.as_mut() {
                validator.check(chunk)?;
            }
            let out = codec.feed(chunk)?;
            Ok(Some((out, state)))
        }
        None => {
            if let Some(validator) = state.validator.take() {
                validator.finish(false)?;
            }
            let out = match state.codec.take() {
                Some(codec) => codec.flush()?,
                None => return Ok(None),
            };
            Ok(Some((out, state)))
        }
    }
}

/// Decompress a stream of buffers.
///
/// Yields [`Buffer::Text`] when an encoding is given, [`Buffer::Bytes`]
/// otherwise. A final flush chunk always follows the end of input.
pub fn decompress<S, B, E>(
    buffers: S,
    algorithm: Algorithm,
    encoding: Option<TextEncoding>,
) -> Result<impl Stream<Item = Result<Buffer, CodecError>>, CodecError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    CodecError: From<E>,
{
    let state = Transforming {
        input: Box::pin(buffers),
        codec: Some(ChunkCodec::decompressor(algorithm)?),
        validator: encoding.map(TextValidator::new),
    };
    Ok(stream::try_unfold(state, decompress_step::<S, B, E>))
}

async fn decompress_step<S, B, E>(
    mut state: Transforming<S>,
) -> Result<Option<(Buffer, Transforming<S>)>, CodecError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    CodecError: From<E>,
{
    let Some(codec) = state.codec.as_mut() else {
        return Ok(None);
    };

    match state.input.next().await {
        Some(chunk) => {
            let chunk = chunk?;
            let out = codec.feed(chunk.as_ref())?;
            let buffer = into_buffer(out, state.validator.as_mut())?;
            Ok(Some((buffer, state)))
        }
        None => {
            let out = match state.codec.take() {
                Some(codec) => codec.flush()?,
                None => return Ok(None),
            };
            let buffer = into_buffer(out, state.validator.as_mut())?;
            if let Some(validator) = state.validator.take() {
                validator.finish(true)?;
            }
            Ok(Some((buffer, state)))
        }
    }
}

fn into_buffer(out: Bytes, validator: Option<&mut TextValidator>) -> Result<Buffer, CodecError> {
    match validator {
        Some(validator) => Ok(Buffer::Text(validator.decode(&out)?)),
        None => Ok(Buffer::Bytes(out)),
    }
}
