//! Text encodings for codec input and output.

use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

/// Supported text encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Utf8,
    Ascii,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "ascii",
        }
    }

    /// Length of the longest prefix of `data` made of complete, valid
    /// characters.
    ///
    /// Returns `Err(offset)` at the first invalid byte. An incomplete UTF-8
    /// sequence at the very end is not an error; it is left out of the prefix.
    fn valid_prefix(&self, data: &[u8]) -> Result<usize, usize> {
        match self {
            TextEncoding::Ascii => match data.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(offset),
                None => Ok(data.len()),
            },
            TextEncoding::Utf8 => match std::str::from_utf8(data) {
                Ok(_) => Ok(data.len()),
                Err(e) if e.error_len().is_none() => Ok(e.valid_up_to()),
                Err(e) => Err(e.valid_up_to()),
            },
        }
    }
}

impl FromStr for TextEncoding {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            _ => Err(CodecError::UnsupportedEncoding {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validates a byte stream against an encoding, chunk by chunk.
///
/// A multi-byte character split across two chunks is carried over and
/// completed by the next chunk. Offsets in errors are relative to the start
/// of the whole stream.
#[derive(Debug)]
pub struct TextValidator {
    encoding: TextEncoding,
    pending: Vec<u8>,
    offset: u64,
}

impl TextValidator {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
            offset: 0,
        }
    }

    /// Decode a chunk into text, holding back any trailing partial character.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, CodecError> {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(chunk);

        let valid = self.encoding.valid_prefix(&data).map_err(|at| {
            CodecError::TextDecode {
                encoding: self.encoding.name(),
                offset: self.offset + at as u64,
            }
        })?;
        self.pending = data.split_off(valid);

        let text = String::from_utf8(data).map_err(|e| CodecError::TextDecode {
            encoding: self.encoding.name(),
            offset: self.offset + e.utf8_error().valid_up_to() as u64,
        })?;
        self.offset += valid as u64;
        Ok(text)
    }

    /// Check a chunk of input destined for the compressor.
    pub fn check(&mut self, chunk: &[u8]) -> Result<(), CodecError> {
        let encoding = self.encoding;
        let offset = self.offset;
        let to_error = |at: usize| CodecError::TextEncode {
            encoding: encoding.name(),
            offset: offset + at as u64,
        };

        if self.pending.is_empty() {
            let valid = encoding.valid_prefix(chunk).map_err(to_error)?;
            self.pending.extend_from_slice(&chunk[valid..]);
            self.offset += valid as u64;
        } else {
            let mut data = std::mem::take(&mut self.pending);
            data.extend_from_slice(chunk);
            let valid = encoding.valid_prefix(&data).map_err(to_error)?;
            self.pending = data.split_off(valid);
            self.offset += valid as u64;
        }
        Ok(())
    }

    /// Fail if the stream ended inside a character.
    pub fn finish(self, decoding: bool) -> Result<(), CodecError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let encoding = self.encoding.name();
        let offset = self.offset;
        Err(if decoding {
            CodecError::TextDecode { encoding, offset }
        } else {
            CodecError::TextEncode { encoding, offset }
        })
    }
}
