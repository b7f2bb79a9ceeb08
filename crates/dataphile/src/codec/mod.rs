//! Incremental compression codecs.
//!
//! Supports gzip (with zlib auto-detection on decompression), bzip2 and xz.
//! Every backend sits behind [`ChunkTransform`]; [`ChunkCodec`] binds one
//! transformer instance to one logical stream.

mod bzip;
mod gzip;
mod lzma;
mod stream;
mod text;
mod traits;

use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::CodecError;

pub use bzip::{BzipCompressor, BzipDecompressor};
pub use gzip::{GzipCompressor, GzipDecompressor};
pub use lzma::{LzmaCompressor, LzmaDecompressor};
pub use stream::{Buffer, compress, decompress};
pub use text::{TextEncoding, TextValidator};
pub use traits::ChunkTransform;

/// Compression level used when none is given.
pub const DEFAULT_LEVEL: u32 = 6;

/// Supported compression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Gzip,
    Bzip,
    Lzma,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Gzip, Algorithm::Bzip, Algorithm::Lzma];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Gzip => "gzip",
            Algorithm::Bzip => "bzip",
            Algorithm::Lzma => "lzma",
        }
    }

    /// Accepted compression levels.
    pub fn levels(&self) -> RangeInclusive<u32> {
        match self {
            Algorithm::Gzip => 0..=9,
            Algorithm::Bzip => 1..=9,
            Algorithm::Lzma => 0..=9,
        }
    }

    pub fn check_level(&self, level: u32) -> Result<u32, CodecError> {
        let levels = self.levels();
        if levels.contains(&level) {
            Ok(level)
        } else {
            Err(CodecError::InvalidLevel {
                algorithm: self.name(),
                level,
                min: *levels.start(),
                max: *levels.end(),
            })
        }
    }

    /// Infer the algorithm from a file extension, if it is a known one.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "gz" => Some(Algorithm::Gzip),
            "bz" | "bz2" => Some(Algorithm::Bzip),
            "xz" | "lzma" => Some(Algorithm::Lzma),
            _ => None,
        }
    }
}

impl FromStr for Algorithm {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" | "zlib" => Ok(Algorithm::Gzip),
            "bzip" | "bz2" | "bzip2" => Ok(Algorithm::Bzip),
            "lzma" | "xz" => Ok(Algorithm::Lzma),
            _ => Err(CodecError::UnsupportedAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Compress,
    Decompress,
}

/// A stateful transformer bound to one algorithm and direction.
pub struct ChunkCodec {
    algorithm: Algorithm,
    direction: Direction,
    transform: Box<dyn ChunkTransform>,
}

impl ChunkCodec {
    /// Create a compressor. The level is validated before anything else.
    pub fn compressor(algorithm: Algorithm, level: u32) -> Result<Self, CodecError> {
        let level = algorithm.check_level(level)?;
        let transform: Box<dyn ChunkTransform> = match algorithm {
            Algorithm::Gzip => Box::new(GzipCompressor::new(level)),
            Algorithm::Bzip => Box::new(BzipCompressor::new(level)),
            Algorithm::Lzma => Box::new(LzmaCompressor::new(level)),
        };
        Ok(Self {
            algorithm,
            direction: Direction::Compress,
            transform,
        })
    }

    pub fn decompressor(algorithm: Algorithm) -> Result<Self, CodecError> {
        let transform: Box<dyn ChunkTransform> = match algorithm {
            Algorithm::Gzip => Box::new(GzipDecompressor::new()),
            Algorithm::Bzip => Box::new(BzipDecompressor::new()),
            Algorithm::Lzma => Box::new(LzmaDecompressor::new()?),
        };
        Ok(Self {
            algorithm,
            direction: Direction::Decompress,
            transform,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<Bytes, CodecError> {
        self.transform.feed(chunk)
    }

    pub fn flush(self) -> Result<Bytes, CodecError> {
        self.transform.flush()
    }
}

impl fmt::Debug for ChunkCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkCodec")
            .field("algorithm", &self.algorithm)
            .field("direction", &self.direction)
            .field("backend", &self.transform.name())
            .finish()
    }
}

/// Validated codec settings for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSpec {
    pub algorithm: Algorithm,
    pub direction: Direction,
    pub level: u32,
    pub encoding: Option<TextEncoding>,
}

impl CodecSpec {
    pub fn compress(
        algorithm: Algorithm,
        level: u32,
        encoding: Option<TextEncoding>,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            algorithm,
            direction: Direction::Compress,
            level: algorithm.check_level(level)?,
            encoding,
        })
    }

    pub fn decompress(algorithm: Algorithm, encoding: Option<TextEncoding>) -> Self {
        Self {
            algorithm,
            direction: Direction::Decompress,
            level: DEFAULT_LEVEL,
            encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_algorithm_aliases() {
        let cases = [
            ("gzip", Algorithm::Gzip),
            ("GZ", Algorithm::Gzip),
            ("zlib", Algorithm::Gzip),
            ("bzip", Algorithm::Bzip),
            ("bz2", Algorithm::Bzip),
            ("bzip2", Algorithm::Bzip),
            ("lzma", Algorithm::Lzma),
            ("xz", Algorithm::Lzma),
        ];
        for (name, expected) in cases {
            assert_eq!(name.parse::<Algorithm>().unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn test_unsupported_algorithm() {
        let err = "zstd".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedAlgorithm { ref name } if name == "zstd"));
        assert!(err.to_string().contains("zstd"));
    }

    #[test]
    fn test_algorithm_from_path() {
        assert_eq!(Algorithm::from_path(&PathBuf::from("log.gz")), Some(Algorithm::Gzip));
        assert_eq!(Algorithm::from_path(&PathBuf::from("a/b.BZ2")), Some(Algorithm::Bzip));
        assert_eq!(Algorithm::from_path(&PathBuf::from("c.bz")), Some(Algorithm::Bzip));
        assert_eq!(Algorithm::from_path(&PathBuf::from("d.tar.xz")), Some(Algorithm::Lzma));
        assert_eq!(Algorithm::from_path(&PathBuf::from("e.lzma")), Some(Algorithm::Lzma));
        assert_eq!(Algorithm::from_path(&PathBuf::from("plain.txt")), None);
        assert_eq!(Algorithm::from_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn test_level_ranges() {
        assert!(ChunkCodec::compressor(Algorithm::Gzip, 0).is_ok());
        assert!(ChunkCodec::compressor(Algorithm::Lzma, 9).is_ok());
        assert!(matches!(
            ChunkCodec::compressor(Algorithm::Bzip, 0),
            Err(CodecError::InvalidLevel { min: 1, max: 9, .. })
        ));
        assert!(matches!(
            CodecSpec::compress(Algorithm::Gzip, 10, None),
            Err(CodecError::InvalidLevel { level: 10, .. })
        ));
    }

    #[test]
    fn test_chunk_codec_roundtrip_all_algorithms() {
        let data = b"abcdefghij".repeat(100);
        for algorithm in Algorithm::ALL {
            let mut compressor = ChunkCodec::compressor(algorithm, DEFAULT_LEVEL).unwrap();
            assert_eq!(compressor.direction(), Direction::Compress);
            let mut compressed = Vec::new();
            for chunk in data.chunks(7) {
                compressed.extend_from_slice(&compressor.feed(chunk).unwrap());
            }
            compressed.extend_from_slice(&compressor.flush().unwrap());

            let mut decompressor = ChunkCodec::decompressor(algorithm).unwrap();
            let mut restored = Vec::new();
            for chunk in compressed.chunks(5) {
                restored.extend_from_slice(&decompressor.feed(chunk).unwrap());
            }
            restored.extend_from_slice(&decompressor.flush().unwrap());
            assert_eq!(restored, data, "{algorithm}");
        }
    }
}
