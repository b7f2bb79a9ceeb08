//! Command-line arguments for the `dataphile` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use dataphile_core::{Config, ConfigError, MB};

use crate::codec::{Algorithm, CodecSpec, TextEncoding};
use crate::error::{CodecError, PipelineError};
use crate::source::SourceSetConfig;

/// Default read size for `stream`, in MB.
pub const STREAM_BUFFER_MB: f64 = 0.256;

/// Default read size for `compress` and `decompress`, in MB.
pub const CODEC_BUFFER_MB: f64 = 1.0;

#[derive(Parser, Debug)]
#[command(name = "dataphile", version, about = "Stream, compress and decompress files")]
pub struct CliArgs {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy files (or standard input) to standard output
    Stream(StreamArgs),
    /// Compress files (or standard input) to standard output
    Compress(CompressArgs),
    /// Decompress files (or standard input) to standard output
    Decompress(DecompressArgs),
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Files to read, in order (standard input when omitted)
    pub files: Vec<PathBuf>,

    /// Buffer size in MB
    #[arg(short = 'b', long = "buffer-size", value_name = "MB")]
    pub buffer_size: Option<f64>,

    /// Keep reading as files grow
    #[arg(short, long)]
    pub live: bool,

    /// Read new file paths from standard input (requires --live)
    #[arg(short, long, requires = "live")]
    pub watch: bool,

    /// Seconds to wait between passes in live mode
    #[arg(long, value_name = "SECS")]
    pub latency: Option<f64>,

    /// Extend every chunk through the next newline
    #[arg(long)]
    pub lines: bool,
}

#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Files to compress, in order (standard input when omitted)
    pub files: Vec<PathBuf>,

    /// Buffer size in MB
    #[arg(short = 'b', long = "buffer-size", value_name = "MB")]
    pub buffer_size: Option<f64>,

    #[command(flatten)]
    pub algorithm: AlgorithmArgs,

    /// Compression level (gzip 0-9, bzip 1-9, lzma 0-9)
    #[arg(long)]
    pub level: Option<u32>,

    /// Validate input as this text encoding
    #[arg(long, value_name = "NAME")]
    pub encoding: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecompressArgs {
    /// Files to decompress, in order (standard input when omitted)
    pub files: Vec<PathBuf>,

    /// Buffer size in MB
    #[arg(short = 'b', long = "buffer-size", value_name = "MB")]
    pub buffer_size: Option<f64>,

    #[command(flatten)]
    pub algorithm: AlgorithmArgs,

    /// Decode output as this text encoding
    #[arg(long, value_name = "NAME")]
    pub encoding: Option<String>,
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct AlgorithmArgs {
    /// Use gzip
    #[arg(long)]
    pub gzip: bool,

    /// Use bzip2
    #[arg(long)]
    pub bzip: bool,

    /// Use xz/lzma
    #[arg(long)]
    pub lzma: bool,

    /// Algorithm by name (gzip, gz, zlib, bzip, bz2, bzip2, lzma, xz)
    #[arg(short = 'a', long = "algorithm", value_name = "NAME")]
    pub name: Option<String>,
}

impl AlgorithmArgs {
    /// The algorithm chosen on the command line, if any.
    pub fn selected(&self) -> Result<Option<Algorithm>, CodecError> {
        if self.gzip {
            return Ok(Some(Algorithm::Gzip));
        }
        if self.bzip {
            return Ok(Some(Algorithm::Bzip));
        }
        if self.lzma {
            return Ok(Some(Algorithm::Lzma));
        }
        self.name.as_deref().map(str::parse::<Algorithm>).transpose()
    }
}

/// Everything needed to run one command.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub sources: SourceSetConfig,
    pub codec: Option<CodecSpec>,
    pub buffer_size: usize,
}

impl CliArgs {
    /// Load the configuration file, or defaults when none was given.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        match &self.config {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Combine flags with `config`; flags win.
    pub fn plan(&self, config: &Config) -> Result<RunPlan, PipelineError> {
        match &self.command {
            Command::Stream(args) => {
                let latency = match args.latency {
                    Some(secs) => seconds(secs)?,
                    None => config.latency(),
                };
                let sources = SourceSetConfig {
                    paths: args.files.clone(),
                    live: args.live,
                    watch: args.watch,
                    latency,
                    poll_timeout: config.poll_timeout(),
                    line_aligned: args.lines || config.line_aligned,
                };
                Ok(RunPlan {
                    sources,
                    codec: None,
                    buffer_size: buffer_size(args.buffer_size, config, STREAM_BUFFER_MB)?,
                })
            }
            Command::Compress(args) => {
                let algorithm = args.algorithm.selected()?.unwrap_or(Algorithm::Gzip);
                let level = args.level.unwrap_or(config.level);
                let encoding = encoding(args.encoding.as_deref(), config)?;
                Ok(RunPlan {
                    sources: file_sources(&args.files, config),
                    codec: Some(CodecSpec::compress(algorithm, level, encoding)?),
                    buffer_size: buffer_size(args.buffer_size, config, CODEC_BUFFER_MB)?,
                })
            }
            Command::Decompress(args) => {
                let algorithm = match args.algorithm.selected()? {
                    Some(algorithm) => algorithm,
                    None => infer_algorithm(&args.files)?,
                };
                let encoding = encoding(args.encoding.as_deref(), config)?;
                Ok(RunPlan {
                    sources: file_sources(&args.files, config),
                    codec: Some(CodecSpec::decompress(algorithm, encoding)),
                    buffer_size: buffer_size(args.buffer_size, config, CODEC_BUFFER_MB)?,
                })
            }
        }
    }
}

fn file_sources(files: &[PathBuf], config: &Config) -> SourceSetConfig {
    SourceSetConfig {
        paths: files.to_vec(),
        latency: config.latency(),
        poll_timeout: config.poll_timeout(),
        ..Default::default()
    }
}

/// Buffer size in bytes: the flag, else the config file, else `default_mb`.
fn buffer_size(flag_mb: Option<f64>, config: &Config, default_mb: f64) -> Result<usize, ConfigError> {
    let bytes = match (flag_mb, config.buffer_size) {
        (Some(mb), _) => mb_to_bytes(mb)?,
        (None, Some(bytes)) => bytes,
        (None, None) => mb_to_bytes(default_mb)?,
    };
    if bytes == 0 {
        return Err(ConfigError::ZeroBufferSize);
    }
    Ok(bytes)
}

fn mb_to_bytes(mb: f64) -> Result<usize, ConfigError> {
    if !mb.is_finite() || mb <= 0.0 {
        return Err(ConfigError::ZeroBufferSize);
    }
    Ok((mb * MB as f64) as usize)
}

fn seconds(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::ZeroLatency);
    }
    Ok(Duration::from_secs_f64(secs))
}

fn encoding(flag: Option<&str>, config: &Config) -> Result<Option<TextEncoding>, CodecError> {
    flag.or(config.encoding.as_deref())
        .map(str::parse::<TextEncoding>)
        .transpose()
}

/// Pick the algorithm from file extensions, falling back to gzip.
///
/// Files without a recognised extension do not vote; files that disagree
/// are an error.
pub fn infer_algorithm(files: &[PathBuf]) -> Result<Algorithm, CodecError> {
    let mut inferred: Option<Algorithm> = None;
    for algorithm in files.iter().filter_map(|path| Algorithm::from_path(path)) {
        match inferred {
            Some(first) if first != algorithm => {
                return Err(CodecError::MixedAlgorithms {
                    first: first.name(),
                    second: algorithm.name(),
                });
            }
            _ => inferred = Some(algorithm),
        }
    }
    Ok(inferred.unwrap_or(Algorithm::Gzip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Direction;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("dataphile").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_stream_defaults() {
        let plan = parse(&["stream"]).plan(&Config::default()).unwrap();
        assert!(plan.codec.is_none());
        assert!(plan.sources.paths.is_empty());
        assert!(!plan.sources.live);
        assert_eq!(plan.buffer_size, (0.256 * MB as f64) as usize);
        assert_eq!(plan.sources.latency, Duration::from_millis(100));
    }

    #[test]
    fn test_stream_live_watch_flags() {
        let plan = parse(&["stream", "-l", "-w", "--latency", "0.5", "--lines", "a.log"])
            .plan(&Config::default())
            .unwrap();
        assert!(plan.sources.live);
        assert!(plan.sources.watch);
        assert!(plan.sources.line_aligned);
        assert_eq!(plan.sources.latency, Duration::from_millis(500));
        assert_eq!(plan.sources.paths, vec![PathBuf::from("a.log")]);
    }

    #[test]
    fn test_watch_requires_live() {
        let result = CliArgs::try_parse_from(["dataphile", "stream", "--watch"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_compress_flags() {
        let plan = parse(&["compress", "--bzip", "--level", "9", "-b", "2", "x.txt"])
            .plan(&Config::default())
            .unwrap();
        let codec = plan.codec.unwrap();
        assert_eq!(codec.algorithm, Algorithm::Bzip);
        assert_eq!(codec.direction, Direction::Compress);
        assert_eq!(codec.level, 9);
        assert_eq!(plan.buffer_size, 2 * MB);
    }

    #[test]
    fn test_compress_rejects_bad_level() {
        let result = parse(&["compress", "--bzip", "--level", "0"]).plan(&Config::default());
        assert!(matches!(
            result,
            Err(PipelineError::Codec {
                source: CodecError::InvalidLevel { .. }
            })
        ));
    }

    #[test]
    fn test_algorithm_flags_are_exclusive() {
        let result = CliArgs::try_parse_from(["dataphile", "compress", "--gzip", "--lzma"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_algorithm_by_name() {
        let plan = parse(&["compress", "-a", "xz"]).plan(&Config::default()).unwrap();
        assert_eq!(plan.codec.unwrap().algorithm, Algorithm::Lzma);

        let result = parse(&["compress", "-a", "rar"]).plan(&Config::default());
        assert!(matches!(
            result,
            Err(PipelineError::Codec {
                source: CodecError::UnsupportedAlgorithm { .. }
            })
        ));
    }

    #[test]
    fn test_decompress_infers_algorithm() {
        let plan = parse(&["decompress", "a.bz2", "b.BZ2"])
            .plan(&Config::default())
            .unwrap();
        let codec = plan.codec.unwrap();
        assert_eq!(codec.algorithm, Algorithm::Bzip);
        assert_eq!(codec.direction, Direction::Decompress);
        assert_eq!(plan.buffer_size, MB);

        let plan = parse(&["decompress", "unknown.bin"])
            .plan(&Config::default())
            .unwrap();
        assert_eq!(plan.codec.unwrap().algorithm, Algorithm::Gzip);
    }

    #[test]
    fn test_decompress_mixed_extensions() {
        let result = parse(&["decompress", "a.gz", "b.xz"]).plan(&Config::default());
        assert!(matches!(
            result,
            Err(PipelineError::Codec {
                source: CodecError::MixedAlgorithms { first: "gzip", second: "lzma" }
            })
        ));
    }

    #[test]
    fn test_config_file_values_apply_when_flags_absent() {
        let config = Config {
            buffer_size: Some(4096),
            level: 1,
            encoding: Some("ascii".to_string()),
            ..Config::default()
        };
        let plan = parse(&["compress"]).plan(&config).unwrap();
        let codec = plan.codec.unwrap();
        assert_eq!(plan.buffer_size, 4096);
        assert_eq!(codec.level, 1);
        assert_eq!(codec.encoding, Some(TextEncoding::Ascii));

        let plan = parse(&["compress", "--level", "3", "-b", "0.5"]).plan(&config).unwrap();
        assert_eq!(plan.codec.unwrap().level, 3);
        assert_eq!(plan.buffer_size, MB / 2);
    }

    #[test]
    fn test_non_positive_buffer_size() {
        let result = parse(&["stream", "-b", "0"]).plan(&Config::default());
        assert!(matches!(
            result,
            Err(PipelineError::Config {
                source: ConfigError::ZeroBufferSize
            })
        ));
    }
}
