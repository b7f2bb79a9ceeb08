//! Configuration shared by the dataphile commands.
//!
//! Every key is optional in the YAML file; command-line flags override
//! whatever the file provides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{ConfigError, ReadFileSnafu, YamlParseSnafu};

/// Byte size constants (binary/IEC units).
pub const KB: usize = 1024;
pub const MB: usize = 1024 * KB;

/// Defaults shared by the stream, compress and decompress commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Bytes per read; each command picks its own default when unset.
    #[serde(default)]
    pub buffer_size: Option<usize>,
    /// Delay between passes over live sources, in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// How long a watch poll waits for the next path, in milliseconds.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Compression level passed through to the codec.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Text encoding applied at the codec boundary (e.g. "utf-8").
    #[serde(default)]
    pub encoding: Option<String>,
    /// Extend every read through the next newline.
    #[serde(default)]
    pub line_aligned: bool,
}

fn default_latency_ms() -> u64 {
    100
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

fn default_level() -> u32 {
    6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: None,
            latency_ms: default_latency_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            level: default_level(),
            encoding: None,
            line_aligned: false,
        }
    }
}

impl Config {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !is_yaml_file(path) {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults"
        let config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(contents).context(YamlParseSnafu)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that can never produce a working stream.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == Some(0) {
            return Err(ConfigError::ZeroBufferSize);
        }
        if self.latency_ms == 0 {
            return Err(ConfigError::ZeroLatency);
        }
        if self.poll_timeout_ms == 0 {
            return Err(ConfigError::ZeroPollTimeout);
        }
        Ok(())
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.latency(), Duration::from_millis(100));
        assert_eq!(config.poll_timeout(), Duration::from_secs(1));
        assert_eq!(config.level, 6);
        assert!(config.buffer_size.is_none());
    }

    #[test]
    fn test_config_yaml_parsing() {
        let yaml = r#"
buffer_size: 4096
latency_ms: 250
poll_timeout_ms: 50
level: 9
encoding: utf-8
line_aligned: true
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.buffer_size, Some(4096));
        assert_eq!(config.latency(), Duration::from_millis(250));
        assert_eq!(config.poll_timeout(), Duration::from_millis(50));
        assert_eq!(config.level, 9);
        assert_eq!(config.encoding.as_deref(), Some("utf-8"));
        assert!(config.line_aligned);
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let result = Config::parse("buffersize: 10\n");
        assert!(matches!(result, Err(ConfigError::YamlParse { .. })));
    }

    #[test]
    fn test_config_rejects_zero_values() {
        assert!(matches!(
            Config::parse("buffer_size: 0\n"),
            Err(ConfigError::ZeroBufferSize)
        ));
        assert!(matches!(
            Config::parse("latency_ms: 0\n"),
            Err(ConfigError::ZeroLatency)
        ));
        assert!(matches!(
            Config::parse("poll_timeout_ms: 0\n"),
            Err(ConfigError::ZeroPollTimeout)
        ));
    }

    #[test]
    fn test_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dataphile.yaml");
        std::fs::write(&path, "level: 3\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.level, 3);
    }

    #[test]
    fn test_config_from_file_wrong_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dataphile.toml");
        std::fs::write(&path, "level = 3\n").unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/dataphile.yml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_is_yaml_file() {
        assert!(is_yaml_file(Path::new("a.yaml")));
        assert!(is_yaml_file(Path::new("dir/a.yml")));
        assert!(!is_yaml_file(Path::new("a.json")));
        assert!(!is_yaml_file(Path::new("yaml")));
    }
}
