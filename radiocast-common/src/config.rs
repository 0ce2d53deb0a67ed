//! Configuration loading for the Radiocast relay
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (applied by the binary, highest priority)
//! 2. Environment variables (`RADIOCAST_*`)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error: the relay starts with defaults and
//! `loaded_from` stays `None`. A config file that exists but fails to parse is an error.

use crate::stations::validate_stream_url;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "RADIOCAST_CONFIG";
/// Environment variable overriding `server.port`
pub const PORT_ENV: &str = "RADIOCAST_PORT";
/// Environment variable overriding `logging.level`
pub const LOG_LEVEL_ENV: &str = "RADIOCAST_LOG_LEVEL";
/// Environment variable overriding `decoder.ffmpeg_path`
pub const FFMPEG_ENV: &str = "RADIOCAST_FFMPEG";
/// Environment variable overriding `output.directory`
pub const OUTPUT_DIR_ENV: &str = "RADIOCAST_OUTPUT_DIR";
/// Environment variable setting `output.custom_stations_file`
pub const STATIONS_FILE_ENV: &str = "RADIOCAST_STATIONS_FILE";

/// Public radio-browser station search endpoint
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://de1.api.radio-browser.info/json/stations/search";

/// Default HTTP control port
pub const DEFAULT_PORT: u16 = 5780;

/// Log verbosity accepted by the relay
///
/// Parsing is case-insensitive; unknown names are rejected rather than
/// silently mapped to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(Error::Config(format!("log level {} is not valid", value))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP control server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// HTTP server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// External decoder process settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Path to (or name of) the ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// How long a freshly spawned decoder may take to produce its first PCM bytes
    pub startup_timeout_ms: u64,

    /// Value passed to ffmpeg's `-loglevel`
    pub log_level: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            startup_timeout_ms: 10_000,
            log_level: "warning".to_string(),
        }
    }
}

/// Per-room session settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle interval between pause polls
    pub pause_poll_interval_ms: u64,

    /// Encoded frames the transport queue holds before applying backpressure
    pub sink_queue_frames: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pause_poll_interval_ms: 1000,
            sink_queue_frames: 4,
        }
    }
}

/// Where the file transport writes per-room packet streams
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,

    /// JSON file runtime-added stations are saved to (not saved when unset)
    pub custom_stations_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("radiocast-output"),
            custom_stations_file: None,
        }
    }
}

/// Online station directory lookups
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// radio-browser compatible `stations/search` URL
    pub endpoint: String,

    /// Whole-request timeout for a search
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub decoder: DecoderConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,

    /// Extra named stations (name -> stream URL)
    pub stations: BTreeMap<String, String>,

    /// File the configuration was read from (None when running on defaults)
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

impl RelayConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RelayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve configuration from file and environment
    ///
    /// An explicit `cli_path` must exist. Without one, the standard locations
    /// are searched and defaults are used when nothing is found.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        let path = cli_path.map(Path::to_path_buf).or_else(locate_config_file);
        let mut config = match &path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.loaded_from = path;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RADIOCAST_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var(PORT_ENV) {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a valid port: {}", PORT_ENV, port)))?;
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            self.logging.level = level.parse()?;
        }
        if let Ok(path) = std::env::var(FFMPEG_ENV) {
            self.decoder.ffmpeg_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            self.output.directory = PathBuf::from(dir);
        }
        if let Ok(file) = std::env::var(STATIONS_FILE_ENV) {
            self.output.custom_stations_file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    /// Reject values the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.decoder.startup_timeout_ms == 0 {
            return Err(Error::Config(
                "decoder.startup_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.session.pause_poll_interval_ms == 0 {
            return Err(Error::Config(
                "session.pause_poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.session.sink_queue_frames == 0 {
            return Err(Error::Config(
                "session.sink_queue_frames must be greater than 0".to_string(),
            ));
        }
        if self.search.timeout_ms == 0 {
            return Err(Error::Config(
                "search.timeout_ms must be greater than 0".to_string(),
            ));
        }
        validate_stream_url(&self.search.endpoint)
            .map_err(|e| Error::Config(format!("search.endpoint: {}", e)))?;
        Ok(())
    }
}

/// Find a config file in the standard locations
///
/// Order: `RADIOCAST_CONFIG`, the user config directory, then `/etc` on Linux.
pub fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("radiocast").join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/radiocast/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
