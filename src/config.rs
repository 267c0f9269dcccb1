use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::subtitles::{DisplayMode, MERGE_TOLERANCE_SECONDS};
use crate::sync::{SyncSettings, AUTO_SCROLL_QUIET_PERIOD, LOOP_TAIL_SECONDS};

/// Configuration for the EchoLine player core and management server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Media directory layout
    pub media: MediaConfig,

    /// Preview image extraction
    pub thumbnails: ThumbnailConfig,

    /// Subtitle sync tuning
    pub player: PlayerConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory served as the site root
    pub root_dir: PathBuf,

    /// Largest accepted multipart body in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Video directory, relative to the root
    pub videos_dir: String,

    /// Transcript directory, relative to the root
    pub subtitles_dir: String,

    /// Catalog file, relative to the root
    pub catalog_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Generate a preview when a video is added or replaced
    pub enabled: bool,

    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// Video position the frame is taken from
    pub seek_seconds: f64,

    /// Give up on ffmpeg after this long
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Auto-scroll is suppressed this long after a manual scroll
    pub scroll_quiet_period_ms: u64,

    /// Overrun past a cue end before loops rewind
    pub loop_tail_seconds: f64,

    /// Start-time tolerance for pairing the two tracks
    pub merge_tolerance_seconds: f64,

    /// Display mode a freshly opened episode starts in
    pub default_display_mode: DisplayMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    pub level: String,
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Environment,
    Defaults,
}

/// Result of [`Config::load`], with the messages gathered along the way.
///
/// Loading happens before the subscriber exists, so the messages are kept
/// here and emitted by [`LoadedConfig::log`] once logging is installed.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
        match &self.source {
            ConfigSource::File(path) => {
                tracing::info!("📄 Loaded configuration from: {}", path.display())
            }
            ConfigSource::Environment => tracing::info!("📄 Loaded configuration from environment"),
            ConfigSource::Defaults => tracing::info!("Using default configuration"),
        }
    }
}

impl Config {
    /// Load configuration from the standard file locations, then the environment
    pub fn load() -> LoadedConfig {
        Self::load_from(&["echoline.toml", "config/echoline.toml"])
    }

    /// First parseable file in `config_paths`, else environment, else defaults
    pub fn load_from<P: AsRef<std::path::Path>>(config_paths: &[P]) -> LoadedConfig {
        let mut warnings = Vec::new();

        for path in config_paths {
            let path = path.as_ref();
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        return LoadedConfig {
                            config,
                            source: ConfigSource::File(path.to_path_buf()),
                            warnings,
                        };
                    }
                    Err(e) => {
                        warnings.push(format!("Failed to parse config file {}: {}", path.display(), e));
                    }
                }
            }
        }

        match Self::from_env() {
            Ok(config) => LoadedConfig {
                config,
                source: ConfigSource::Environment,
                warnings,
            },
            Err(e) => {
                warnings.push(format!("Failed to load config, using defaults: {}", e));
                LoadedConfig {
                    config: Self::default(),
                    source: ConfigSource::Defaults,
                    warnings,
                }
            }
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        let mut found = false;

        if let Ok(port) = std::env::var("ECHOLINE_PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| anyhow!("Invalid ECHOLINE_PORT `{}`: {}", port, e))?;
            found = true;
        }

        if let Ok(root) = std::env::var("ECHOLINE_ROOT") {
            config.server.root_dir = PathBuf::from(root);
            found = true;
        }

        if let Ok(level) = std::env::var("ECHOLINE_LOG_LEVEL") {
            config.logging.level = level;
            found = true;
        }

        if let Ok(ffmpeg) = std::env::var("ECHOLINE_FFMPEG") {
            config.thumbnails.ffmpeg_path = ffmpeg;
            found = true;
        }

        if found {
            Ok(config)
        } else {
            Err(anyhow!("No configuration file or environment overrides found"))
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than 0"));
        }

        for (name, dir) in [
            ("videos_dir", &self.media.videos_dir),
            ("subtitles_dir", &self.media.subtitles_dir),
            ("catalog_file", &self.media.catalog_file),
        ] {
            if dir.trim().is_empty() || dir.contains("..") {
                return Err(anyhow!("{} must be a plain relative path", name));
            }
        }

        if self.thumbnails.timeout_seconds == 0 {
            return Err(anyhow!("thumbnail timeout must be greater than 0"));
        }

        if self.player.merge_tolerance_seconds <= 0.0 {
            return Err(anyhow!("merge_tolerance_seconds must be positive"));
        }

        if self.player.loop_tail_seconds < 0.0 {
            return Err(anyhow!("loop_tail_seconds cannot be negative"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Sync controller settings derived from the player section
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            scroll_quiet_period: Duration::from_millis(self.player.scroll_quiet_period_ms),
            loop_tail_seconds: self.player.loop_tail_seconds,
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.server.root_dir.join(&self.media.catalog_file)
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "EchoLine Configuration:\n\
            - Listen: {}:{}\n\
            - Root Directory: {}\n\
            - Catalog: {}\n\
            - Upload Limit: {} bytes\n\
            - Thumbnails: {} ({})\n\
            - Merge Tolerance: {:.2}s",
            self.server.host,
            self.server.port,
            self.server.root_dir.display(),
            self.media.catalog_file,
            self.server.max_upload_bytes,
            if self.thumbnails.enabled { "enabled" } else { "disabled" },
            self.thumbnails.ffmpeg_path,
            self.player.merge_tolerance_seconds,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                root_dir: PathBuf::from("."),
                max_upload_bytes: 2 * 1024 * 1024 * 1024, // 2GB
            },
            media: MediaConfig {
                videos_dir: "videos".to_string(),
                subtitles_dir: "subtitles".to_string(),
                catalog_file: "data/episodes.json".to_string(),
            },
            thumbnails: ThumbnailConfig {
                enabled: true,
                ffmpeg_path: "ffmpeg".to_string(),
                seek_seconds: 5.0,
                timeout_seconds: 15,
            },
            player: PlayerConfig {
                scroll_quiet_period_ms: AUTO_SCROLL_QUIET_PERIOD.as_millis() as u64,
                loop_tail_seconds: LOOP_TAIL_SECONDS,
                merge_tolerance_seconds: MERGE_TOLERANCE_SECONDS,
                default_display_mode: DisplayMode::Primary,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_root_dir(mut self, dir: PathBuf) -> Self {
        self.config.server.root_dir = dir;
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.config.thumbnails.ffmpeg_path = path.into();
        self
    }

    pub fn enable_thumbnails(mut self, enable: bool) -> Self {
        self.config.thumbnails.enabled = enable;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.server.max_upload_bytes = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
