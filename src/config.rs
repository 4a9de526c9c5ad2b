//! Configuration file handling for connect-cam.
//!
//! Loads configuration from `~/.config/connect-cam/config.toml` or a custom path.
//! Command-line arguments take precedence over the file, and the file over
//! built-in defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::agent::{floor_interval, DEFAULT_INTERVAL_SECS};
use crate::camera::{Resolution, DEFAULT_CAMERA_NAME};
use crate::capture::{DEFAULT_FFMPEG, DEFAULT_INPUT_FORMAT, DEFAULT_QUALITY};
use crate::connect::{CONNECT_API_BASE_URL, CONNECT_TOKEN_ENV, DEFAULT_FINGERPRINT};
use crate::devices::DEFAULT_DEVICE_DIR;

/// Configuration file structure for connect-cam.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub connect: ConnectConfig,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub capture: CaptureSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConnectConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CameraSection {
    pub index: Option<usize>,
    pub name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub device_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CaptureSection {
    /// Seconds between cycles.
    pub interval: Option<i64>,
    pub ffmpeg: Option<String>,
    pub input_format: Option<String>,
    pub quality: Option<u8>,
}

impl Config {
    /// Load configuration from the default path.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from a path the user asked for explicitly.
    /// Unlike [`Config::load`], a missing file is an error.
    pub fn load_from_explicit(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Self::load_from(path)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Values supplied on the command line, before merging.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub token: Option<String>,
    pub camera_index: Option<usize>,
    /// Already floored to the minimum.
    pub interval: Option<u64>,
    pub base_url: Option<String>,
}

/// Fully resolved settings used to build the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub token: String,
    pub fingerprint: String,
    pub base_url: String,
    pub camera_index: Option<usize>,
    pub interval_secs: u64,
    pub camera_name: String,
    pub resolution: Resolution,
    pub device_dir: PathBuf,
    pub ffmpeg: String,
    pub input_format: String,
    pub quality: u8,
}

impl Settings {
    /// Merge CLI values, the token environment value and the config file.
    ///
    /// Token precedence: CLI > environment > config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingToken` if no source provides a non-blank token.
    pub fn resolve(
        cli: CliOverrides,
        env_token: Option<String>,
        config: Config,
    ) -> Result<Self, ConfigError> {
        // Blank values are treated as unset so they don't hide a lower-priority token.
        let present = |t: &String| !t.trim().is_empty();
        let token = cli
            .token
            .filter(present)
            .or(env_token.filter(present))
            .or(config.connect.token.filter(present))
            .ok_or(ConfigError::MissingToken)?;

        let defaults = Resolution::default();
        let resolution = Resolution {
            width: config.camera.width.unwrap_or(defaults.width),
            height: config.camera.height.unwrap_or(defaults.height),
        };

        let interval_secs = cli
            .interval
            .or(config.capture.interval.map(floor_interval))
            .unwrap_or(DEFAULT_INTERVAL_SECS);

        Ok(Self {
            token,
            fingerprint: config
                .connect
                .fingerprint
                .unwrap_or_else(|| DEFAULT_FINGERPRINT.to_string()),
            base_url: cli
                .base_url
                .or(config.connect.base_url)
                .unwrap_or_else(|| CONNECT_API_BASE_URL.to_string()),
            camera_index: cli.camera_index.or(config.camera.index),
            interval_secs,
            camera_name: config
                .camera
                .name
                .unwrap_or_else(|| DEFAULT_CAMERA_NAME.to_string()),
            resolution,
            device_dir: config
                .camera
                .device_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE_DIR)),
            ffmpeg: config
                .capture
                .ffmpeg
                .unwrap_or_else(|| DEFAULT_FFMPEG.to_string()),
            input_format: config
                .capture
                .input_format
                .unwrap_or_else(|| DEFAULT_INPUT_FORMAT.to_string()),
            quality: config.capture.quality.unwrap_or(DEFAULT_QUALITY),
        })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Camera token not provided. Pass it as the first argument or set {}", CONNECT_TOKEN_ENV)]
    MissingToken,
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("connect-cam").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/connect-cam/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token() -> CliOverrides {
        CliOverrides {
            token: Some("cli-token".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
[connect]
base_url = "http://localhost:8080"
token = "file-token"
fingerprint = "bench-cam"

[camera]
index = 1
name = "Bed cam"
width = 1280
height = 720
device_dir = "/tmp/dev"

[capture]
interval = 10
ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
input_format = "yuyv422"
quality = 3
"#,
        )
        .unwrap();

        assert_eq!(config.connect.token.as_deref(), Some("file-token"));
        assert_eq!(config.camera.index, Some(1));
        assert_eq!(config.camera.width, Some(1280));
        assert_eq!(config.capture.interval, Some(10));
        assert_eq!(config.capture.quality, Some(3));
    }

    #[test]
    fn test_parse_empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(Config::parse("[camera]\nmirror = true\n").is_err());
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(with_token(), None, Config::default()).unwrap();
        assert_eq!(settings.token, "cli-token");
        assert_eq!(settings.fingerprint, DEFAULT_FINGERPRINT);
        assert_eq!(settings.base_url, CONNECT_API_BASE_URL);
        assert_eq!(settings.camera_index, None);
        assert_eq!(settings.interval_secs, 30);
        assert_eq!(settings.camera_name, "Prusa Pi Camera");
        assert_eq!(settings.resolution, Resolution::FULL_HD);
        assert_eq!(settings.device_dir, PathBuf::from("/dev"));
        assert_eq!(settings.ffmpeg, "ffmpeg");
        assert_eq!(settings.input_format, "mjpeg");
        assert_eq!(settings.quality, 5);
    }

    #[test]
    fn test_resolve_token_precedence() {
        let mut config = Config::default();
        config.connect.token = Some("file-token".to_string());

        let settings =
            Settings::resolve(with_token(), Some("env-token".to_string()), config.clone()).unwrap();
        assert_eq!(settings.token, "cli-token");

        let settings = Settings::resolve(
            CliOverrides::default(),
            Some("env-token".to_string()),
            config.clone(),
        )
        .unwrap();
        assert_eq!(settings.token, "env-token");

        let settings = Settings::resolve(CliOverrides::default(), None, config).unwrap();
        assert_eq!(settings.token, "file-token");
    }

    #[test]
    fn test_resolve_blank_env_token_falls_back_to_config() {
        let mut config = Config::default();
        config.connect.token = Some("file-token".to_string());

        let settings =
            Settings::resolve(CliOverrides::default(), Some(String::new()), config.clone())
                .unwrap();
        assert_eq!(settings.token, "file-token");

        let settings =
            Settings::resolve(CliOverrides::default(), Some("   ".to_string()), config).unwrap();
        assert_eq!(settings.token, "file-token");
    }

    #[test]
    fn test_resolve_blank_cli_token_falls_back_to_env() {
        let blank = CliOverrides {
            token: Some(" ".to_string()),
            ..Default::default()
        };
        let settings =
            Settings::resolve(blank, Some("env-token".to_string()), Config::default()).unwrap();
        assert_eq!(settings.token, "env-token");
    }

    #[test]
    fn test_resolve_missing_token() {
        let result = Settings::resolve(CliOverrides::default(), None, Config::default());
        assert!(matches!(result, Err(ConfigError::MissingToken)));

        let blank = CliOverrides {
            token: Some("  ".to_string()),
            ..Default::default()
        };
        let result = Settings::resolve(blank, None, Config::default());
        assert!(matches!(result, Err(ConfigError::MissingToken)));
    }

    #[test]
    fn test_resolve_cli_overrides_file() {
        let mut config = Config::default();
        config.camera.index = Some(2);
        config.capture.interval = Some(60);
        config.connect.base_url = Some("http://file".to_string());

        let cli = CliOverrides {
            camera_index: Some(0),
            interval: Some(5),
            base_url: Some("http://cli".to_string()),
            ..with_token()
        };
        let settings = Settings::resolve(cli, None, config).unwrap();
        assert_eq!(settings.camera_index, Some(0));
        assert_eq!(settings.interval_secs, 5);
        assert_eq!(settings.base_url, "http://cli");
    }

    #[test]
    fn test_resolve_floors_file_interval() {
        let mut config = Config::default();
        config.capture.interval = Some(0);
        let settings = Settings::resolve(with_token(), None, config).unwrap();
        assert_eq!(settings.interval_secs, 1);
    }

    #[test]
    fn test_load_from_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from_explicit(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_from_explicit_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[capture]\ninterval = 15\n").unwrap();

        let config = Config::load_from_explicit(&path).unwrap();
        assert_eq!(config.capture.interval, Some(15));
    }

    #[test]
    fn test_load_from_explicit_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[capture\n").unwrap();

        let err = Config::load_from_explicit(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = default_path();
        assert!(path.ends_with("connect-cam/config.toml"));
    }
}
