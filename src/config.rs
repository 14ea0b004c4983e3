//! flashcam runtime configuration handling

use crate::error::{Error, Result};
use crate::flash::{CameraFacing, DEFAULT_OVERLAY_OPACITY};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Camera start-up options
    pub camera: CameraOptions,
    /// Transient display and screen flash options
    pub display: DisplayOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl AppConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No flashcam.toml / flashcam.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["flashcam.toml", "flashcam.yaml", "flashcam.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("flashcam");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.camera.apply_env_overrides();
        self.display.apply_env_overrides();
        self.logging.apply_env_overrides();
    }
}

/// Camera start-up options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Sensor active at launch
    pub facing: CameraFacing,
    /// Ratio selected once the camera reports its capabilities
    pub preferred_ratio: Option<String>,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            facing: CameraFacing::Back,
            preferred_ratio: Some("4:3".to_string()),
        }
    }
}

impl CameraOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(facing) = env::var("FLASHCAM_FACING") {
            if let Some(parsed) = CameraFacing::parse(&facing) {
                self.facing = parsed;
            }
        }
        if let Ok(ratio) = env::var("FLASHCAM_RATIO") {
            let ratio = ratio.trim();
            self.preferred_ratio = (!ratio.is_empty()).then(|| ratio.to_string());
        }
    }
}

/// Transient display and screen flash options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// How long a scanned QR link stays on screen after the last sighting
    pub link_display_ms: u64,
    /// How long the ratio name stays on screen after a swipe
    pub ratio_overlay_ms: u64,
    /// Opacity of the white layer used as a front flash
    pub screen_flash_opacity: f32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            link_display_ms: 1000,
            ratio_overlay_ms: 1500,
            screen_flash_opacity: DEFAULT_OVERLAY_OPACITY,
        }
    }
}

impl DisplayOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(ms) = env::var("FLASHCAM_LINK_DISPLAY_MS") {
            if let Ok(parsed) = ms.parse::<u64>() {
                self.link_display_ms = parsed;
            }
        }
        if let Ok(ms) = env::var("FLASHCAM_RATIO_OVERLAY_MS") {
            if let Ok(parsed) = ms.parse::<u64>() {
                self.ratio_overlay_ms = parsed;
            }
        }
        if let Ok(opacity) = env::var("FLASHCAM_SCREEN_FLASH_OPACITY") {
            if let Ok(parsed) = opacity.parse::<f32>() {
                self.screen_flash_opacity = parsed.clamp(0.0, 1.0);
            }
        }
    }

    /// Link banner lifetime
    pub fn link_display(&self) -> Duration {
        Duration::from_millis(self.link_display_ms)
    }

    /// Ratio overlay lifetime
    pub fn ratio_overlay(&self) -> Duration {
        Duration::from_millis(self.ratio_overlay_ms)
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `FLASHCAM_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in stdout logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("FLASHCAM_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("FLASHCAM_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("FLASHCAM_LOG_COLOR") {
            match color.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.color = false,
                "1" | "true" | "on" => self.color = true,
                _ => {}
            }
        }
        if let Ok(rotation) = env::var("FLASHCAM_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}
