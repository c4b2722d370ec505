//! Camera and view configuration.
//!
//! Configuration is plain data deserialized from TOML. Nothing here talks
//! to a device; [`Camera::new`](super::Camera::new) resolves the device id.

use crate::render::Color;
use crate::reticle::ReticleConfig;
use crate::units::{InvalidScale, UnitsPerPixel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for one camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Human-readable camera name, used in logs and errors.
    pub name: String,
    /// Backend device identifier. `None` or blank is a configuration error.
    pub device_id: Option<String>,
    /// Physical calibration of one source pixel.
    pub units_per_pixel: UnitsPerPixel,
    /// Upper bound on waiting for the device to open.
    pub open_timeout_ms: u64,
    /// Upper bound on a synchronous capture while streaming.
    pub capture_timeout_ms: u64,
    /// Transient read failures in a row before the device counts as lost.
    pub max_consecutive_failures: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: "camera".to_owned(),
            device_id: None,
            units_per_pixel: UnitsPerPixel::default(),
            open_timeout_ms: 5000,
            capture_timeout_ms: 2000,
            max_consecutive_failures: 10,
        }
    }
}

impl CameraConfig {
    /// Creates a configuration bound to the given device.
    pub fn for_device(name: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device_id: Some(device_id.into()),
            ..Default::default()
        }
    }

    /// Returns the device id if one is set and not blank.
    pub fn resolved_device_id(&self) -> Option<&str> {
        self.device_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Bound on waiting for the device to open.
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Bound on waiting for a single frame.
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    /// Validates the configuration parameters.
    ///
    /// A missing device id is not checked here; the camera reports it
    /// together with the list of available devices.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.units_per_pixel.validate()?;
        if self.open_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("open_timeout_ms"));
        }
        if self.capture_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("capture_timeout_ms"));
        }
        Ok(())
    }
}

/// Configuration of the live view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Rate cap for the view's subscription.
    pub maximum_fps: f64,
    /// Background fill behind the image.
    pub background: Color,
    /// Draw a diagonal cross when no frame is available.
    pub cross_missing_frame: bool,
    /// Overlay drawn on top of the image.
    pub reticle: ReticleConfig,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            maximum_fps: 24.0,
            background: Color::BLACK,
            cross_missing_frame: false,
            reticle: ReticleConfig::default(),
        }
    }
}

impl ViewConfig {
    /// Checks the frame rate cap and reticle parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.maximum_fps.is_finite() && self.maximum_fps > 0.0) {
            return Err(ConfigError::InvalidFrameRate(self.maximum_fps));
        }
        self.reticle.validate()
    }
}

/// Output configuration for the demo binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Run until interrupted (true) or render a fixed number of frames.
    pub continuous: bool,
    /// Number of frames to render if not continuous.
    pub frame_count: u32,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            frame_count: 100,
            metrics_port: 9090,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Camera identity and calibration.
    #[serde(default)]
    pub camera: CameraConfig,
    /// Live view settings.
    #[serde(default)]
    pub view: ViewConfig,
    /// Demo output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.camera.validate()?;
        config.view.validate()?;
        Ok(config)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Calibration is not positive and finite.
    #[error(transparent)]
    InvalidScale(#[from] InvalidScale),
    /// Frame rate cap is not positive.
    #[error("invalid frame rate {0} (must be positive)")]
    InvalidFrameRate(f64),
    /// A timeout is zero.
    #[error("{0} must be greater than zero")]
    InvalidTimeout(&'static str),
    /// Reticle parameters are out of range.
    #[error("invalid reticle: {0}")]
    InvalidReticle(String),
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}
