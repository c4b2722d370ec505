//! Error types for the capture subsystem.

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a device backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The backend does not know the device.
    #[error("no capture device with id {0:?}")]
    NotFound(String),

    /// Another session holds the device.
    #[error("capture device {0:?} is already in use")]
    Busy(String),

    /// One read failed; the next may succeed.
    #[error("transient acquisition failure: {0}")]
    Transient(String),

    /// The device is gone.
    #[error("device disconnected: {0}")]
    Disconnected(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by [`Camera`](super::Camera) operations.
///
/// Cloneable so a single device failure can be handed to every subscriber.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    /// The configuration names no device.
    #[error("no device id configured for camera {camera:?}; available devices: {available:?}")]
    NoDeviceId {
        /// Name of the misconfigured camera.
        camera: String,
        /// Device ids the system offers.
        available: Vec<String>,
    },

    /// The configured device is not offered by the system.
    #[error("camera device not found: {device_id:?}; available devices: {available:?}")]
    DeviceNotFound {
        /// The id that did not resolve.
        device_id: String,
        /// Device ids the system offers.
        available: Vec<String>,
    },

    /// No frame could be acquired.
    #[error("failed to capture frame: {0}")]
    Capture(String),

    /// The device failed persistently during a session.
    #[error("camera device disconnected: {0}")]
    DeviceDisconnected(String),

    /// Another session holds the device.
    #[error("camera device {0:?} is busy")]
    DeviceBusy(String),

    /// The device did not open in time.
    #[error("camera device {device_id:?} did not open within {timeout:?}")]
    OpenTimeout {
        /// Device that was being opened.
        device_id: String,
        /// How long the open was waited for.
        timeout: Duration,
    },

    /// A rate cap is not positive.
    #[error("invalid frame rate {0} (must be positive)")]
    InvalidFrameRate(f64),

    /// The camera configuration is invalid.
    #[error("invalid camera configuration: {0}")]
    Config(String),
}

impl CameraError {
    /// Maps a backend failure raised while opening `device_id`.
    pub(crate) fn from_open(device_id: &str, err: DeviceError, available: Vec<String>) -> Self {
        match err {
            DeviceError::NotFound(_) => CameraError::DeviceNotFound {
                device_id: device_id.to_owned(),
                available,
            },
            DeviceError::Busy(_) => CameraError::DeviceBusy(device_id.to_owned()),
            DeviceError::Disconnected(msg) => CameraError::DeviceDisconnected(msg),
            DeviceError::Transient(msg) | DeviceError::Backend(msg) => CameraError::Capture(msg),
        }
    }

    /// Maps a backend failure raised while reading a frame.
    pub(crate) fn from_read(err: DeviceError) -> Self {
        match err {
            DeviceError::Disconnected(msg) => CameraError::DeviceDisconnected(msg),
            other => CameraError::Capture(other.to_string()),
        }
    }

    /// Returns true if the failure ended the device session.
    pub fn is_persistent(&self) -> bool {
        matches!(self, CameraError::DeviceDisconnected(_))
    }
}
