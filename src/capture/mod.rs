//! Camera input and frame handling.
//!
//! This module owns the device session lifecycle. The hardware driver is
//! reached through the [`DeviceSystem`] / [`CaptureDevice`] traits; a
//! [`MockDeviceSystem`] is always available and a `nokhwa` backend is
//! compiled in with the `camera` feature.

mod camera;
mod config;
mod device;
mod error;
mod frame;
mod mock;
#[cfg(feature = "camera")]
mod native;
mod stats;

pub use camera::{Camera, CameraState};
pub use config::{CameraConfig, ConfigError, FileConfig, OutputConfig, ViewConfig};
pub use device::{CaptureDevice, DeviceSystem};
pub use error::{CameraError, DeviceError};
pub use frame::{Frame, FrameFormat, BYTES_PER_PIXEL};
pub use mock::{MockDeviceSystem, MockScript};
#[cfg(feature = "camera")]
pub use native::NokhwaSystem;
pub use stats::{CaptureStats, CaptureStatsSnapshot};
