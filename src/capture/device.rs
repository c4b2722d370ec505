//! Driver abstraction for frame capture.
//!
//! A [`DeviceSystem`] enumerates and opens devices; the returned
//! [`CaptureDevice`] is used and closed on the thread that opened it, so
//! backends with thread-affine handles need not be `Send`.

use super::{DeviceError, Frame, FrameFormat};

/// Entry point into a capture backend.
pub trait DeviceSystem: Send + Sync {
    /// Lists the identifiers of the devices currently available.
    fn list_devices(&self) -> Vec<String>;

    /// Opens a streaming session on the given device.
    fn open(&self, device_id: &str) -> Result<Box<dyn CaptureDevice>, DeviceError>;
}

/// An open device session producing raw frames.
pub trait CaptureDevice {
    /// Dimensions the session was opened with.
    fn format(&self) -> FrameFormat;

    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame, DeviceError>;

    /// Stops streaming and releases the device handle.
    fn close(&mut self);
}
