//! Native camera backend built on `nokhwa`.
//!
//! Devices are addressed by their `nokhwa` index rendered as a string.
//! Frames are decoded to packed RGB8.

use super::{CaptureDevice, DeviceError, DeviceSystem, Frame, FrameFormat};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::NokhwaError;

/// Device system over the platform's native capture API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NokhwaSystem;

impl NokhwaSystem {
    /// Creates a system backed by the platform camera API.
    pub fn new() -> Self {
        Self
    }
}

fn camera_index(device_id: &str) -> CameraIndex {
    device_id
        .parse::<u32>()
        .map(CameraIndex::Index)
        .unwrap_or_else(|_| CameraIndex::String(device_id.to_owned()))
}

impl DeviceSystem for NokhwaSystem {
    fn list_devices(&self) -> Vec<String> {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(devices) => devices.iter().map(|info| info.index().as_string()).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to enumerate cameras");
                Vec::new()
            }
        }
    }

    fn open(&self, device_id: &str) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = nokhwa::Camera::new(camera_index(device_id), requested)
            .map_err(|e| DeviceError::Backend(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        let resolution = camera.resolution();
        let format = FrameFormat::new(resolution.width(), resolution.height());
        tracing::info!(device = device_id, ?format, "Native camera opened");

        Ok(Box::new(NokhwaDevice {
            camera,
            format,
            sequence: 0,
            streaming: true,
        }))
    }
}

struct NokhwaDevice {
    camera: nokhwa::Camera,
    format: FrameFormat,
    sequence: u64,
    streaming: bool,
}

fn read_error(err: NokhwaError) -> DeviceError {
    match err {
        NokhwaError::ReadFrameError(msg) => DeviceError::Transient(msg),
        NokhwaError::ProcessFrameError { error, .. } => DeviceError::Transient(error),
        other => DeviceError::Disconnected(other.to_string()),
    }
}

impl CaptureDevice for NokhwaDevice {
    fn format(&self) -> FrameFormat {
        self.format
    }

    fn read_frame(&mut self) -> Result<Frame, DeviceError> {
        let buffer = self.camera.frame().map_err(read_error)?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(read_error)?;
        let (width, height) = (image.width(), image.height());
        self.sequence += 1;
        Ok(Frame::new(image.into_raw(), width, height, self.sequence))
    }

    fn close(&mut self) {
        if !self.streaming {
            return;
        }
        self.streaming = false;
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!(error = %e, "Failed to stop camera stream");
        }
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        self.close();
    }
}
