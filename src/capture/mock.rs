//! Mock capture backend that generates synthetic frames.
//!
//! Used by tests and the demo binary. Devices are exclusive like real
//! hardware: a second open of a device that is still open fails with
//! [`DeviceError::Busy`]. Failures can be scripted per device.

use super::frame::BYTES_PER_PIXEL;
use super::{CaptureDevice, DeviceError, DeviceSystem, Frame, FrameFormat};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Scripted behavior of one mock device.
#[derive(Debug, Clone)]
pub struct MockScript {
    /// Error returned by every open attempt.
    pub open_error: Option<DeviceError>,
    /// Delay before an open attempt completes.
    pub open_delay: Duration,
    /// Delay before each frame is returned.
    pub frame_interval: Duration,
    /// Number of upcoming reads that fail transiently.
    pub transient_failures: u32,
    /// Report a disconnect once this many frames were produced in a session.
    pub disconnect_after: Option<u64>,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            open_error: None,
            open_delay: Duration::ZERO,
            frame_interval: Duration::from_millis(5),
            transient_failures: 0,
            disconnect_after: None,
        }
    }
}

#[derive(Debug)]
struct MockDeviceState {
    format: FrameFormat,
    script: MockScript,
    open: bool,
    sessions_opened: u64,
}

type Devices = Arc<Mutex<BTreeMap<String, MockDeviceState>>>;

/// Mock device system holding a fixed set of named devices.
#[derive(Debug, Clone, Default)]
pub struct MockDeviceSystem {
    devices: Devices,
}

impl MockDeviceSystem {
    /// Creates a system with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device producing frames of the given size.
    pub fn with_device(self, id: impl Into<String>, width: u32, height: u32) -> Self {
        self.devices.lock().insert(
            id.into(),
            MockDeviceState {
                format: FrameFormat::new(width, height),
                script: MockScript::default(),
                open: false,
                sessions_opened: 0,
            },
        );
        self
    }

    /// Replaces the script of a device. Takes effect on the next read or open.
    pub fn set_script(&self, id: &str, script: MockScript) {
        if let Some(device) = self.devices.lock().get_mut(id) {
            device.script = script;
        }
    }

    /// Applies `f` to a device's script in place.
    pub fn update_script(&self, id: &str, f: impl FnOnce(&mut MockScript)) {
        if let Some(device) = self.devices.lock().get_mut(id) {
            f(&mut device.script);
        }
    }

    /// Returns true while a session holds the device.
    pub fn is_open(&self, id: &str) -> bool {
        self.devices.lock().get(id).map(|d| d.open).unwrap_or(false)
    }

    /// Number of sessions ever opened on the device.
    pub fn sessions_opened(&self, id: &str) -> u64 {
        self.devices
            .lock()
            .get(id)
            .map(|d| d.sessions_opened)
            .unwrap_or(0)
    }
}

impl DeviceSystem for MockDeviceSystem {
    fn list_devices(&self) -> Vec<String> {
        self.devices.lock().keys().cloned().collect()
    }

    fn open(&self, device_id: &str) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        let delay = {
            let devices = self.devices.lock();
            let device = devices
                .get(device_id)
                .ok_or_else(|| DeviceError::NotFound(device_id.to_owned()))?;
            device.script.open_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut devices = self.devices.lock();
        let device = devices
            .get_mut(device_id)
            .ok_or_else(|| DeviceError::NotFound(device_id.to_owned()))?;
        if let Some(err) = device.script.open_error.clone() {
            return Err(err);
        }
        if device.open {
            return Err(DeviceError::Busy(device_id.to_owned()));
        }
        device.open = true;
        device.sessions_opened += 1;
        tracing::info!(device = device_id, format = ?device.format, "MockDevice opened");

        Ok(Box::new(MockDevice {
            id: device_id.to_owned(),
            format: device.format,
            devices: Arc::clone(&self.devices),
            sequence: 0,
            closed: false,
        }))
    }
}

/// One open session on a mock device.
struct MockDevice {
    id: String,
    format: FrameFormat,
    devices: Devices,
    sequence: u64,
    closed: bool,
}

impl MockDevice {
    fn synthesize(&self) -> Vec<u8> {
        let width = self.format.width as usize;
        let pixel_count = width * self.format.height as usize;
        let mut pixels = Vec::with_capacity(pixel_count * BYTES_PER_PIXEL);
        for i in 0..pixel_count {
            // Deterministic gradient that shifts with the sequence number
            let x = (i % width) as u64;
            let y = (i / width.max(1)) as u64;
            pixels.push(((x + self.sequence) % 256) as u8);
            pixels.push(((y + self.sequence) % 256) as u8);
            pixels.push((self.sequence % 256) as u8);
        }
        pixels
    }
}

impl CaptureDevice for MockDevice {
    fn format(&self) -> FrameFormat {
        self.format
    }

    fn read_frame(&mut self) -> Result<Frame, DeviceError> {
        if self.closed {
            return Err(DeviceError::Disconnected(format!("{} is closed", self.id)));
        }

        let interval = {
            let mut devices = self.devices.lock();
            let device = devices
                .get_mut(&self.id)
                .ok_or_else(|| DeviceError::Disconnected(self.id.clone()))?;
            if let Some(limit) = device.script.disconnect_after {
                if self.sequence >= limit {
                    return Err(DeviceError::Disconnected(format!("{} unplugged", self.id)));
                }
            }
            if device.script.transient_failures > 0 {
                device.script.transient_failures -= 1;
                return Err(DeviceError::Transient(format!("{} dropped a frame", self.id)));
            }
            device.script.frame_interval
        };
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }

        self.sequence += 1;
        Ok(Frame::new(
            self.synthesize(),
            self.format.width,
            self.format.height,
            self.sequence,
        ))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(device) = self.devices.lock().get_mut(&self.id) {
            device.open = false;
        }
        tracing::info!(device = %self.id, "MockDevice closed");
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_lifecycle() {
        let system = MockDeviceSystem::new().with_device("cam0", 8, 6);
        assert!(!system.is_open("cam0"));

        let mut device = system.open("cam0").unwrap();
        assert!(system.is_open("cam0"));
        assert_eq!(device.format(), FrameFormat::new(8, 6));

        let frame = device.read_frame().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = device.read_frame().unwrap();
        assert_eq!(frame2.sequence(), 2);

        device.close();
        assert!(!system.is_open("cam0"));
    }

    #[test]
    fn test_second_open_is_busy() {
        let system = MockDeviceSystem::new().with_device("cam0", 4, 4);
        let _first = system.open("cam0").unwrap();
        assert!(matches!(system.open("cam0"), Err(DeviceError::Busy(_))));
    }

    #[test]
    fn test_drop_releases_device() {
        let system = MockDeviceSystem::new().with_device("cam0", 4, 4);
        drop(system.open("cam0").unwrap());
        assert!(system.open("cam0").is_ok());
        assert_eq!(system.sessions_opened("cam0"), 2);
    }

    #[test]
    fn test_unknown_device() {
        let system = MockDeviceSystem::new();
        assert!(matches!(system.open("nope"), Err(DeviceError::NotFound(_))));
    }

    #[test]
    fn test_scripted_failures() {
        let system = MockDeviceSystem::new().with_device("cam0", 2, 2);
        system.update_script("cam0", |s| {
            s.frame_interval = Duration::ZERO;
            s.transient_failures = 1;
            s.disconnect_after = Some(1);
        });
        let mut device = system.open("cam0").unwrap();
        assert!(matches!(device.read_frame(), Err(DeviceError::Transient(_))));
        assert!(device.read_frame().is_ok());
        assert!(matches!(
            device.read_frame(),
            Err(DeviceError::Disconnected(_))
        ));
    }
}
