//! Metrics collection and registry.

use crate::capture::{Camera, CameraState};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The registry rejected a metric.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of camera state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether a device session is running.
    pub capturing: bool,
    /// Registered subscribers.
    pub subscribers: usize,
    /// Frames read from the device.
    pub frames_captured: u64,
    /// Transient read failures.
    pub capture_errors: u64,
    /// Sessions lost to a persistent device failure.
    pub disconnects: u64,
    /// Device sessions opened for continuous capture.
    pub sessions_started: u64,
    /// Mid-session frame dimension changes.
    pub format_changes: u64,
    /// Frames handed to subscribers.
    pub frames_delivered: u64,
    /// Frame offers skipped by a subscriber's rate cap.
    pub frames_rate_limited: u64,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of a camera.
    pub fn from_camera(camera: &Camera) -> Self {
        let stats = camera.stats().snapshot();
        Self {
            capturing: camera.state() == CameraState::Capturing,
            subscribers: camera.subscriber_count(),
            frames_captured: stats.frames_captured,
            capture_errors: stats.capture_errors,
            disconnects: stats.disconnects,
            sessions_started: stats.sessions_started,
            format_changes: stats.format_changes,
            frames_delivered: camera.broadcaster().deliveries(),
            frames_rate_limited: camera.broadcaster().rate_limited(),
        }
    }
}

/// Prometheus metrics registry for capture monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    capturing: IntGauge,
    subscribers: IntGauge,
    sessions_started: IntCounter,
    disconnects: IntCounter,

    // Capture metrics
    frames_captured: IntCounter,
    capture_errors: IntCounter,
    format_changes: IntCounter,

    // Broadcast metrics
    frames_delivered: IntCounter,
    frames_rate_limited: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let capturing = IntGauge::new(
            "camera_view_capturing",
            "Whether a device session is running (1=capturing, 0=stopped)",
        )?;
        let subscribers = IntGauge::new(
            "camera_view_subscribers",
            "Number of registered frame subscribers",
        )?;
        let sessions_started = IntCounter::new(
            "camera_view_sessions_started_total",
            "Device sessions opened for continuous capture",
        )?;
        let disconnects = IntCounter::new(
            "camera_view_disconnects_total",
            "Sessions ended by a persistent device failure",
        )?;
        let frames_captured = IntCounter::new(
            "camera_view_frames_captured_total",
            "Frames read from the capture device",
        )?;
        let capture_errors = IntCounter::new(
            "camera_view_capture_errors_total",
            "Transient frame acquisition failures",
        )?;
        let format_changes = IntCounter::new(
            "camera_view_format_changes_total",
            "Frame dimension changes within a session",
        )?;
        let frames_delivered = IntCounter::new(
            "camera_view_frames_delivered_total",
            "Frames handed to subscribers",
        )?;
        let frames_rate_limited = IntCounter::new(
            "camera_view_frames_rate_limited_total",
            "Frame offers skipped by a subscriber rate cap",
        )?;

        registry.register(Box::new(capturing.clone()))?;
        registry.register(Box::new(subscribers.clone()))?;
        registry.register(Box::new(sessions_started.clone()))?;
        registry.register(Box::new(disconnects.clone()))?;
        registry.register(Box::new(frames_captured.clone()))?;
        registry.register(Box::new(capture_errors.clone()))?;
        registry.register(Box::new(format_changes.clone()))?;
        registry.register(Box::new(frames_delivered.clone()))?;
        registry.register(Box::new(frames_rate_limited.clone()))?;

        Ok(Self {
            registry,
            capturing,
            subscribers,
            sessions_started,
            disconnects,
            frames_captured,
            capture_errors,
            format_changes,
            frames_delivered,
            frames_rate_limited,
        })
    }

    /// Updates all metrics from a snapshot of camera state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.capturing.set(i64::from(snapshot.capturing));
        self.subscribers.set(snapshot.subscribers as i64);

        // Counters only move forward, so advance them by the difference
        advance(&self.sessions_started, snapshot.sessions_started);
        advance(&self.disconnects, snapshot.disconnects);
        advance(&self.frames_captured, snapshot.frames_captured);
        advance(&self.capture_errors, snapshot.capture_errors);
        advance(&self.format_changes, snapshot.format_changes);
        advance(&self.frames_delivered, snapshot.frames_delivered);
        advance(&self.frames_rate_limited, snapshot.frames_rate_limited);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            capturing: true,
            subscribers: 2,
            frames_captured: 90,
            frames_delivered: 40,
            frames_rate_limited: 140,
            sessions_started: 1,
            ..Default::default()
        };

        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("camera_view_capturing 1"));
        assert!(output.contains("camera_view_subscribers 2"));
        assert!(output.contains("camera_view_frames_captured_total 90"));
        assert!(output.contains("camera_view_frames_rate_limited_total 140"));
    }

    #[test]
    fn test_counters_do_not_go_backwards() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            frames_captured: 10,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            frames_captured: 4,
            ..Default::default()
        });
        let output = registry.encode().unwrap();
        assert!(output.contains("camera_view_frames_captured_total 10"));
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("camera_view_capturing"));
        assert!(output.contains("camera_view_frames_delivered_total"));
        assert!(output.contains("camera_view_disconnects_total"));
    }
}
