//! Counters describing a camera's capture activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the capture loop.
#[derive(Debug, Default)]
pub struct CaptureStats {
    frames_captured: AtomicU64,
    capture_errors: AtomicU64,
    disconnects: AtomicU64,
    sessions_started: AtomicU64,
    format_changes: AtomicU64,
}

/// Point-in-time copy of [`CaptureStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStatsSnapshot {
    /// Frames read from the device.
    pub frames_captured: u64,
    /// Transient read failures.
    pub capture_errors: u64,
    /// Sessions lost to a persistent failure.
    pub disconnects: u64,
    /// Device sessions opened for continuous capture.
    pub sessions_started: u64,
    /// Mid-session frame dimension changes.
    pub format_changes: u64,
}

impl CaptureStats {
    pub(crate) fn frame_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn capture_error(&self) {
        self.capture_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn disconnected(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn format_changed(&self) {
        self.format_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters.
    pub fn snapshot(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            format_changes: self.format_changes.load(Ordering::Relaxed),
        }
    }
}
