//! Prometheus metrics exporter for capture monitoring.
//!
//! This module exposes camera session and frame fan-out activity in
//! Prometheus format, optionally via an HTTP endpoint.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `camera_view_capturing` - Current session state (1=capturing, 0=stopped)
//! - `camera_view_subscribers` - Registered frame subscribers
//! - `camera_view_sessions_started_total` - Device sessions opened
//! - `camera_view_disconnects_total` - Sessions lost to device failure
//!
//! ## Capture Metrics
//! - `camera_view_frames_captured_total` - Frames read from the device
//! - `camera_view_capture_errors_total` - Transient acquisition failures
//! - `camera_view_format_changes_total` - Mid-session dimension changes
//!
//! ## Broadcast Metrics
//! - `camera_view_frames_delivered_total` - Frames handed to subscribers
//! - `camera_view_frames_rate_limited_total` - Offers skipped by rate caps
//!
//! # Example
//!
//! ```no_run
//! use camera_view::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     capturing: true,
//!     subscribers: 1,
//!     frames_captured: 300,
//!     frames_delivered: 100,
//!     frames_rate_limited: 200,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
