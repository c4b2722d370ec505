//! Live Camera View Library
//!
//! Acquires live frames from a machine-vision camera, fans them out to
//! subscribers at bounded rates, and renders the most recent frame into a
//! viewport with aspect-preserving scaling and a calibrated measurement
//! reticle.
//!
//! # Architecture
//!
//! ```text
//! device → Camera (capture loop) → FrameBroadcaster → Subscriber slots
//!                                                          ↓
//!                         DisplayRenderer (scale, center) + Reticle
//! ```
//!
//! # Design Principles
//!
//! - **One session per camera**: the device is opened for the first
//!   subscriber and released after the last one leaves
//! - **Latest wins**: slow consumers drop stale frames, the capture loop
//!   never waits on them
//! - **Pure rendering**: draw commands are a function of viewport, frame,
//!   calibration and reticle only
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use camera_view::{
//!     capture::{Camera, CameraConfig, MockDeviceSystem},
//!     broadcast::Subscriber,
//!     render::{DisplayRenderer, Viewport},
//!     reticle::ReticleConfig,
//! };
//!
//! let system = MockDeviceSystem::new().with_device("mock-0", 640, 480);
//! let camera = Camera::new(CameraConfig::for_device("top", "mock-0"), Arc::new(system)).unwrap();
//!
//! let view = Subscriber::new();
//! camera.start_continuous_capture(&view, 24.0).unwrap();
//!
//! let renderer = DisplayRenderer::default();
//! let reticle = ReticleConfig::default().build();
//! if let Some(frame) = view.wait_frame(Duration::from_secs(1)) {
//!     let commands = renderer.render(
//!         &Viewport::new(800, 600),
//!         Some(&frame),
//!         &camera.units_per_pixel(),
//!         reticle.as_deref(),
//!     );
//!     println!("{} draw commands", commands.len());
//! }
//!
//! camera.stop_continuous_capture(&view);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod broadcast;
pub mod capture;
pub mod metrics;
pub mod render;
pub mod reticle;
pub mod units;

// Re-export commonly used types at crate root
pub use broadcast::{FrameBroadcaster, Subscriber, SubscriberId};
pub use capture::{Camera, CameraConfig, CameraError, CameraState, Frame, MockDeviceSystem};
pub use render::{DisplayRenderer, DrawCommand, DrawList, Viewport};
pub use reticle::{Reticle, ReticleConfig};
pub use units::{LengthUnit, UnitsPerPixel};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
