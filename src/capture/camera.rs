//! Camera session lifecycle and the continuous capture loop.
//!
//! A [`Camera`] owns at most one device session at a time. The session is
//! opened when the first subscriber registers and released when the last
//! one leaves. Frames are produced on a dedicated thread and handed to the
//! [`FrameBroadcaster`].
//!
//! Lock order is session → state → subscriber set. The capture thread
//! never takes the session lock, so stopping can join it while holding
//! that lock.

use super::{CameraConfig, CameraError, CaptureStats, DeviceSystem, Frame, FrameFormat};
use crate::broadcast::{FrameBroadcaster, Subscriber};
use crate::units::UnitsPerPixel;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Lifecycle state of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    /// No device session is open.
    Stopped,
    /// A device session is streaming frames.
    Capturing,
}

/// Most recent frame of the running session, for synchronous captures.
#[derive(Default)]
struct LatestFrame {
    frame: Option<Arc<Frame>>,
    generation: u64,
}

struct Shared {
    name: String,
    device_id: String,
    config: CameraConfig,
    system: Arc<dyn DeviceSystem>,
    broadcaster: FrameBroadcaster,
    state: Mutex<CameraState>,
    latest: Mutex<LatestFrame>,
    frame_ready: Condvar,
    stats: CaptureStats,
}

/// Handle on the capture thread of one device session.
struct Session {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    /// Disconnects once the capture thread has exited.
    exited: mpsc::Receiver<Result<FrameFormat, CameraError>>,
}

impl Session {
    /// True once the session was told to stop or lost its device.
    fn is_winding_down(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Signals the loop and waits for the in-flight frame and device release.
    fn stop_and_join(mut self) {
        self.stop.store(true, Ordering::Release);
        self.join();
    }

    /// Like [`stop_and_join`](Self::stop_and_join), but hands the session
    /// back if the thread is still inside the device open after `timeout`.
    fn stop_within(mut self, timeout: Duration) -> Result<(), Session> {
        self.stop.store(true, Ordering::Release);
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exited.recv_timeout(remaining) {
                Ok(_) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => return Err(self),
            }
        }
        self.join();
        Ok(())
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Capture thread panicked");
            }
        }
    }
}

/// A machine-vision camera producing frames for any number of subscribers.
pub struct Camera {
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl Camera {
    /// Creates a camera bound to a device of `system`.
    ///
    /// Fails with [`CameraError::NoDeviceId`] when the configuration names
    /// no device and with [`CameraError::DeviceNotFound`] when the id is
    /// not offered by the system. Both carry the available device ids.
    pub fn new(config: CameraConfig, system: Arc<dyn DeviceSystem>) -> Result<Self, CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::Config(e.to_string()))?;

        let available = system.list_devices();
        let device_id = match config.resolved_device_id() {
            Some(id) => id.to_owned(),
            None => {
                return Err(CameraError::NoDeviceId {
                    camera: config.name.clone(),
                    available,
                })
            }
        };
        if !available.iter().any(|d| *d == device_id) {
            return Err(CameraError::DeviceNotFound {
                device_id,
                available,
            });
        }

        tracing::info!(camera = %config.name, device = %device_id, "Camera configured");
        Ok(Self {
            shared: Arc::new(Shared {
                name: config.name.clone(),
                device_id,
                config,
                system,
                broadcaster: FrameBroadcaster::new(),
                state: Mutex::new(CameraState::Stopped),
                latest: Mutex::new(LatestFrame::default()),
                frame_ready: Condvar::new(),
                stats: CaptureStats::default(),
            }),
            session: Mutex::new(None),
        })
    }

    /// Configured camera name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Device id the camera opens.
    pub fn device_id(&self) -> &str {
        &self.shared.device_id
    }

    /// Physical size of one source pixel.
    pub fn units_per_pixel(&self) -> UnitsPerPixel {
        self.shared.config.units_per_pixel
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CameraState {
        *self.shared.state.lock()
    }

    /// Number of continuous-capture subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.broadcaster.len()
    }

    /// Capture counters.
    pub fn stats(&self) -> &CaptureStats {
        &self.shared.stats
    }

    /// Fan-out used by the capture loop.
    pub fn broadcaster(&self) -> &FrameBroadcaster {
        &self.shared.broadcaster
    }

    /// Registers `subscriber` for continuous capture at up to `max_fps`.
    ///
    /// Opens the device session if none is running. Registering the same
    /// subscriber again only updates its rate cap. A session that is
    /// winding down after a device error is reaped first, so its error
    /// reaches every old subscriber before anyone joins the new session;
    /// a subscriber that registers anew drops that stale error.
    /// Waits at most the configured open timeout for the device; on any
    /// failure the subscriber is left unregistered.
    pub fn start_continuous_capture(
        &self,
        subscriber: &Arc<Subscriber>,
        max_fps: f64,
    ) -> Result<(), CameraError> {
        let mut session = self.session.lock();

        {
            let state = self.shared.state.lock();
            let live = *state == CameraState::Capturing
                && session.as_ref().is_some_and(|s| !s.is_winding_down());
            if live {
                if self.shared.broadcaster.register(subscriber, max_fps)? {
                    tracing::info!(
                        camera = %self.shared.name,
                        subscriber = %subscriber.id(),
                        max_fps,
                        "Subscriber joined running capture"
                    );
                }
                return Ok(());
            }
        }

        self.reap(&mut session)?;

        let added = {
            let _state = self.shared.state.lock();
            self.shared.broadcaster.register(subscriber, max_fps)?
        };

        match self.open_session(&mut session) {
            Ok(()) => {
                tracing::info!(
                    camera = %self.shared.name,
                    subscriber = %subscriber.id(),
                    max_fps,
                    "Continuous capture started"
                );
                Ok(())
            }
            Err(e) => {
                if added {
                    let _state = self.shared.state.lock();
                    self.shared.broadcaster.unregister(subscriber.id());
                }
                tracing::warn!(camera = %self.shared.name, error = %e, "Failed to start capture");
                Err(e)
            }
        }
    }

    /// Removes `subscriber`. When it was the last one, stops the capture
    /// loop and releases the device before returning.
    ///
    /// Returns true if the subscriber was registered.
    pub fn stop_continuous_capture(&self, subscriber: &Subscriber) -> bool {
        let mut session = self.session.lock();

        let retiring = {
            let mut state = self.shared.state.lock();
            if !self.shared.broadcaster.unregister(subscriber.id()) {
                return false;
            }
            if !self.shared.broadcaster.is_empty() || *state == CameraState::Stopped {
                None
            } else {
                *state = CameraState::Stopped;
                session.take()
            }
        };

        if let Some(retiring) = retiring {
            retiring.stop_and_join();
            tracing::info!(camera = %self.shared.name, "Continuous capture stopped, device released");
        }
        true
    }

    /// Acquires a single frame.
    ///
    /// While capturing, returns the next frame of the running session;
    /// otherwise opens the device, reads one frame and releases it. Fails
    /// with [`CameraError::Capture`] when the device yields no frame.
    pub fn capture(&self) -> Result<Arc<Frame>, CameraError> {
        {
            let mut session = self.session.lock();
            if self.state() == CameraState::Stopped {
                self.reap(&mut session)?;
                return self.capture_once();
            }
        }
        self.next_streamed_frame()
    }

    /// Stops capture for every subscriber and releases the device.
    pub fn shutdown(&self) {
        let mut session = self.session.lock();
        {
            let mut state = self.shared.state.lock();
            self.shared.broadcaster.drain();
            *state = CameraState::Stopped;
        }
        if let Some(retiring) = session.take() {
            if retiring
                .stop_within(self.shared.config.open_timeout())
                .is_err()
            {
                tracing::warn!(
                    camera = %self.shared.name,
                    "Capture thread did not exit in time, leaving it to release the device"
                );
                return;
            }
            tracing::info!(camera = %self.shared.name, "Camera shut down");
        }
    }

    /// Waits for the thread of an ended session to exit.
    ///
    /// A thread stuck in a device open that already timed out is given one
    /// more open timeout before the caller gets [`CameraError::OpenTimeout`].
    fn reap(&self, session: &mut Option<Session>) -> Result<(), CameraError> {
        let Some(old) = session.take() else {
            return Ok(());
        };
        let timeout = self.shared.config.open_timeout();
        old.stop_within(timeout).map_err(|old| {
            *session = Some(old);
            CameraError::OpenTimeout {
                device_id: self.shared.device_id.clone(),
                timeout,
            }
        })
    }

    /// Spawns the capture thread and waits for the device to open.
    ///
    /// On success and on timeout the session is stored in `slot`; a timed
    /// out thread closes the device itself and is reaped by the next start.
    fn open_session(&self, slot: &mut Option<Session>) -> Result<(), CameraError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = {
            let shared = Arc::clone(&self.shared);
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name(format!("capture-{}", self.shared.name))
                .spawn(move || run_session(shared, stop, ready_tx))
                .map_err(|e| CameraError::Capture(format!("failed to spawn capture thread: {e}")))?
        };

        let timeout = self.shared.config.open_timeout();
        let outcome = ready_rx.recv_timeout(timeout);
        let session = Session {
            stop,
            thread: Some(thread),
            exited: ready_rx,
        };
        match outcome {
            Ok(Ok(format)) => {
                tracing::debug!(camera = %self.shared.name, ?format, "Device session open");
                *slot = Some(session);
                Ok(())
            }
            Ok(Err(e)) => {
                session.stop_and_join();
                Err(e)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                {
                    let mut state = self.shared.state.lock();
                    session.stop.store(true, Ordering::Release);
                    *state = CameraState::Stopped;
                }
                *slot = Some(session);
                Err(CameraError::OpenTimeout {
                    device_id: self.shared.device_id.clone(),
                    timeout,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                session.stop_and_join();
                Err(CameraError::Capture("capture thread exited during open".into()))
            }
        }
    }

    /// Single-shot acquisition on a device nobody else holds.
    ///
    /// The device is opened, read and closed on a helper thread so that a
    /// hanging open is bounded like the continuous path.
    fn capture_once(&self) -> Result<Arc<Frame>, CameraError> {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let helper = std::thread::Builder::new()
            .name(format!("capture-once-{}", self.shared.name))
            .spawn(move || {
                let result = read_single_frame(&shared);
                let _ = tx.send(result);
            })
            .map_err(|e| CameraError::Capture(format!("failed to spawn capture thread: {e}")))?;

        let timeout = self.shared.config.open_timeout() + self.shared.config.capture_timeout();
        match rx.recv_timeout(timeout) {
            Ok(result) => {
                let _ = helper.join();
                result.map(Arc::new)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => Err(CameraError::OpenTimeout {
                device_id: self.shared.device_id.clone(),
                timeout,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(CameraError::Capture("capture thread exited".into()))
            }
        }
    }

    fn next_streamed_frame(&self) -> Result<Arc<Frame>, CameraError> {
        let timeout = self.shared.config.capture_timeout();
        let deadline = Instant::now() + timeout;
        let mut latest = self.shared.latest.lock();
        let seen = latest.generation;
        loop {
            if latest.generation != seen {
                if let Some(frame) = &latest.frame {
                    return Ok(Arc::clone(frame));
                }
            }
            if self.state() == CameraState::Stopped {
                return Err(CameraError::Capture("capture session ended".into()));
            }
            if self
                .shared
                .frame_ready
                .wait_until(&mut latest, deadline)
                .timed_out()
            {
                return Err(CameraError::Capture(format!(
                    "no frame within {timeout:?}"
                )));
            }
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("name", &self.shared.name)
            .field("device_id", &self.shared.device_id)
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn read_single_frame(shared: &Shared) -> Result<Frame, CameraError> {
    let mut device = shared
        .system
        .open(&shared.device_id)
        .map_err(|e| CameraError::from_open(&shared.device_id, e, shared.system.list_devices()))?;
    let result = device
        .read_frame()
        .map_err(|e| CameraError::Capture(e.to_string()));
    device.close();
    if result.is_ok() {
        shared.stats.frame_captured();
    }
    result
}

/// Body of the capture thread for one session.
fn run_session(
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<FrameFormat, CameraError>>,
) {
    let mut device = match shared.system.open(&shared.device_id) {
        Ok(device) => device,
        Err(e) => {
            let _ = ready.send(Err(CameraError::from_open(
                &shared.device_id,
                e,
                shared.system.list_devices(),
            )));
            return;
        }
    };
    let format = device.format();

    {
        let mut state = shared.state.lock();
        if stop.load(Ordering::Acquire) {
            drop(state);
            tracing::warn!(camera = %shared.name, "Device opened after start gave up, closing");
            device.close();
            return;
        }
        *state = CameraState::Capturing;
    }
    shared.stats.session_started();
    let _ = ready.send(Ok(format));
    tracing::info!(camera = %shared.name, width = format.width, height = format.height, "Capture loop running");

    if let Some(error) = capture_loop(&shared, &stop, device.as_mut(), format) {
        shared.stats.disconnected();
        // Marking the session as winding down keeps new starts out of it
        let already_stopping = {
            let _state = shared.state.lock();
            stop.swap(true, Ordering::AcqRel)
        };
        if !already_stopping {
            let failed = shared.broadcaster.fail_all(&error);
            tracing::error!(
                camera = %shared.name,
                error = %error,
                subscribers = failed,
                "Capture session lost"
            );
            // Every subscriber holds the error before Stopped is observable
            *shared.state.lock() = CameraState::Stopped;
        }
    }

    device.close();
    // Wake synchronous captures waiting on this session
    let _latest = shared.latest.lock();
    shared.frame_ready.notify_all();
    tracing::debug!(camera = %shared.name, "Capture loop exited");
}

/// Reads frames until stopped. Returns the error that ended the session.
fn capture_loop(
    shared: &Shared,
    stop: &AtomicBool,
    device: &mut dyn super::CaptureDevice,
    format: FrameFormat,
) -> Option<CameraError> {
    let max_failures = shared.config.max_consecutive_failures.max(1);
    let mut consecutive_failures = 0u32;
    let mut current_format = format;

    while !stop.load(Ordering::Acquire) {
        match device.read_frame() {
            Ok(frame) => {
                consecutive_failures = 0;
                if frame.format() != current_format {
                    tracing::warn!(
                        camera = %shared.name,
                        from = ?current_format,
                        to = ?frame.format(),
                        "Frame dimensions changed mid-session"
                    );
                    shared.stats.format_changed();
                    current_format = frame.format();
                }
                let frame = Arc::new(frame);
                shared.stats.frame_captured();
                {
                    let mut latest = shared.latest.lock();
                    latest.frame = Some(Arc::clone(&frame));
                    latest.generation += 1;
                }
                shared.frame_ready.notify_all();
                shared.broadcaster.on_frame(&frame);
            }
            Err(e) => {
                let error = CameraError::from_read(e);
                if error.is_persistent() {
                    return Some(error);
                }
                consecutive_failures += 1;
                shared.stats.capture_error();
                tracing::warn!(
                    camera = %shared.name,
                    error = %error,
                    consecutive_failures,
                    "Transient capture failure"
                );
                if consecutive_failures >= max_failures {
                    return Some(CameraError::DeviceDisconnected(format!(
                        "{consecutive_failures} consecutive capture failures, last: {error}"
                    )));
                }
            }
        }
    }
    None
}
