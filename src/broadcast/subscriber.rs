//! Subscriber handle with a single latest-wins frame slot.

use crate::capture::{CameraError, Frame};
use arc_swap::ArcSwapOption;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Callback run in the capture context after each handoff.
///
/// Must return quickly (e.g. post a repaint request) and must not call
/// back into the camera.
pub type FrameNotifier = Box<dyn Fn() + Send + Sync>;

/// A registered consumer of continuously captured frames.
///
/// The capture loop hands frames over by swapping a reference into the
/// pending slot; an unconsumed frame is replaced, never queued, so at most
/// one undelivered frame is retained per subscriber. The consumer drains
/// the slot from its own thread with [`take_frame`](Self::take_frame) or
/// [`wait_frame`](Self::wait_frame).
pub struct Subscriber {
    id: SubscriberId,
    pending: ArcSwapOption<Frame>,
    latest: ArcSwapOption<Frame>,
    error: Mutex<Option<CameraError>>,
    generation: Mutex<u64>,
    ready: Condvar,
    notifier: Option<FrameNotifier>,
    delivered: AtomicU64,
    replaced: AtomicU64,
}

impl Subscriber {
    /// Creates a subscriber that consumers poll or wait on.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// Creates a subscriber that runs `notifier` after every handoff.
    pub fn with_notifier(notifier: impl Fn() + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self::build(Some(Box::new(notifier))))
    }

    fn build(notifier: Option<FrameNotifier>) -> Self {
        Self {
            id: SubscriberId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            pending: ArcSwapOption::empty(),
            latest: ArcSwapOption::empty(),
            error: Mutex::new(None),
            generation: Mutex::new(0),
            ready: Condvar::new(),
            notifier,
            delivered: AtomicU64::new(0),
            replaced: AtomicU64::new(0),
        }
    }

    /// Identity used to register and unregister.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Takes the pending frame, if one arrived since the last take.
    pub fn take_frame(&self) -> Option<Arc<Frame>> {
        self.pending.swap(None)
    }

    /// Returns the most recently delivered frame without consuming it.
    ///
    /// Suitable for repaints, which need the last frame even when nothing
    /// new has arrived.
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.latest.load_full()
    }

    /// Blocks until a frame is pending, an error is surfaced, or `timeout`
    /// elapses.
    pub fn wait_frame(&self, timeout: Duration) -> Option<Arc<Frame>> {
        let deadline = Instant::now() + timeout;
        let mut generation = self.generation.lock();
        loop {
            if let Some(frame) = self.pending.swap(None) {
                return Some(frame);
            }
            if self.error.lock().is_some() {
                return None;
            }
            if self.ready.wait_until(&mut generation, deadline).timed_out() {
                return self.pending.swap(None);
            }
        }
    }

    /// Takes the error surfaced by the camera, if any.
    pub fn take_error(&self) -> Option<CameraError> {
        self.error.lock().take()
    }

    /// Returns true if an error is waiting to be taken.
    pub fn has_error(&self) -> bool {
        self.error.lock().is_some()
    }

    /// Number of frames handed to this subscriber.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Number of handed-over frames that were replaced before being taken.
    pub fn replaced(&self) -> u64 {
        self.replaced.load(Ordering::Relaxed)
    }

    pub(crate) fn deliver(&self, frame: Arc<Frame>) {
        self.latest.store(Some(Arc::clone(&frame)));
        if self.pending.swap(Some(frame)).is_some() {
            self.replaced.fetch_add(1, Ordering::Relaxed);
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.wake();
    }

    pub(crate) fn fail(&self, error: CameraError) {
        *self.error.lock() = Some(error);
        self.wake();
    }

    fn wake(&self) {
        *self.generation.lock() += 1;
        self.ready.notify_all();
        if let Some(notifier) = &self.notifier {
            notifier();
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("delivered", &self.delivered())
            .field("replaced", &self.replaced())
            .finish()
    }
}
