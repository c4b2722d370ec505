//! Rate-capped fan-out of captured frames.

use super::{Subscriber, SubscriberId};
use crate::capture::{CameraError, Frame};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One subscriber's registration and delivery bookkeeping.
struct Registration {
    subscriber: Arc<Subscriber>,
    max_fps: f64,
    min_interval: Duration,
    last_delivery: Option<Instant>,
    last_sequence: Option<u64>,
}

impl Registration {
    fn new(subscriber: Arc<Subscriber>, max_fps: f64) -> Self {
        Self {
            subscriber,
            max_fps,
            min_interval: min_interval(max_fps),
            last_delivery: None,
            last_sequence: None,
        }
    }

    fn set_rate(&mut self, max_fps: f64) {
        self.max_fps = max_fps;
        self.min_interval = min_interval(max_fps);
    }

    /// Decides whether `frame` is due for this subscriber and records the
    /// delivery if so.
    fn admit(&mut self, frame: &Frame) -> bool {
        if matches!(self.last_sequence, Some(last) if frame.sequence() <= last) {
            return false;
        }
        if let Some(last) = self.last_delivery {
            if frame.timestamp().saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_delivery = Some(frame.timestamp());
        self.last_sequence = Some(frame.sequence());
        true
    }
}

fn min_interval(max_fps: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / max_fps).unwrap_or(Duration::MAX)
}

/// Fans frames out to registered subscribers under per-subscriber rate caps.
///
/// The subscriber-set lock is held only to update the set and to decide
/// which subscribers are due; handoff happens after it is released.
#[derive(Default)]
pub struct FrameBroadcaster {
    registrations: Mutex<Vec<Registration>>,
    deliveries: AtomicU64,
    rate_limited: AtomicU64,
}

impl FrameBroadcaster {
    /// Creates an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscriber` with a rate cap, or updates the cap if it is
    /// already registered.
    ///
    /// Returns `Ok(true)` when the subscriber was newly added. A newly
    /// added subscriber drops any error left over from an earlier session.
    pub fn register(&self, subscriber: &Arc<Subscriber>, max_fps: f64) -> Result<bool, CameraError> {
        // Also rejects NaN
        if !(max_fps > 0.0) {
            return Err(CameraError::InvalidFrameRate(max_fps));
        }
        let mut registrations = self.registrations.lock();
        if let Some(existing) = registrations
            .iter_mut()
            .find(|r| r.subscriber.id() == subscriber.id())
        {
            existing.set_rate(max_fps);
            tracing::debug!(subscriber = %subscriber.id(), max_fps, "Subscriber rate cap updated");
            return Ok(false);
        }
        registrations.push(Registration::new(Arc::clone(subscriber), max_fps));
        if subscriber.take_error().is_some() {
            tracing::debug!(subscriber = %subscriber.id(), "Discarded error from an earlier session");
        }
        tracing::debug!(subscriber = %subscriber.id(), max_fps, "Subscriber registered");
        Ok(true)
    }

    /// Removes a subscriber. Returns true if it was registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut registrations = self.registrations.lock();
        let before = registrations.len();
        registrations.retain(|r| r.subscriber.id() != id);
        registrations.len() != before
    }

    /// Returns true if the subscriber is registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.registrations
            .lock()
            .iter()
            .any(|r| r.subscriber.id() == id)
    }

    /// Returns the rate cap of a registered subscriber.
    pub fn max_fps(&self, id: SubscriberId) -> Option<f64> {
        self.registrations
            .lock()
            .iter()
            .find(|r| r.subscriber.id() == id)
            .map(|r| r.max_fps)
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Returns true when no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.lock().is_empty()
    }

    /// Offers a newly captured frame to every subscriber.
    ///
    /// Returns the number of subscribers the frame was handed to.
    pub fn on_frame(&self, frame: &Arc<Frame>) -> usize {
        let (due, skipped) = {
            let mut registrations = self.registrations.lock();
            let total = registrations.len();
            let due: Vec<Arc<Subscriber>> = registrations
                .iter_mut()
                .filter_map(|r| r.admit(frame).then(|| Arc::clone(&r.subscriber)))
                .collect();
            let skipped = total - due.len();
            (due, skipped)
        };

        for subscriber in &due {
            subscriber.deliver(Arc::clone(frame));
        }

        self.deliveries.fetch_add(due.len() as u64, Ordering::Relaxed);
        self.rate_limited.fetch_add(skipped as u64, Ordering::Relaxed);
        tracing::trace!(
            sequence = frame.sequence(),
            delivered = due.len(),
            skipped,
            "Frame broadcast"
        );
        due.len()
    }

    /// Surfaces `error` to every current subscriber once, then clears the set.
    ///
    /// Returns the number of subscribers notified.
    pub fn fail_all(&self, error: &CameraError) -> usize {
        let failed = self.drain();
        for subscriber in &failed {
            subscriber.fail(error.clone());
        }
        failed.len()
    }

    /// Removes and returns every subscriber.
    pub(crate) fn drain(&self) -> Vec<Arc<Subscriber>> {
        self.registrations
            .lock()
            .drain(..)
            .map(|r| r.subscriber)
            .collect()
    }

    /// Total handoffs performed.
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    /// Total (subscriber, frame) pairs skipped by the rate cap or ordering.
    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }
}
