//! Frame fan-out to live subscribers.
//!
//! Each subscriber gets at most `max_fps` frames per second and holds at
//! most one undelivered frame. The capture loop never waits on a consumer:
//! stale pending frames are replaced instead of queued.

mod broadcaster;
mod subscriber;

pub use broadcaster::FrameBroadcaster;
pub use subscriber::{FrameNotifier, Subscriber, SubscriberId};
