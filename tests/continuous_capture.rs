use camera_view::broadcast::Subscriber;
use camera_view::capture::{
    Camera, CameraConfig, CameraError, CameraState, MockDeviceSystem, MockScript,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEVICE: &str = "cam0";

fn setup() -> (MockDeviceSystem, Camera) {
    let system = MockDeviceSystem::new().with_device(DEVICE, 32, 24);
    let camera = Camera::new(
        CameraConfig::for_device("test", DEVICE),
        Arc::new(system.clone()),
    )
    .unwrap();
    (system, camera)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_double_start_keeps_one_session_and_entry() {
    let (system, camera) = setup();
    let sub = Subscriber::new();

    camera.start_continuous_capture(&sub, 10.0).unwrap();
    camera.start_continuous_capture(&sub, 20.0).unwrap();

    assert_eq!(camera.subscriber_count(), 1);
    assert_eq!(system.sessions_opened(DEVICE), 1);
    assert_eq!(camera.broadcaster().max_fps(sub.id()), Some(20.0));
    assert_eq!(camera.state(), CameraState::Capturing);

    assert!(camera.stop_continuous_capture(&sub));
    assert_eq!(camera.state(), CameraState::Stopped);
}

#[test]
fn test_stopping_last_subscriber_releases_device_for_capture() {
    let (system, camera) = setup();
    let sub = Subscriber::new();

    camera.start_continuous_capture(&sub, 30.0).unwrap();
    assert!(sub.wait_frame(Duration::from_secs(5)).is_some());
    camera.stop_continuous_capture(&sub);
    assert!(!system.is_open(DEVICE));

    let frame = camera.capture().unwrap();
    assert!(frame.is_valid());
    assert!(!system.is_open(DEVICE));
}

#[test]
fn test_session_lives_until_last_subscriber_leaves() {
    let (system, camera) = setup();
    let a = Subscriber::new();
    let b = Subscriber::new();

    camera.start_continuous_capture(&a, 30.0).unwrap();
    camera.start_continuous_capture(&b, 5.0).unwrap();
    assert_eq!(system.sessions_opened(DEVICE), 1);
    assert_eq!(camera.subscriber_count(), 2);

    camera.stop_continuous_capture(&a);
    assert_eq!(camera.state(), CameraState::Capturing);
    assert!(system.is_open(DEVICE));
    assert!(b.wait_frame(Duration::from_secs(5)).is_some());

    camera.stop_continuous_capture(&b);
    assert_eq!(camera.state(), CameraState::Stopped);
    assert!(!system.is_open(DEVICE));
}

#[test]
fn test_capture_while_streaming_uses_running_session() {
    let (system, camera) = setup();
    let sub = Subscriber::new();
    camera.start_continuous_capture(&sub, 10.0).unwrap();

    let frame = camera.capture().unwrap();
    assert_eq!(frame.width(), 32);
    assert_eq!(system.sessions_opened(DEVICE), 1);

    camera.stop_continuous_capture(&sub);
}

#[test]
fn test_disconnect_surfaces_error_to_every_subscriber_once() {
    let (system, camera) = setup();
    let a = Subscriber::new();
    let b = Subscriber::new();
    camera.start_continuous_capture(&a, 100.0).unwrap();
    camera.start_continuous_capture(&b, 100.0).unwrap();
    assert!(a.wait_frame(Duration::from_secs(5)).is_some());

    system.update_script(DEVICE, |s| s.disconnect_after = Some(0));

    assert!(wait_until(Duration::from_secs(5), || {
        a.has_error() && b.has_error() && camera.state() == CameraState::Stopped
    }));
    assert_eq!(camera.subscriber_count(), 0);
    assert!(matches!(a.take_error(), Some(CameraError::DeviceDisconnected(_))));
    assert!(matches!(b.take_error(), Some(CameraError::DeviceDisconnected(_))));
    assert!(a.take_error().is_none());
    assert!(wait_until(Duration::from_secs(5), || !system.is_open(DEVICE)));
    assert_eq!(camera.stats().snapshot().disconnects, 1);

    // The camera can be restarted once the device is back
    system.set_script(DEVICE, MockScript::default());
    camera.start_continuous_capture(&a, 100.0).unwrap();
    assert_eq!(system.sessions_opened(DEVICE), 2);
    assert!(a.wait_frame(Duration::from_secs(5)).is_some());
    camera.stop_continuous_capture(&a);
}

#[test]
fn test_transient_failures_do_not_stop_capture() {
    let (system, camera) = setup();
    system.update_script(DEVICE, |s| s.transient_failures = 3);
    let sub = Subscriber::new();

    camera.start_continuous_capture(&sub, 100.0).unwrap();
    assert!(sub.wait_frame(Duration::from_secs(5)).is_some());
    assert_eq!(camera.state(), CameraState::Capturing);
    assert!(!sub.has_error());
    assert_eq!(camera.stats().snapshot().capture_errors, 3);

    camera.stop_continuous_capture(&sub);
}

#[test]
fn test_repeated_transient_failures_escalate() {
    let system = MockDeviceSystem::new().with_device(DEVICE, 8, 8);
    system.update_script(DEVICE, |s| s.transient_failures = u32::MAX);
    let mut config = CameraConfig::for_device("flaky", DEVICE);
    config.max_consecutive_failures = 3;
    let camera = Camera::new(config, Arc::new(system.clone())).unwrap();
    let sub = Subscriber::new();

    camera.start_continuous_capture(&sub, 10.0).unwrap();
    assert!(wait_until(Duration::from_secs(5), || sub.has_error()));
    assert!(matches!(
        sub.take_error(),
        Some(CameraError::DeviceDisconnected(_))
    ));
    assert!(wait_until(Duration::from_secs(5), || {
        camera.state() == CameraState::Stopped
    }));
}

#[test]
fn test_live_rate_cap_is_respected() {
    let (system, camera) = setup();
    system.update_script(DEVICE, |s| s.frame_interval = Duration::from_millis(2));
    let sub = Subscriber::new();

    let started = Instant::now();
    camera.start_continuous_capture(&sub, 20.0).unwrap();
    std::thread::sleep(Duration::from_millis(500));
    camera.stop_continuous_capture(&sub);
    let elapsed = started.elapsed().as_secs_f64();

    let captured = camera.stats().snapshot().frames_captured;
    let delivered = sub.delivered();
    assert!(delivered >= 1);
    assert!(delivered as f64 <= elapsed * 20.0 + 1.0);
    assert!(captured > delivered);
}

#[test]
fn test_notifier_runs_for_each_delivery() {
    let (_system, camera) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let sub = Subscriber::with_notifier(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    camera.start_continuous_capture(&sub, 100.0).unwrap();
    assert!(wait_until(Duration::from_secs(5), || calls.load(Ordering::SeqCst) >= 3));
    camera.stop_continuous_capture(&sub);

    assert_eq!(calls.load(Ordering::SeqCst) as u64, sub.delivered());
}

#[test]
fn test_drop_releases_device() {
    let (system, camera) = setup();
    let sub = Subscriber::new();
    camera.start_continuous_capture(&sub, 10.0).unwrap();
    assert!(system.is_open(DEVICE));

    drop(camera);
    assert!(!system.is_open(DEVICE));
}

/// Subscriber whose notifier stalls once `armed` is set, holding the capture
/// thread inside the error fan-out.
fn stalling_subscriber(armed: &Arc<AtomicBool>, stall: Duration) -> Arc<Subscriber> {
    let armed = Arc::clone(armed);
    Subscriber::with_notifier(move || {
        if armed.load(Ordering::SeqCst) {
            std::thread::sleep(stall);
        }
    })
}

#[test]
fn test_stopped_is_observed_only_after_every_subscriber_has_the_error() {
    let (system, camera) = setup();
    let armed = Arc::new(AtomicBool::new(false));
    let a = stalling_subscriber(&armed, Duration::from_millis(150));
    let b = Subscriber::new();
    camera.start_continuous_capture(&a, 100.0).unwrap();
    camera.start_continuous_capture(&b, 100.0).unwrap();
    assert!(b.wait_frame(Duration::from_secs(5)).is_some());

    armed.store(true, Ordering::SeqCst);
    system.update_script(DEVICE, |s| s.disconnect_after = Some(0));

    assert!(wait_until(Duration::from_secs(5), || {
        camera.state() == CameraState::Stopped
    }));
    assert!(a.has_error());
    assert!(b.has_error());
}

#[test]
fn test_restart_during_error_fan_out_joins_a_fresh_session() {
    let (system, camera) = setup();
    let armed = Arc::new(AtomicBool::new(false));
    let a = stalling_subscriber(&armed, Duration::from_millis(200));
    let b = Subscriber::new();
    camera.start_continuous_capture(&a, 100.0).unwrap();
    camera.start_continuous_capture(&b, 100.0).unwrap();
    assert!(b.wait_frame(Duration::from_secs(5)).is_some());

    armed.store(true, Ordering::SeqCst);
    system.update_script(DEVICE, |s| s.disconnect_after = Some(0));

    // The set is drained while `a` is still being notified
    assert!(wait_until(Duration::from_secs(5), || camera.subscriber_count() == 0));
    system.update_script(DEVICE, |s| s.disconnect_after = None);
    camera.start_continuous_capture(&b, 100.0).unwrap();

    assert_eq!(camera.state(), CameraState::Capturing);
    assert_eq!(camera.subscriber_count(), 1);
    assert_eq!(system.sessions_opened(DEVICE), 2);
    assert!(!b.has_error());
    assert!(b.wait_frame(Duration::from_secs(5)).is_some());
    assert!(matches!(a.take_error(), Some(CameraError::DeviceDisconnected(_))));

    armed.store(false, Ordering::SeqCst);
    camera.stop_continuous_capture(&b);
    assert!(!system.is_open(DEVICE));
}

#[test]
fn test_capture_fails_when_device_yields_no_frame() {
    let (system, camera) = setup();

    system.update_script(DEVICE, |s| s.transient_failures = 1);
    assert!(matches!(camera.capture(), Err(CameraError::Capture(_))));
    assert!(!system.is_open(DEVICE));

    system.update_script(DEVICE, |s| s.disconnect_after = Some(0));
    assert!(matches!(camera.capture(), Err(CameraError::Capture(_))));
    assert!(!system.is_open(DEVICE));
    assert_eq!(camera.state(), CameraState::Stopped);
}

#[test]
fn test_stop_waits_for_in_flight_frame() {
    let (system, camera) = setup();
    system.update_script(DEVICE, |s| s.frame_interval = Duration::from_millis(150));
    let sub = Subscriber::new();

    camera.start_continuous_capture(&sub, 100.0).unwrap();
    assert!(sub.wait_frame(Duration::from_secs(5)).is_some());

    // The next read is already sleeping inside the device
    camera.stop_continuous_capture(&sub);
    assert!(!system.is_open(DEVICE));
    let delivered = sub.delivered();

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(sub.delivered(), delivered);
    assert!(!sub.has_error());
}
