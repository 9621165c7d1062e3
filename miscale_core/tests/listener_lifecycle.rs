//! Listener thread lifecycle: clean shutdown, ordering, error forwarding.

use miscale_core::FrameListener;
use miscale_core::error::ScaleError;
use miscale_traits::{FrameSource, ManualClock, RawFrame, gatt};
use miscale_transport::{ReplayTransport, ScriptedFrame};
use std::time::Duration;

struct Silent;

impl FrameSource for Silent {
    fn next_frame(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<RawFrame>, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(timeout);
        Ok(None)
    }
}

fn script(n: u8) -> Vec<ScriptedFrame> {
    (0..n)
        .map(|i| ScriptedFrame {
            at_ms: u64::from(i) * 10,
            characteristic: gatt::STANDARD_MEASUREMENT,
            payload: vec![i],
        })
        .collect()
}

#[test]
fn listener_thread_exits_on_drop() {
    let listener = FrameListener::spawn(Silent, Duration::from_millis(20), 4);
    std::thread::sleep(Duration::from_millis(30));
    assert!(listener.recv_timeout(Duration::from_millis(10)).unwrap().is_none());
    drop(listener);
}

#[test]
fn listener_with_full_channel_still_shuts_down() {
    let clock = ManualClock::new();
    let listener = FrameListener::spawn(
        ReplayTransport::new(script(50), clock),
        Duration::from_millis(20),
        1,
    );
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(listener.pending(), 1);
    drop(listener);
}

#[test]
fn frames_arrive_in_order_without_loss() {
    let clock = ManualClock::new();
    let listener = FrameListener::spawn(
        ReplayTransport::new(script(30), clock),
        Duration::from_millis(20),
        1,
    );
    let mut seen = Vec::new();
    while seen.len() < 30 {
        if let Some(f) = listener.recv_timeout(Duration::from_secs(2)).unwrap() {
            seen.push(f.payload[0]);
        }
    }
    assert_eq!(seen, (0..30).collect::<Vec<u8>>());
}

#[test]
fn transport_error_is_forwarded_then_disconnected() {
    let clock = ManualClock::new();
    let listener = FrameListener::spawn(
        ReplayTransport::new(script(1), clock).disconnect_when_exhausted(true),
        Duration::from_millis(20),
        4,
    );
    let first = listener.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(first.is_some());
    let err = listener.recv_timeout(Duration::from_secs(2)).unwrap_err();
    assert_eq!(err, ScaleError::Disconnected);
    let err = listener.recv_timeout(Duration::from_secs(2)).unwrap_err();
    assert_eq!(err, ScaleError::Disconnected);
}
