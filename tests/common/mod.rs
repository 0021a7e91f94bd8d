//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use flexogear_rs::controller::{SessionHandle, SessionUpdate};
use flexogear_rs::types::ConnectionStatus;
use std::time::{Duration, Instant};

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Poll `condition` until it holds or the timeout expires
pub fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Wait until the device is connected and telemetry has arrived
pub fn wait_streaming(handle: &SessionHandle) -> bool {
    handle
        .wait_for(test_timeout(), |update| match update {
            SessionUpdate::Snapshot(snapshot) => {
                snapshot.status == ConnectionStatus::Connected && snapshot.telemetry.accepted > 0
            }
            _ => false,
        })
        .is_some()
}

/// Wait for the next finalized session
pub fn wait_finalized(handle: &SessionHandle) -> Option<SessionUpdate> {
    handle.wait_for(test_timeout(), |update| {
        matches!(update, SessionUpdate::Finalized { .. })
    })
}
