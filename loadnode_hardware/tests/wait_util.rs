use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use loadnode_hardware::error::HwError;
use loadnode_hardware::util::wait_until_low_with_timeout;

#[test]
fn returns_once_data_line_drops() {
    let high = Arc::new(AtomicBool::new(true));
    let high_bg = Arc::clone(&high);
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_until_low_with_timeout(
        || high.load(Ordering::Relaxed),
        Duration::from_millis(200),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn stuck_high_line_times_out_promptly() {
    let start = Instant::now();
    let err = wait_until_low_with_timeout(|| true, Duration::from_millis(5), Duration::from_micros(200))
        .expect_err("expected timeout error");
    assert!(matches!(err, HwError::DataReadyTimeout), "unexpected error: {err:?}");
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn already_low_line_does_not_wait() {
    let mut calls = 0;
    wait_until_low_with_timeout(
        || {
            calls += 1;
            false
        },
        Duration::ZERO,
        Duration::from_millis(50),
    )
    .unwrap();
    assert_eq!(calls, 1);
}
