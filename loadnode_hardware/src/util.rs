use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Block until `is_high` reports the data line low, sleeping `poll_interval`
/// between checks. Fails with `DataReadyTimeout` once `timeout` has passed.
pub fn wait_until_low_with_timeout(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_high() {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Raw ADC counts to force units.
///
/// The cell is mounted so that load pulls the reading below the tare
/// baseline, hence the sign flip.
#[inline]
pub fn counts_to_force(raw: f64, offset: f64, factor: f32) -> f32 {
    (-(raw - offset) / f64::from(factor)) as f32
}

/// Mean of `n` readings produced by `read`, stopping at the first error.
pub fn mean_of(n: usize, mut read: impl FnMut() -> Result<i32>) -> Result<f64> {
    let n = n.max(1);
    let mut sum = 0i64;
    for _ in 0..n {
        sum += i64::from(read()?);
    }
    Ok(sum as f64 / n as f64)
}

/// Like `mean_of`, but all `n` readings share one `timeout`. Each call to
/// `read` gets the time still left; once none is left the mean fails with
/// `Timeout`.
pub fn mean_within(
    n: usize,
    timeout: Duration,
    mut read: impl FnMut(Duration) -> Result<i32>,
) -> Result<f64> {
    let deadline = Instant::now() + timeout;
    mean_of(n, || {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(HwError::Timeout);
        }
        read(left)
    })
}
