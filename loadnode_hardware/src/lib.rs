//! Backends for the force node: load-cell sources, key/value stores and
//! serial links.
//!
//! Everything here compiles on a host. The HX711 driver and the UART link
//! need the `hardware` feature (Linux, `rppal`).

pub mod error;
#[cfg(feature = "hardware")]
pub mod hx711;
pub mod link;
pub mod sim;
pub mod store;
#[cfg(feature = "hardware")]
pub mod uart;
pub mod util;

pub use link::StdioLink;
pub use sim::{SimParams, SimulatedSource};
pub use store::{FileStore, MemoryStore};
#[cfg(feature = "hardware")]
pub use uart::UartLink;

#[cfg(feature = "hardware")]
pub mod hardware {
    use std::time::Duration;

    use loadnode_traits::{BoxError, ForceSource};

    use crate::error::HwError;
    use crate::hx711::Hx711;
    use crate::util::{counts_to_force, mean_of, mean_within};

    /// Per-read wait while taring; the HX711 runs at 10 or 80 SPS.
    const TARE_READ_TIMEOUT: Duration = Duration::from_secs(1);

    /// HX711-backed force source.
    pub struct HardwareSource {
        hx711: Hx711,
        offset: f64,
        factor: f32,
        samples_per_read: u8,
        tare_samples: u16,
        max_retries: u8,
    }

    impl HardwareSource {
        pub fn try_new(
            dt_pin: u8,
            sck_pin: u8,
            gain_pulses: u8,
            samples_per_read: u8,
            tare_samples: u16,
        ) -> Result<Self, HwError> {
            let hx711 = Hx711::from_pins(dt_pin, sck_pin, gain_pulses)?;
            Ok(Self {
                hx711,
                offset: 0.0,
                factor: 1.0,
                samples_per_read: samples_per_read.max(1),
                tare_samples: tare_samples.max(1),
                max_retries: 3,
            })
        }

        pub fn offset(&self) -> f64 {
            self.offset
        }

        /// One raw read for taring, retried on data-ready timeouts.
        fn read_raw_retrying(&mut self, timeout: Duration) -> Result<i32, HwError> {
            let mut attempts = 0;
            loop {
                match self.hx711.read_with_timeout(timeout) {
                    Ok(raw) => return Ok(raw),
                    Err(HwError::DataReadyTimeout) if attempts < self.max_retries => {
                        attempts += 1;
                        tracing::warn!(retries = attempts, "load cell timeout, retrying");
                    }
                    Err(e) => {
                        tracing::error!("load cell read error: {}", e);
                        return Err(e);
                    }
                }
            }
        }
    }

    impl ForceSource for HardwareSource {
        fn tare(&mut self) -> Result<(), BoxError> {
            let n = usize::from(self.tare_samples);
            self.offset = mean_of(n, || self.read_raw_retrying(TARE_READ_TIMEOUT))?;
            tracing::info!(offset = self.offset, samples = n, "tare complete");
            Ok(())
        }

        /// All `samples_per_read` conversions must arrive within `timeout`.
        fn read_force(&mut self, timeout: Duration) -> Result<f32, BoxError> {
            let n = usize::from(self.samples_per_read);
            let hx711 = &mut self.hx711;
            let raw = mean_within(n, timeout, |left| hx711.read_with_timeout(left)).map_err(|e| {
                tracing::error!("load cell read error: {}", e);
                e
            })?;
            tracing::debug!(raw, "hx711 sample");
            Ok(counts_to_force(raw, self.offset, self.factor))
        }

        fn set_conversion_factor(&mut self, factor: f32) {
            self.factor = factor;
        }

        fn conversion_factor(&self) -> f32 {
            self.factor
        }
    }
}
