//! Synthetic load cell for host runs and tests.

use std::time::Duration;

use loadnode_traits::{BoxError, ForceSource};

use crate::error::HwError;
use crate::util::{counts_to_force, mean_of};

/// Raw reading of the unloaded simulated cell.
pub const ZERO_COUNTS: i32 = 84_210;

/// Parameters of the simulated signal, in force units.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub base_load: f32,
    /// Peak amplitude of the noise added to every read.
    pub noise: f32,
    pub step_load: f32,
    /// Read index from which `step_load` is added.
    pub step_at: u64,
    pub counts_per_unit: f32,
    /// Fail every read from this index on, as a wedged converter would.
    pub stall_after: Option<u64>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            base_load: 0.0,
            noise: 0.0,
            step_load: 0.0,
            step_at: 0,
            counts_per_unit: 1.0,
            stall_after: None,
        }
    }
}

/// Deterministic stand-in for an HX711 with a load on it.
///
/// Raw counts drop by `counts_per_unit` per unit of load, so with the
/// conversion factor set to `counts_per_unit` the source reports the
/// configured load. Noise comes from a fixed-seed xorshift, so runs repeat.
#[derive(Debug)]
pub struct SimulatedSource {
    params: SimParams,
    offset: f64,
    factor: f32,
    reads: u64,
    rng: u32,
}

impl SimulatedSource {
    pub fn new(params: SimParams) -> Self {
        Self {
            params,
            offset: 0.0,
            factor: 1.0,
            reads: 0,
            rng: 0x9E37_79B9,
        }
    }

    /// Number of force reads served so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    fn next_noise(&mut self) -> f32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        // map to [-1, 1]
        let unit = (x as f32 / u32::MAX as f32) * 2.0 - 1.0;
        unit * self.params.noise
    }

    fn raw_counts(&mut self, load: f32) -> i32 {
        let noisy = load + self.next_noise();
        ZERO_COUNTS - (noisy * self.params.counts_per_unit).round() as i32
    }

    fn load_at(&self, index: u64) -> f32 {
        if self.params.step_load != 0.0 && index >= self.params.step_at {
            self.params.base_load + self.params.step_load
        } else {
            self.params.base_load
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(SimParams::default())
    }
}

impl ForceSource for SimulatedSource {
    fn tare(&mut self) -> Result<(), BoxError> {
        // The cell is unloaded while taring.
        self.offset = mean_of(10, || Ok(self.raw_counts(0.0)))?;
        tracing::debug!(offset = self.offset, "simulated tare");
        Ok(())
    }

    fn read_force(&mut self, _timeout: Duration) -> Result<f32, BoxError> {
        let index = self.reads;
        if self.params.stall_after.is_some_and(|n| index >= n) {
            return Err(Box::new(HwError::Timeout));
        }
        self.reads += 1;
        let load = self.load_at(index);
        let raw = self.raw_counts(load);
        Ok(counts_to_force(f64::from(raw), self.offset, self.factor))
    }

    fn set_conversion_factor(&mut self, factor: f32) {
        self.factor = factor;
    }

    fn conversion_factor(&self) -> f32 {
        self.factor
    }
}
