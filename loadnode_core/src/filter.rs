//! Two-stage force filter.
//!
//! Stage one keeps a circular moving average of the raw samples and uses it
//! as a step detector: a sample far from the average is passed straight
//! through instead of being smoothed. Stage two is an exponential smoother
//! whose output is only committed when it moves by more than the deadband.
//!
//! The window starts zero-filled. Right after tare the readings are near
//! zero anyway, so the first `window` cycles are biased toward zero on purpose.

use crate::config::FilterCfg;

/// Intermediate values of one `update`, kept for telemetry and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterTrace {
    pub raw: f32,
    pub average: f32,
    pub smoothed: f32,
    /// Value offered to the deadband: `raw` when bypassed, else `smoothed`.
    pub candidate: f32,
    pub bypassed: bool,
    pub committed: bool,
    pub clamped: bool,
    pub output: f32,
}

#[derive(Debug, Clone)]
pub struct ForceFilter {
    cfg: FilterCfg,
    window: Vec<f32>,
    write_index: usize,
    // f64 so that the incremental add/subtract does not drift over long runs
    running_sum: f64,
    last_valid_force: f32,
    last_trace: Option<FilterTrace>,
}

impl ForceFilter {
    /// Build a filter with a zero-filled window.
    ///
    /// Out-of-range settings are coerced (window >= 1, alpha in (0, 1]);
    /// call `FilterCfg::validate` first to reject them instead.
    pub fn new(mut cfg: FilterCfg) -> Self {
        cfg.window = cfg.window.max(1);
        if !(cfg.alpha > 0.0 && cfg.alpha <= 1.0) {
            cfg.alpha = FilterCfg::default().alpha;
        }
        Self {
            window: vec![0.0; cfg.window],
            cfg,
            write_index: 0,
            running_sum: 0.0,
            last_valid_force: 0.0,
            last_trace: None,
        }
    }

    pub fn cfg(&self) -> &FilterCfg {
        &self.cfg
    }

    /// Feed one raw sample and return the stable force estimate.
    ///
    /// `calibrated` enables the floor at zero; uncalibrated output keeps its
    /// sign so an operator can see polarity problems while calibrating.
    pub fn update(&mut self, raw_force: f32, calibrated: bool) -> f32 {
        if !raw_force.is_finite() {
            tracing::warn!(raw_force, "dropping non-finite force sample");
            return self.last_valid_force;
        }

        let average = self.push_sample(raw_force);

        let alpha = self.cfg.alpha;
        let smoothed = alpha * raw_force + (1.0 - alpha) * self.last_valid_force;

        let bypassed = (raw_force - average).abs() > self.cfg.outlier_threshold;
        let candidate = if bypassed { raw_force } else { smoothed };

        let committed = (candidate - self.last_valid_force).abs() > self.cfg.deadband;
        if committed {
            self.last_valid_force = candidate;
        }

        let clamped = calibrated && self.last_valid_force < 0.0;
        if clamped {
            self.last_valid_force = 0.0;
        }

        let trace = FilterTrace {
            raw: raw_force,
            average,
            smoothed,
            candidate,
            bypassed,
            committed,
            clamped,
            output: self.last_valid_force,
        };
        tracing::trace!(
            raw = trace.raw,
            average = trace.average,
            candidate = trace.candidate,
            bypassed,
            committed,
            output = trace.output,
            "filter step"
        );
        self.last_trace = Some(trace);
        self.last_valid_force
    }

    /// Overwrite the oldest slot with `sample` and return the new average.
    fn push_sample(&mut self, sample: f32) -> f32 {
        let n = self.window.len();
        debug_assert!(n > 0, "filter window unexpectedly empty");
        debug_assert!(self.write_index < n, "write index out of window");

        let slot = &mut self.window[self.write_index];
        self.running_sum -= f64::from(*slot);
        *slot = sample;
        self.running_sum += f64::from(sample);
        self.write_index = (self.write_index + 1) % n;

        (self.running_sum / n as f64) as f32
    }

    /// Current stable output.
    pub fn last_valid_force(&self) -> f32 {
        self.last_valid_force
    }

    /// Start from a known output instead of zero (used with a persisted
    /// calibration). The moving-average window is left untouched.
    pub fn seed(&mut self, last_valid_force: f32) {
        if last_valid_force.is_finite() {
            self.last_valid_force = last_valid_force;
        }
    }

    /// Mean of the window as of the last update.
    pub fn average(&self) -> f32 {
        (self.running_sum / self.window.len() as f64) as f32
    }

    pub fn running_sum(&self) -> f64 {
        self.running_sum
    }

    /// Window contents in storage order (not chronological).
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn last_trace(&self) -> Option<&FilterTrace> {
        self.last_trace.as_ref()
    }

    /// Back to the startup state: zero window, zero output.
    pub fn reset(&mut self) {
        self.window.iter_mut().for_each(|s| *s = 0.0);
        self.write_index = 0;
        self.running_sum = 0.0;
        self.last_valid_force = 0.0;
        self.last_trace = None;
    }
}

impl Default for ForceFilter {
    fn default() -> Self {
        Self::new(FilterCfg::default())
    }
}
