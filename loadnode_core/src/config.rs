//! Runtime configuration types for the node.
//!
//! These are the structs consumed by `ForceFilter`, `CalibrationController`
//! and `ForceNode`. They are separate from the TOML-deserialized config in
//! `loadnode_config`; see `conversions` for the bridge.

/// Filter configuration for signal conditioning.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCfg {
    /// Moving average window size in samples.
    pub window: usize,
    /// EMA weight on the newest sample. Range: (0.0, 1.0].
    pub alpha: f32,
    /// A raw sample further than this from the moving average is taken as a
    /// genuine step and bypasses smoothing.
    pub outlier_threshold: f32,
    /// Minimum change of the stable output before it is updated.
    pub deadband: f32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            window: 10,
            alpha: 0.94,
            outlier_threshold: 0.1,
            deadband: 0.100,
        }
    }
}

impl FilterCfg {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.window == 0 {
            return Err("filter.window must be >= 1");
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err("filter.alpha must be in (0.0, 1.0]");
        }
        if !self.outlier_threshold.is_finite() || self.outlier_threshold < 0.0 {
            return Err("filter.outlier_threshold must be finite and >= 0");
        }
        if !self.deadband.is_finite() || self.deadband < 0.0 {
            return Err("filter.deadband must be finite and >= 0");
        }
        Ok(())
    }
}

/// Persisted calibration settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationCfg {
    /// Factors with a magnitude below this are treated as unset.
    pub min_factor: f32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self { min_factor: 1e-10 }
    }
}

/// Main loop pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCfg {
    /// Pause between cycles in milliseconds.
    pub cadence_ms: u64,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self { cadence_ms: 12 }
    }
}

/// Timeouts and watchdogs.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeouts {
    /// Max sensor wait per read (ms).
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 500 }
    }
}
