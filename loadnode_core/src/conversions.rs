//! `From` implementations bridging `loadnode_config` types to `loadnode_core` types.

use crate::config::{CalibrationCfg, FilterCfg, LoopCfg, Timeouts};

impl From<&loadnode_config::FilterCfg> for FilterCfg {
    fn from(c: &loadnode_config::FilterCfg) -> Self {
        Self {
            window: c.window,
            alpha: c.alpha,
            outlier_threshold: c.outlier_threshold,
            deadband: c.deadband,
        }
    }
}

impl From<&loadnode_config::NodeCfg> for LoopCfg {
    fn from(c: &loadnode_config::NodeCfg) -> Self {
        Self {
            cadence_ms: c.cadence_ms,
        }
    }
}

impl From<&loadnode_config::Timeouts> for Timeouts {
    fn from(c: &loadnode_config::Timeouts) -> Self {
        Self {
            sensor_ms: c.sensor_ms,
        }
    }
}

impl From<&loadnode_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &loadnode_config::CalibrationCfg) -> Self {
        Self {
            min_factor: c.min_factor,
        }
    }
}
