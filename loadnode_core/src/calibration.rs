//! Calibration parameters, their persistence, and the calibration state machine.
//!
//! The conversion factor maps raw transducer counts to force units
//! (`force = counts / factor`). It is persisted together with the stable
//! force observed when the factor was last set; a non-zero value of the
//! latter is what marks the node as calibrated after a restart.

use loadnode_traits::{ForceSource, KvStore};

use crate::config::CalibrationCfg;
use crate::error::CalibrationError;

/// Storage key of the conversion factor.
pub const KEY_CONVERSION_FACTOR: &str = "conversionFactor";
/// Storage key of the stable force recorded at calibration time.
pub const KEY_CALIBRATED_FORCE: &str = "calibratedForce";

pub const DEFAULT_CONVERSION_FACTOR: f32 = 1.0;
pub const DEFAULT_CALIBRATED_FORCE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParameters {
    pub conversion_factor: f32,
    pub calibrated_force: f32,
    pub is_calibrated: bool,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            conversion_factor: DEFAULT_CONVERSION_FACTOR,
            calibrated_force: DEFAULT_CALIBRATED_FORCE,
            is_calibrated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Uncalibrated,
    Calibrated,
}

/// Loads and saves `CalibrationParameters` through a `KvStore`.
///
/// Store failures never abort the node: reads fall back to the defaults and
/// writes are logged and dropped.
#[derive(Debug)]
pub struct CalibrationStore<K: KvStore> {
    kv: K,
    cfg: CalibrationCfg,
}

impl<K: KvStore> CalibrationStore<K> {
    pub fn new(kv: K, cfg: CalibrationCfg) -> Self {
        Self { kv, cfg }
    }

    /// Read the persisted parameters, healing an unusable conversion factor.
    ///
    /// A factor that is non-finite or within `min_factor` of zero is replaced
    /// by 1.0 and the replacement is written back immediately.
    pub fn load(&mut self) -> CalibrationParameters {
        let mut factor = self.read(KEY_CONVERSION_FACTOR, DEFAULT_CONVERSION_FACTOR);
        let calibrated_force = self.read(KEY_CALIBRATED_FORCE, DEFAULT_CALIBRATED_FORCE);

        if !factor.is_finite() || factor.abs() < self.cfg.min_factor {
            tracing::warn!(
                stored = factor,
                replacement = DEFAULT_CONVERSION_FACTOR,
                "persisted conversion factor unusable; resetting"
            );
            factor = DEFAULT_CONVERSION_FACTOR;
            self.write(KEY_CONVERSION_FACTOR, factor);
        }

        let calibrated_force = if calibrated_force.is_finite() {
            calibrated_force
        } else {
            DEFAULT_CALIBRATED_FORCE
        };

        let params = CalibrationParameters {
            conversion_factor: factor,
            calibrated_force,
            is_calibrated: calibrated_force != 0.0,
        };
        tracing::debug!(
            factor = params.conversion_factor,
            calibrated_force = params.calibrated_force,
            calibrated = params.is_calibrated,
            "calibration loaded"
        );
        params
    }

    /// Persist both parameters as two independent writes.
    pub fn save(&mut self, params: &CalibrationParameters) {
        self.save_factor(params.conversion_factor);
        self.save_calibrated_force(params.calibrated_force);
    }

    pub fn save_factor(&mut self, factor: f32) {
        self.write(KEY_CONVERSION_FACTOR, factor);
    }

    pub fn save_calibrated_force(&mut self, force: f32) {
        self.write(KEY_CALIBRATED_FORCE, force);
    }

    pub fn cfg(&self) -> &CalibrationCfg {
        &self.cfg
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    fn read(&self, key: &str, default: f32) -> f32 {
        match self.kv.get_float(key, default) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed; using default");
                default
            }
        }
    }

    fn write(&mut self, key: &str, value: f32) {
        if let Err(e) = self.kv.put_float(key, value) {
            tracing::warn!(key, value, error = %e, "store write failed");
        }
    }
}

/// Owns the live calibration and applies operator requests to it.
///
/// `Uncalibrated -> Calibrated` and `Calibrated -> Calibrated` both happen
/// through `set_scale`; nothing moves the machine back.
#[derive(Debug)]
pub struct CalibrationController<K: KvStore> {
    store: CalibrationStore<K>,
    params: CalibrationParameters,
}

impl<K: KvStore> CalibrationController<K> {
    /// Initial state comes from the store.
    pub fn load(mut store: CalibrationStore<K>) -> Self {
        let params = store.load();
        Self { store, params }
    }

    pub fn state(&self) -> CalibrationState {
        if self.params.is_calibrated {
            CalibrationState::Calibrated
        } else {
            CalibrationState::Uncalibrated
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.params.is_calibrated
    }

    pub fn params(&self) -> &CalibrationParameters {
        &self.params
    }

    pub fn conversion_factor(&self) -> f32 {
        self.params.conversion_factor
    }

    pub fn store(&self) -> &CalibrationStore<K> {
        &self.store
    }

    /// Push the live factor into the source (startup wiring).
    pub fn apply_to<S: ForceSource + ?Sized>(&self, source: &mut S) {
        source.set_conversion_factor(self.params.conversion_factor);
    }

    /// Take `factor` as the new conversion factor.
    ///
    /// The factor goes to the source and the store at once; then
    /// `stable_force` (the filter output at this instant) is stored as the
    /// calibrated force. Factors the store would reset on the next boot are
    /// refused and leave the state unchanged.
    pub fn set_scale<S: ForceSource + ?Sized>(
        &mut self,
        factor: f32,
        source: &mut S,
        stable_force: f32,
    ) -> Result<CalibrationState, CalibrationError> {
        if !factor.is_finite() {
            return Err(CalibrationError::NonFiniteFactor);
        }
        if factor.abs() < self.store.cfg().min_factor {
            return Err(CalibrationError::NearZeroFactor(factor));
        }

        let previous = self.state();
        source.set_conversion_factor(factor);
        self.params.conversion_factor = factor;
        self.store.save_factor(factor);

        self.params.is_calibrated = true;
        self.params.calibrated_force = stable_force;
        self.store.save_calibrated_force(stable_force);

        tracing::info!(
            factor,
            calibrated_force = stable_force,
            from = ?previous,
            "conversion factor updated"
        );
        Ok(CalibrationState::Calibrated)
    }
}

/// New conversion factor from two readings taken under the current factor:
/// one unloaded, one under a known reference load.
///
/// Readings are in force units, so the raw span is `(loaded - zero) * current`
/// and the factor that maps it onto `known_load` is that span over the load.
/// Factors the node would refuse (below `min_factor` in magnitude) are
/// rejected here too.
pub fn two_point_factor(
    zero_reading: f32,
    loaded_reading: f32,
    known_load: f32,
    current_factor: f32,
    min_factor: f32,
) -> Result<f32, CalibrationError> {
    if !(zero_reading.is_finite()
        && loaded_reading.is_finite()
        && known_load.is_finite()
        && current_factor.is_finite())
    {
        return Err(CalibrationError::NonFiniteFactor);
    }
    if known_load == 0.0 {
        return Err(CalibrationError::Degenerate("known load is zero"));
    }
    if loaded_reading == zero_reading {
        return Err(CalibrationError::Degenerate("loaded reading equals zero reading"));
    }
    let factor = current_factor * (loaded_reading - zero_reading) / known_load;
    if !factor.is_finite() {
        return Err(CalibrationError::NonFiniteFactor);
    }
    if factor.abs() < min_factor {
        return Err(CalibrationError::NearZeroFactor(factor));
    }
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: f32 = 1e-10;

    #[test]
    fn two_point_with_unit_factor_is_span_over_load() {
        let f = two_point_factor(0.5, 200.5, 100.0, 1.0, MIN).expect("factor");
        assert!((f - 2.0).abs() < 1e-6);
    }

    #[test]
    fn two_point_scales_with_current_factor() {
        // Readings taken under factor 4 correspond to raw span 800.
        let f = two_point_factor(0.0, 200.0, 100.0, 4.0, MIN).expect("factor");
        assert!((f - 8.0).abs() < 1e-6);
    }

    #[test]
    fn two_point_rejects_degenerate_input() {
        assert!(matches!(
            two_point_factor(0.0, 1.0, 0.0, 1.0, MIN),
            Err(CalibrationError::Degenerate(_))
        ));
        assert!(matches!(
            two_point_factor(3.0, 3.0, 1.0, 1.0, MIN),
            Err(CalibrationError::Degenerate(_))
        ));
        assert_eq!(
            two_point_factor(f32::NAN, 3.0, 1.0, 1.0, MIN),
            Err(CalibrationError::NonFiniteFactor)
        );
    }

    #[test]
    fn two_point_rejects_factor_below_min() {
        // 1e-8 is usable at the default floor but not at 1e-6.
        assert!(two_point_factor(0.0, 1e-6, 100.0, 1.0, MIN).is_ok());
        assert!(matches!(
            two_point_factor(0.0, 1e-6, 100.0, 1.0, 1e-6),
            Err(CalibrationError::NearZeroFactor(_))
        ));
    }
}
