#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and reference-load calibration parsing for the force node.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; missing keys take the firmware defaults.
//! - The reference CSV loader enforces headers and performs a robust refit
//!   to reduce outlier influence before slope/intercept estimation.
use serde::Deserialize;

/// Reference calibration CSV schema.
///
/// Expected headers:
/// reading,load
///
/// `reading` is the telemetry force reported under the current conversion
/// factor, `load` the known reference load that was on the cell.
///
/// Example:
/// reading,load
/// 0.02,0.0
/// 49.80,100.0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ReferenceRow {
    pub reading: f32,
    pub load: f32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FilterCfg {
    /// Moving average window (samples).
    pub window: usize,
    /// EMA weight on the newest sample, (0.0, 1.0].
    pub alpha: f32,
    /// Raw-vs-average distance above which smoothing is bypassed.
    pub outlier_threshold: f32,
    /// Minimum change before the stable output moves.
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

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NodeCfg {
    /// Pause between loop cycles.
    pub cadence_ms: u64,
    /// Key namespace in the persistent store.
    pub namespace: String,
}

impl Default for NodeCfg {
    fn default() -> Self {
        Self {
            cadence_ms: 12,
            namespace: "HX711".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Timeouts {
    /// Max wait per sensor read (ms). Also accepts alias "sample_ms".
    #[serde(alias = "sample_ms")]
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 500 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Persisted factors with a smaller magnitude are reset to 1.0 on load.
    pub min_factor: f32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self { min_factor: 1e-10 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Storage {
    /// TOML file holding the persisted key/value pairs.
    pub path: String,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            path: "loadnode_store.toml".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    /// Extra clock pulses after each read: 1 = A/128, 2 = B/32, 3 = A/64.
    #[serde(default = "default_gain_pulses")]
    pub gain_pulses: u8,
    /// Raw reads averaged into one force sample.
    #[serde(default = "default_samples_per_read")]
    pub samples_per_read: u8,
    /// Raw reads averaged for the tare baseline.
    #[serde(default = "default_tare_samples")]
    pub tare_samples: u16,
}

fn default_gain_pulses() -> u8 {
    1
}

fn default_samples_per_read() -> u8 {
    2
}

fn default_tare_samples() -> u16 {
    10
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Serial {
    pub baud: u32,
}

impl Default for Serial {
    fn default() -> Self {
        Self { baud: 115_200 }
    }
}

/// Synthetic load used when no hardware backend is compiled in.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Simulation {
    /// Load present after tare, in force units.
    pub base_load: f32,
    /// Peak amplitude of the deterministic noise.
    pub noise: f32,
    /// Extra load applied from `step_at_cycle` on.
    pub step_load: f32,
    pub step_at_cycle: u64,
    /// Raw counts per force unit of the simulated cell.
    pub counts_per_unit: f32,
    /// Make every read from this index on time out.
    pub stall_after_reads: Option<u64>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            base_load: 0.0,
            noise: 0.02,
            step_load: 0.0,
            step_at_cycle: 0,
            counts_per_unit: 1.0,
            stall_after_reads: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub filter: FilterCfg,
    pub node: NodeCfg,
    pub timeouts: Timeouts,
    pub calibration: CalibrationCfg,
    pub storage: Storage,
    /// Required only by the hardware backend.
    pub pins: Option<Pins>,
    pub serial: Serial,
    pub sim: Simulation,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse `path`; a missing file yields the defaults.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(text) => load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(eyre::eyre!("read config {:?}: {}", path, e)),
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Filter
        if self.filter.window == 0 {
            eyre::bail!("filter.window must be >= 1");
        }
        if !(self.filter.alpha > 0.0 && self.filter.alpha <= 1.0) {
            eyre::bail!("filter.alpha must be in (0.0, 1.0]");
        }
        if !self.filter.outlier_threshold.is_finite() || self.filter.outlier_threshold < 0.0 {
            eyre::bail!("filter.outlier_threshold must be finite and >= 0");
        }
        if !self.filter.deadband.is_finite() || self.filter.deadband < 0.0 {
            eyre::bail!("filter.deadband must be finite and >= 0");
        }

        // Node
        if self.node.cadence_ms > 60_000 {
            eyre::bail!("node.cadence_ms is unreasonably large (>60s)");
        }
        if self.node.namespace.trim().is_empty() {
            eyre::bail!("node.namespace must not be empty");
        }

        // Timeouts
        if self.timeouts.sensor_ms == 0 {
            eyre::bail!("timeouts.sensor_ms must be >= 1");
        }

        // Calibration
        if !(self.calibration.min_factor.is_finite() && self.calibration.min_factor > 0.0) {
            eyre::bail!("calibration.min_factor must be finite and > 0");
        }

        // Storage
        if self.storage.path.trim().is_empty() {
            eyre::bail!("storage.path must not be empty");
        }

        // Pins
        if let Some(pins) = &self.pins {
            if pins.hx711_dt == pins.hx711_sck {
                eyre::bail!("pins.hx711_dt and pins.hx711_sck must differ");
            }
            if !(1..=3).contains(&pins.gain_pulses) {
                eyre::bail!("pins.gain_pulses must be 1, 2 or 3");
            }
            if pins.samples_per_read == 0 {
                eyre::bail!("pins.samples_per_read must be >= 1");
            }
            if pins.tare_samples == 0 {
                eyre::bail!("pins.tare_samples must be >= 1");
            }
        }

        // Serial
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }

        // Simulation
        if !self.sim.counts_per_unit.is_finite() || self.sim.counts_per_unit == 0.0 {
            eyre::bail!("sim.counts_per_unit must be finite and non-zero");
        }
        if !self.sim.noise.is_finite() || self.sim.noise < 0.0 {
            eyre::bail!("sim.noise must be finite and >= 0");
        }

        // Logging
        if let Some(rot) = &self.logging.rotation {
            if !matches!(rot.as_str(), "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly");
            }
        }

        Ok(())
    }
}

/// Linear relation between telemetry readings and reference loads:
/// `load = slope * reading + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFit {
    pub slope: f64,
    pub intercept: f64,
    /// Rows kept after outlier rejection.
    pub inliers: usize,
}

impl ReferenceFit {
    /// Fit by ordinary least squares on all rows, then refit once without
    /// rows whose residual exceeds 2x the RMS residual.
    pub fn from_rows(rows: Vec<ReferenceRow>) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("reference fit requires at least two rows, got {}", rows.len());
        }
        if let Some(i) = rows
            .iter()
            .position(|r| !(r.reading.is_finite() && r.load.is_finite()))
        {
            eyre::bail!("reference row {} has a non-finite value", i);
        }

        let pts: Vec<(f64, f64)> = rows
            .iter()
            .map(|r| (f64::from(r.reading), f64::from(r.load)))
            .collect();
        let (a0, b0) = ols(&pts)?;

        let sumsq: f64 = pts
            .iter()
            .map(|(x, y)| {
                let r = y - (a0 * x + b0);
                r * r
            })
            .sum();
        let rms = (sumsq / pts.len() as f64).sqrt();

        let (slope, intercept, inliers) =
            robust_refit(&pts, a0, b0, rms, 2.0).unwrap_or((a0, b0, pts.len()));

        Ok(Self {
            slope,
            intercept,
            inliers,
        })
    }

    /// Conversion factor that makes readings equal loads, given the factor
    /// the readings were taken under. Factors smaller in magnitude than
    /// `min_factor` are refused, as the node would refuse them.
    pub fn factor_for(&self, current_factor: f32, min_factor: f32) -> eyre::Result<f32> {
        if !current_factor.is_finite() || current_factor == 0.0 {
            eyre::bail!("current conversion factor must be finite and non-zero");
        }
        let factor = (f64::from(current_factor) / self.slope) as f32;
        if !factor.is_finite() || factor.abs() < min_factor {
            eyre::bail!("fitted conversion factor is not usable: {}", factor);
        }
        Ok(factor)
    }
}

/// Least-squares slope and intercept, computed in f64.
fn ols(pts: &[(f64, f64)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (x, y) in pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("reference fit cannot determine slope (all readings equal)");
    }
    let a = sxy / sxx;
    if !a.is_finite() || a == 0.0 {
        eyre::bail!("reference fit produced zero or non-finite slope");
    }
    Ok((a, mean_y - a * mean_x))
}

/// Single-step robust refit: drop points with |residual| > k * rms around
/// the initial line and refit the rest with an online (Welford/Chan)
/// covariance update. Returns None when nothing was rejected, fewer than two
/// inliers remain, or the inlier fit is degenerate.
fn robust_refit(
    pts: &[(f64, f64)],
    a0: f64,
    b0: f64,
    rms: f64,
    k: f64,
) -> Option<(f64, f64, usize)> {
    if !(rms.is_finite() && rms > 0.0) {
        return None;
    }
    let thr = k * rms;
    let mut n_in: usize = 0;
    let mut mean_x = 0.0f64;
    let mut mean_y = 0.0f64;
    let mut cxx = 0.0f64;
    let mut cxy = 0.0f64;

    for (x, y) in pts {
        if (y - (a0 * x + b0)).abs() > thr {
            continue;
        }
        n_in += 1;
        let n_new = n_in as f64;
        let dx = x - mean_x;
        let dy = y - mean_y;
        mean_x += dx / n_new;
        mean_y += dy / n_new;
        cxx += dx * (x - mean_x);
        cxy += dx * (y - mean_y);
    }

    if n_in < 2 || n_in == pts.len() || !cxx.is_finite() || cxx == 0.0 {
        return None;
    }
    let a = cxy / cxx;
    if !a.is_finite() || a == 0.0 {
        return None;
    }
    Some((a, mean_y - a * mean_x, n_in))
}

impl TryFrom<Vec<ReferenceRow>> for ReferenceFit {
    type Error = eyre::Report;
    fn try_from(rows: Vec<ReferenceRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_reference_csv(path: &std::path::Path) -> eyre::Result<ReferenceFit> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open reference CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["reading", "load"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "reference CSV must have headers 'reading,load', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ReferenceRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    ReferenceFit::try_from(rows)
}
