use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum NodeError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("serial link error: {0}")]
    Link(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Reasons a calibration request is refused.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("conversion factor {0} is too close to zero")]
    NearZeroFactor(f32),
    #[error("conversion factor is not finite")]
    NonFiniteFactor,
    #[error("calibration input is degenerate: {0}")]
    Degenerate(&'static str),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
