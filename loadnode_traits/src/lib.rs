//! Collaborator contracts for the force-sensing node.
//!
//! The core never talks to GPIO, flash or a UART directly. Everything it
//! needs from the outside world goes through the three traits below, using
//! boxed errors at the boundary so backends stay free to pick their own error
//! types.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A load-cell front end that yields calibrated force samples.
pub trait ForceSource {
    /// Capture the zero baseline. Called once at startup, with the cell unloaded.
    fn tare(&mut self) -> Result<(), BoxError>;

    /// Wait (at most `timeout`) for the next reading and return it in force
    /// units: raw counts minus the tare baseline, divided by the conversion
    /// factor, with the sign flipped so that the expected load direction reads
    /// positive.
    fn read_force(&mut self, timeout: std::time::Duration) -> Result<f32, BoxError>;

    fn set_conversion_factor(&mut self, factor: f32);

    fn conversion_factor(&self) -> f32;
}

/// Non-volatile float storage, addressed by key.
pub trait KvStore {
    /// Stored value for `key`, or `default` when the key was never written.
    fn get_float(&self, key: &str, default: f32) -> Result<f32, BoxError>;

    fn put_float(&mut self, key: &str, value: f32) -> Result<(), BoxError>;
}

/// Byte-oriented serial channel.
pub trait SerialLink {
    /// Next pending inbound byte, or `None` when nothing is buffered. Never blocks.
    fn poll_byte(&mut self) -> Result<Option<u8>, BoxError>;

    /// Write `line` followed by a line terminator and flush.
    fn write_line(&mut self, line: &str) -> Result<(), BoxError>;
}

impl<T: ForceSource + ?Sized> ForceSource for Box<T> {
    fn tare(&mut self) -> Result<(), BoxError> {
        (**self).tare()
    }
    fn read_force(&mut self, timeout: std::time::Duration) -> Result<f32, BoxError> {
        (**self).read_force(timeout)
    }
    fn set_conversion_factor(&mut self, factor: f32) {
        (**self).set_conversion_factor(factor);
    }
    fn conversion_factor(&self) -> f32 {
        (**self).conversion_factor()
    }
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get_float(&self, key: &str, default: f32) -> Result<f32, BoxError> {
        (**self).get_float(key, default)
    }
    fn put_float(&mut self, key: &str, value: f32) -> Result<(), BoxError> {
        (**self).put_float(key, value)
    }
}

impl<T: SerialLink + ?Sized> SerialLink for Box<T> {
    fn poll_byte(&mut self) -> Result<Option<u8>, BoxError> {
        (**self).poll_byte()
    }
    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        (**self).write_line(line)
    }
}
