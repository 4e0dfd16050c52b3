//! Test and helper mocks for loadnode_core.

use std::collections::VecDeque;
use std::time::Duration;

use loadnode_traits::{BoxError, ForceSource, SerialLink};

/// A source that always times out; useful to exercise the sensor error path.
pub struct NoopSource;

impl ForceSource for NoopSource {
    fn tare(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
    fn read_force(&mut self, _timeout: Duration) -> Result<f32, BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "noop source timeout",
        )))
    }
    fn set_conversion_factor(&mut self, _factor: f32) {}
    fn conversion_factor(&self) -> f32 {
        1.0
    }
}

/// Source that replays a fixed sequence of forces, then repeats the last one.
///
/// Values are returned as-is; the factor is only recorded.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    seq: Vec<f32>,
    idx: usize,
    factor: f32,
    pub tares: usize,
}

impl ScriptedSource {
    pub fn new(seq: impl Into<Vec<f32>>) -> Self {
        Self {
            seq: seq.into(),
            idx: 0,
            factor: 1.0,
            tares: 0,
        }
    }
}

impl ForceSource for ScriptedSource {
    fn tare(&mut self) -> Result<(), BoxError> {
        self.tares += 1;
        Ok(())
    }
    fn read_force(&mut self, _timeout: Duration) -> Result<f32, BoxError> {
        let v = if self.idx < self.seq.len() {
            let x = self.seq[self.idx];
            self.idx += 1;
            x
        } else {
            self.seq.last().copied().unwrap_or(0.0)
        };
        Ok(v)
    }
    fn set_conversion_factor(&mut self, factor: f32) {
        self.factor = factor;
    }
    fn conversion_factor(&self) -> f32 {
        self.factor
    }
}

/// In-memory serial link: queued inbound bytes, captured outbound lines.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    inbound: VecDeque<u8>,
    pub lines: Vec<String>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the host had sent them.
    pub fn send(&mut self, bytes: &str) {
        self.inbound.extend(bytes.bytes());
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

impl SerialLink for ScriptedLink {
    fn poll_byte(&mut self) -> Result<Option<u8>, BoxError> {
        Ok(self.inbound.pop_front())
    }
    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        self.lines.push(line.to_string());
        Ok(())
    }
}
