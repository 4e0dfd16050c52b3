//! The per-cycle loop: command, sense, filter, telemetry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::WrapErr;
use loadnode_traits::{Clock, ForceSource, KvStore, MonotonicClock, SerialLink};

use crate::calibration::CalibrationController;
use crate::config::{LoopCfg, Timeouts};
use crate::error::Result;
use crate::filter::ForceFilter;
use crate::hw_error::{Boundary, map_boxed};
use crate::protocol::{self, Command, Frame, TelemetrySample};

/// A force-sensing node: one source, one store, one serial link.
///
/// All mutable state lives here and is only touched from the thread calling
/// `step`; a cycle never overlaps the next one.
pub struct ForceNode<S, K, L, C = MonotonicClock>
where
    S: ForceSource,
    K: KvStore,
    L: SerialLink,
    C: Clock,
{
    pub(crate) source: S,
    pub(crate) link: L,
    pub(crate) controller: CalibrationController<K>,
    pub(crate) filter: ForceFilter,
    pub(crate) looping: LoopCfg,
    pub(crate) timeouts: Timeouts,
    pub(crate) clock: C,
    pub(crate) epoch: Instant,
    pub(crate) cycles: u64,
}

impl<S, K, L, C> core::fmt::Debug for ForceNode<S, K, L, C>
where
    S: ForceSource,
    K: KvStore,
    L: SerialLink,
    C: Clock,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForceNode")
            .field("factor", &self.controller.conversion_factor())
            .field("state", &self.controller.state())
            .field("last_valid_force", &self.filter.last_valid_force())
            .field("cycles", &self.cycles)
            .finish()
    }
}

impl<S, K, L, C> ForceNode<S, K, L, C>
where
    S: ForceSource,
    K: KvStore,
    L: SerialLink,
    C: Clock,
{
    /// Zero the source and restart the telemetry clock. Call once, unloaded.
    pub fn begin(&mut self) -> Result<()> {
        self.source
            .tare()
            .map_err(|e| eyre::Report::new(map_boxed(&e, Boundary::Sensor)))
            .wrap_err("tare")?;
        self.epoch = self.clock.now();
        self.cycles = 0;
        tracing::info!(
            factor = self.controller.conversion_factor(),
            calibrated = self.controller.is_calibrated(),
            "node started"
        );
        Ok(())
    }

    /// Run one full cycle and return the emitted telemetry.
    pub fn step(&mut self) -> Result<TelemetrySample> {
        self.handle_command()?;

        let timestamp_seconds = self.clock.secs_since(self.epoch);
        let raw = self
            .source
            .read_force(Duration::from_millis(self.timeouts.sensor_ms))
            .map_err(|e| eyre::Report::new(map_boxed(&e, Boundary::Sensor)))
            .wrap_err("read_force")?;
        let force = self.filter.update(raw, self.controller.is_calibrated());

        let sample = TelemetrySample {
            timestamp_seconds,
            force,
        };
        self.emit(&Frame::Telemetry(sample))?;

        self.cycles = self.cycles.saturating_add(1);
        self.clock.sleep(Duration::from_millis(self.looping.cadence_ms));
        Ok(sample)
    }

    /// Poll the link and dispatch at most one command.
    pub fn handle_command(&mut self) -> Result<Option<Command>> {
        let cmd = protocol::read_command(&mut self.link)
            .map_err(|e| eyre::Report::new(map_boxed(&e, Boundary::Link)))
            .wrap_err("read command")?;
        let Some(cmd) = cmd else {
            return Ok(None);
        };
        match cmd {
            Command::SetScale(factor) => {
                let stable = self.filter.last_valid_force();
                if let Err(e) = self.controller.set_scale(factor, &mut self.source, stable) {
                    tracing::warn!(factor, error = %e, "set scale refused");
                }
            }
            Command::QueryScale => {
                let factor = self.controller.conversion_factor();
                tracing::debug!(factor, "scale query");
                self.emit(&Frame::Scale(factor))?;
            }
            Command::Unknown(b) if b.is_ascii_whitespace() => {}
            Command::Unknown(b) => {
                tracing::debug!(byte = b, "ignoring unknown command byte");
            }
        }
        Ok(Some(cmd))
    }

    fn emit(&mut self, frame: &Frame) -> Result<()> {
        self.link
            .write_line(&frame.to_string())
            .map_err(|e| eyre::Report::new(map_boxed(&e, Boundary::Link)))
            .wrap_err("write frame")
    }

    /// Run cycles until `shutdown` is raised or `max_cycles` have run.
    /// Returns the number of cycles completed.
    pub fn run(&mut self, max_cycles: Option<u64>, shutdown: &AtomicBool) -> Result<u64> {
        self.begin()?;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!(cycles = self.cycles, "shutdown requested");
                break;
            }
            if max_cycles.is_some_and(|n| self.cycles >= n) {
                break;
            }
            self.step()?;
        }
        Ok(self.cycles)
    }

    pub fn filter(&self) -> &ForceFilter {
        &self.filter
    }

    pub fn controller(&self) -> &CalibrationController<K> {
        &self.controller
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Last emitted stable force.
    pub fn last_force(&self) -> f32 {
        self.filter.last_valid_force()
    }
}
