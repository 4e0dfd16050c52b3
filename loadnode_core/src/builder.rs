//! Type-changing builder for `ForceNode`.
//!
//! Each `with_*` collaborator setter swaps one type parameter, so `build()`
//! only exists once a source, a store and a link have been supplied.
//! Configuration is checked at `build()` time.

use loadnode_traits::{Clock, ForceSource, KvStore, MonotonicClock, SerialLink};

use crate::calibration::{CalibrationController, CalibrationStore};
use crate::config::{CalibrationCfg, FilterCfg, LoopCfg, Timeouts};
use crate::error::{BuildError, Result};
use crate::filter::ForceFilter;
use crate::node::ForceNode;

pub struct NodeBuilder<S, K, L, C> {
    source: S,
    store: K,
    link: L,
    clock: C,
    filter: FilterCfg,
    calibration: CalibrationCfg,
    looping: LoopCfg,
    timeouts: Timeouts,
}

impl Default for NodeBuilder<(), (), (), MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBuilder<(), (), (), MonotonicClock> {
    pub fn new() -> Self {
        Self {
            source: (),
            store: (),
            link: (),
            clock: MonotonicClock::new(),
            filter: FilterCfg::default(),
            calibration: CalibrationCfg::default(),
            looping: LoopCfg::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl<S, K, L, C> NodeBuilder<S, K, L, C> {
    pub fn with_source<S2: ForceSource>(self, source: S2) -> NodeBuilder<S2, K, L, C> {
        NodeBuilder {
            source,
            store: self.store,
            link: self.link,
            clock: self.clock,
            filter: self.filter,
            calibration: self.calibration,
            looping: self.looping,
            timeouts: self.timeouts,
        }
    }

    pub fn with_store<K2: KvStore>(self, store: K2) -> NodeBuilder<S, K2, L, C> {
        NodeBuilder {
            source: self.source,
            store,
            link: self.link,
            clock: self.clock,
            filter: self.filter,
            calibration: self.calibration,
            looping: self.looping,
            timeouts: self.timeouts,
        }
    }

    pub fn with_link<L2: SerialLink>(self, link: L2) -> NodeBuilder<S, K, L2, C> {
        NodeBuilder {
            source: self.source,
            store: self.store,
            link,
            clock: self.clock,
            filter: self.filter,
            calibration: self.calibration,
            looping: self.looping,
            timeouts: self.timeouts,
        }
    }

    /// Replace the monotonic clock (tests use a simulated one).
    pub fn with_clock<C2: Clock>(self, clock: C2) -> NodeBuilder<S, K, L, C2> {
        NodeBuilder {
            source: self.source,
            store: self.store,
            link: self.link,
            clock,
            filter: self.filter,
            calibration: self.calibration,
            looping: self.looping,
            timeouts: self.timeouts,
        }
    }

    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_calibration(mut self, calibration: CalibrationCfg) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_loop(mut self, looping: LoopCfg) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

impl<S, K, L, C> NodeBuilder<S, K, L, C>
where
    S: ForceSource,
    K: KvStore,
    L: SerialLink,
    C: Clock,
{
    /// Validate the configuration, load the persisted calibration and wire
    /// everything together. The source receives the loaded factor; tare is
    /// left to `ForceNode::begin`.
    pub fn build(self) -> Result<ForceNode<S, K, L, C>> {
        self.filter
            .validate()
            .map_err(|m| eyre::Report::new(BuildError::InvalidConfig(m)))?;
        if !(self.calibration.min_factor.is_finite() && self.calibration.min_factor > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "calibration.min_factor must be finite and > 0",
            )));
        }
        if self.timeouts.sensor_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "timeouts.sensor_ms must be >= 1",
            )));
        }

        let mut source = self.source;
        let controller =
            CalibrationController::load(CalibrationStore::new(self.store, self.calibration));
        controller.apply_to(&mut source);

        let mut filter = ForceFilter::new(self.filter);
        if controller.is_calibrated() {
            // Resume from the force recorded when the factor was set.
            filter.seed(controller.params().calibrated_force);
        }

        let epoch = self.clock.now();
        Ok(ForceNode {
            source,
            link: self.link,
            controller,
            filter,
            looping: self.looping,
            timeouts: self.timeouts,
            clock: self.clock,
            epoch,
            cycles: 0,
        })
    }
}
