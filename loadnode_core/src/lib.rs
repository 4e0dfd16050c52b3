#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Force estimation and calibration core (hardware-agnostic).
//!
//! All hardware interactions go through the `loadnode_traits` contracts:
//! `ForceSource` for the load cell, `KvStore` for persistence and
//! `SerialLink` for the operator channel.
//!
//! ## Architecture
//!
//! - **Filtering**: moving-average step detector + EMA with deadband (`filter`)
//! - **Calibration**: persisted factor, self-healing load, state machine (`calibration`)
//! - **Protocol**: `s`/`g` commands and `<1,..>`/`<2,..>` frames (`protocol`)
//! - **Loop**: command -> sense -> filter -> telemetry, once per cycle (`node`)
//! - **Configuration**: runtime config structs (`config`) fed from TOML (`conversions`)

pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod hw_error;
pub mod mocks;
pub mod node;
pub mod protocol;

pub use builder::NodeBuilder;
pub use calibration::{
    CalibrationController, CalibrationParameters, CalibrationState, CalibrationStore,
    two_point_factor,
};
pub use config::{CalibrationCfg, FilterCfg, LoopCfg, Timeouts};
pub use error::{BuildError, CalibrationError, NodeError, Result};
pub use filter::{FilterTrace, ForceFilter};
pub use node::ForceNode;
pub use protocol::{Command, Frame, FrameError, TelemetrySample};
