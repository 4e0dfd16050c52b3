//! `loadnode run`: wire backends from the config and drive the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use loadnode_config::Config;
use loadnode_core::hw_error::{Boundary, map_hw_error};
use loadnode_core::{CalibrationCfg, FilterCfg, LoopCfg, NodeBuilder, Timeouts};
use loadnode_hardware::{FileStore, SimParams};
use loadnode_traits::{ForceSource, SerialLink};

use crate::cli::LinkKind;

pub fn sim_params(cfg: &loadnode_config::Simulation) -> SimParams {
    SimParams {
        base_load: cfg.base_load,
        noise: cfg.noise,
        step_load: cfg.step_load,
        step_at: cfg.step_at_cycle,
        counts_per_unit: cfg.counts_per_unit,
        stall_after: cfg.stall_after_reads,
    }
}

#[cfg(not(feature = "hardware"))]
fn make_source(cfg: &Config) -> eyre::Result<Box<dyn ForceSource>> {
    tracing::info!(base_load = cfg.sim.base_load, "using simulated load cell");
    Ok(Box::new(loadnode_hardware::SimulatedSource::new(sim_params(&cfg.sim))))
}

#[cfg(feature = "hardware")]
fn make_source(cfg: &Config) -> eyre::Result<Box<dyn ForceSource>> {
    let pins = cfg
        .pins
        .as_ref()
        .ok_or_else(|| eyre::eyre!("[pins] section is required for the hardware backend"))?;
    let source = loadnode_hardware::hardware::HardwareSource::try_new(
        pins.hx711_dt,
        pins.hx711_sck,
        pins.gain_pulses,
        pins.samples_per_read,
        pins.tare_samples,
    )
    .wrap_err("open hx711")?;
    tracing::info!(dt = pins.hx711_dt, sck = pins.hx711_sck, "using hx711 load cell");
    Ok(Box::new(source))
}

fn make_link(kind: LinkKind, cfg: &Config) -> eyre::Result<Box<dyn SerialLink>> {
    match kind {
        LinkKind::Stdio => Ok(Box::new(
            loadnode_hardware::StdioLink::stdio().wrap_err("start stdin reader")?,
        )),
        #[cfg(feature = "hardware")]
        LinkKind::Uart => Ok(Box::new(
            loadnode_hardware::UartLink::open(cfg.serial.baud).wrap_err("open uart")?,
        )),
        #[cfg(not(feature = "hardware"))]
        LinkKind::Uart => {
            let _ = cfg.serial.baud;
            eyre::bail!("uart link requires a build with the `hardware` feature")
        }
    }
}

/// Run until Ctrl-C or `cycles`; returns the number of completed cycles.
pub fn run(cfg: &Config, cycles: Option<u64>, link: LinkKind) -> eyre::Result<u64> {
    let source = make_source(cfg)?;
    let link = make_link(link, cfg)?;
    let store = FileStore::open(&cfg.storage.path, cfg.node.namespace.clone())
        .map_err(|e| eyre::Report::new(map_hw_error(&e, Boundary::Store)))
        .wrap_err_with(|| format!("open store {}", cfg.storage.path))?;

    let mut node = NodeBuilder::new()
        .with_source(source)
        .with_store(store)
        .with_link(link)
        .with_filter(FilterCfg::from(&cfg.filter))
        .with_calibration(CalibrationCfg::from(&cfg.calibration))
        .with_loop(LoopCfg::from(&cfg.node))
        .with_timeouts(Timeouts::from(&cfg.timeouts))
        .build()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let done = node.run(cycles, &shutdown)?;
    tracing::info!(
        cycles = done,
        factor = node.controller().conversion_factor(),
        calibrated = node.controller().is_calibrated(),
        "node stopped"
    );
    Ok(done)
}
