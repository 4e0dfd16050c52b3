mod calibrate;
mod cli;
mod decode;
mod error_fmt;
mod rt;
mod run;

use clap::Parser;
use eyre::WrapErr;
use std::path::Path;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        tracing::debug!(error = ?err, "exiting with error");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let cfg = loadnode_config::load_file(&cli.config)?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid config {}", cli.config.display()))?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_tracing(cli.json, &level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            cycles,
            link,
            rt,
            rt_prio,
        } => {
            rt::setup_rt_once(rt, rt_prio);
            run::run(&cfg, cycles, link)?;
        }
        Commands::Decode => {
            let stdin = std::io::stdin();
            let stats = decode::decode(stdin.lock(), std::io::stdout().lock(), cli.json)?;
            if stats.rejected > 0 {
                tracing::warn!(
                    frames = stats.frames,
                    rejected = stats.rejected,
                    "some lines were not frames"
                );
            }
        }
        Commands::Fit {
            csv,
            current_factor,
        } => {
            let report = calibrate::fit(&csv, current_factor, cfg.calibration.min_factor)?;
            println!("{}", report.render(cli.json));
        }
        Commands::TwoPoint {
            zero,
            loaded,
            known,
            current_factor,
        } => {
            let report = calibrate::two_point(
                zero,
                loaded,
                known,
                current_factor,
                cfg.calibration.min_factor,
            )?;
            println!("{}", report.render(cli.json));
        }
    }
    Ok(())
}

/// Console logs go to stderr (stdout carries frames); `[logging].file` adds
/// a JSON-lines file sink. `RUST_LOG`, when set, wins over `level`.
fn init_tracing(json: bool, level: &str, logging: &loadnode_config::Logging) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
