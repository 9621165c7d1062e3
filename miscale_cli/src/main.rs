//! `miscale`: replay, simulate and inspect Mi Body Composition Scale 2 weighings.

mod cli;
mod error_fmt;
mod inspect;
mod weigh;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use miscale_config::Config;
use miscale_core::ScaleError;
use miscale_core::config::DecoderCfg;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::weigh::{SimulateOpts, apply_overrides, script_from_capture, simulated_script};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    // color-eyre is only for panic/report hooks; failures are rendered by error_fmt.
    let _ = color_eyre::install();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> eyre::Result<i32> {
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Commands::Replay { session, .. } | Commands::Simulate { session, .. } = &cli.cmd {
        apply_overrides(&mut cfg, session);
    }
    cfg.validate()
        .map_err(|e| eyre::Report::new(ScaleError::Config(e.to_string())))?;

    // Held until the command returns so the file writer flushes.
    let _guard = init_tracing(&cfg, cli.json, cli.log_level.as_deref())?;

    match cli.cmd {
        Commands::Replay { capture, session } => {
            let rows = miscale_config::load_capture_csv(&capture)?;
            tracing::info!(frames = rows.len(), path = %capture.display(), "capture loaded");
            let shutdown = install_ctrlc()?;
            let report = weigh::weigh(&cfg, &session, script_from_capture(rows), &shutdown)?;
            print_report(&report, cli.json);
            Ok(report.exit_code())
        }
        Commands::Simulate {
            weight,
            impedance,
            no_impedance,
            layout,
            pounds,
            mirror_ms,
            no_settle,
            noise,
            seed,
            session,
        } => {
            let opts = SimulateOpts {
                weight_kg: weight,
                impedance: (!no_impedance).then_some(impedance),
                layout,
                pounds,
                mirror_ms,
                no_settle,
                noise_kg: noise,
                seed,
            };
            let shutdown = install_ctrlc()?;
            let report = weigh::weigh(&cfg, &session, simulated_script(&opts), &shutdown)?;
            print_report(&report, cli.json);
            Ok(report.exit_code())
        }
        Commands::Decode {
            payload,
            characteristic,
            profile,
        } => {
            let decoder = DecoderCfg::from(&cfg.decoder);
            let ins = inspect::inspect(&payload, &characteristic, profile, &decoder)?;
            if cli.json {
                println!("{}", inspect::render_json(&ins));
            } else {
                print!("{}", inspect::render_text(&ins));
            }
            Ok(0)
        }
        Commands::SelfCheck => {
            let report = weigh::self_check(&cfg)?;
            if cli.json {
                println!("{}", weigh::render_json(&report));
            } else {
                println!("OK");
            }
            Ok(0)
        }
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    miscale_config::load_toml(&text)
        .map_err(|e| eyre::Report::new(e).wrap_err(format!("parse config {}", path.display())))
}

fn print_report(report: &weigh::RunReport, json: bool) {
    if json {
        println!("{}", weigh::render_json(report));
    } else {
        print!("{}", weigh::render_text(report));
    }
}

/// Ctrl-C cancels the running session at its next iteration.
fn install_ctrlc() -> eyre::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .wrap_err("installing Ctrl-C handler")?;
    Ok(flag)
}

/// Console layer on stderr (pretty or JSON) plus an optional JSON-lines file layer.
///
/// Level precedence: `RUST_LOG`, then `--log-level`, then `[logging].level`, then `warn`.
fn init_tracing(
    cfg: &Config,
    json: bool,
    cli_level: Option<&str>,
) -> eyre::Result<Option<WorkerGuard>> {
    let level = cli_level
        .or(cfg.logging.level.as_deref())
        .unwrap_or("warn")
        .to_string();
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter())
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter())
            .boxed()
    };

    let (file_layer, guard) = match cfg.logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match cfg.logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                Some("never") | None => tracing_appender::rolling::never(dir, name),
                Some(other) => eyre::bail!("unknown logging.rotation '{other}'"),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter())
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("installing tracing subscriber")?;
    Ok(guard)
}
