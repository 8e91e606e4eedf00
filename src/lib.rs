// src/lib.rs

pub mod bridge;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod decode;
pub mod errors;
pub mod events;
pub mod launch;
pub mod logging;
pub mod scan;
pub mod session;
pub mod types;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::bridge::Bridge;
use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::decode::Outcome;
use crate::events::BridgeEvent;
use crate::launch::{ProcessLauncher, WorkerRequest};
use crate::types::parse_duration;

pub use crate::bridge::PendingOutcome;
pub use crate::errors::BridgeError;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the bridge (launcher, session slot, cancellation)
/// - printing progress and outcomes
/// - Ctrl-C handling (aborts the running worker)
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config from {:?}", args.config))?;
    apply_overrides(&mut cfg, &args)?;

    let request = args
        .request()
        .context("either --root-data-dir or all three of --input-data-dir, --resources-dir and --output-data-dir are required")?;

    if args.dry_run {
        return print_dry_run(&cfg, &request).await;
    }

    let (bridge, mut events) = Bridge::from_config(&cfg)?;
    let pending = bridge.launch(request).await?;
    info!(session = %pending.session(), "waiting for worker");

    let wait = pending.wait();
    tokio::pin!(wait);
    let mut abort_requested = false;

    let result = loop {
        tokio::select! {
            res = &mut wait => break res,
            Some(event) = events.recv() => print_event(&event),
            signal = tokio::signal::ctrl_c(), if !abort_requested => {
                abort_requested = true;
                match signal {
                    Ok(()) => {
                        info!("Ctrl-C received; aborting worker");
                        bridge.abort().await;
                    }
                    Err(e) => eprintln!("failed to listen for Ctrl+C: {e}"),
                }
            }
        }
    };

    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    match result {
        Ok(outcomes) => {
            for outcome in &outcomes {
                match outcome {
                    Outcome::Success { output_path } => println!("ok   {output_path}"),
                    Outcome::Failure { error } => println!("err  {error}"),
                }
            }
            Ok(())
        }
        Err(e) if e.is_cancellation() => {
            println!("cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> Result<()> {
    if let Some(mode) = args.mode {
        cfg.launcher.mode = mode;
    }
    if let Some(ref t) = args.timeout {
        let timeout = parse_duration(t)
            .map_err(anyhow::Error::msg)
            .context("parsing --timeout")?;
        cfg.session.timeout = Some(timeout);
    }
    Ok(())
}

fn print_event(event: &BridgeEvent) {
    match event {
        BridgeEvent::Progress(progress) => println!("preview {}", progress.path),
        BridgeEvent::PreviewCleared { session } => debug!(%session, "preview cleared"),
    }
}

/// Print the resolved worker command line without running it.
async fn print_dry_run(cfg: &ConfigFile, request: &WorkerRequest) -> Result<()> {
    request.validate()?;
    let launcher = ProcessLauncher::from_config(cfg.launcher.clone())?;
    let descriptor = launcher
        .resolve(launcher.command_name(), &request.args())
        .await?;

    println!("skinbridge dry-run");
    println!("  launcher.mode = {:?}", launcher.mode());
    println!("  session.timeout = {:?}", cfg.session.timeout);
    println!("  session.termination_grace = {:?}", cfg.session.termination_grace);
    println!("  command: {descriptor}");

    debug!("dry-run complete (no execution)");
    Ok(())
}
