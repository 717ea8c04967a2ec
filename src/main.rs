use clap::Parser;
use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use lytter::cli::Cli;
use lytter::config::SHUTDOWN_GRACE;
use lytter::dashboard;
use lytter::history::timestamp;
use lytter::monitor::{self, Monitor};
use lytter::sniff;
use lytter::{RenderSnapshot, Tracker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if let Err(e) = lytter::logging::init_logging(cli.log_file.as_deref()) {
        eprintln!("[WARN] Failed to initialize logging: {}", e);
    }

    let config = cli.monitor_config();
    let mode = cli.output_mode();
    let monitor = Monitor::new(Tracker::start(&config, timestamp::now()));
    monitor.note("Starting network scan...");

    // Only the first interrupt matters; later ones are dropped by the full channel.
    let (interrupt_tx, mut interrupt_rx) = mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;

    let running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = unbounded();

    let mut capture = {
        let running = running.clone();
        let interface = cli.interface.clone();
        tokio::task::spawn_blocking(move || {
            sniff::start_sniffing(interface.as_deref(), tx, running)
        })
    };

    let mut ingestion = {
        let monitor = monitor.clone();
        tokio::task::spawn_blocking(move || monitor::run_ingestion(rx, monitor))
    };

    let sweep = tokio::spawn(monitor::run_sweep_loop(
        monitor.clone(),
        config.sweep_interval,
        running.clone(),
        move |snapshot: &RenderSnapshot| {
            if let Err(e) = dashboard::draw(snapshot, mode) {
                tracing::warn!("[MAIN] Redraw failed: {}", e);
            }
        },
    ));

    let (interrupted, finished) = tokio::select! {
        _ = interrupt_rx.recv() => (true, None),
        joined = &mut capture => (false, Some(joined)),
    };

    running.store(false, Ordering::SeqCst);
    let joined = match finished {
        Some(joined) => Some(joined),
        None => monitor::join_within(&mut capture, SHUTDOWN_GRACE).await,
    };
    let capture_stuck = joined.is_none();
    let capture_error = match joined {
        None | Some(Ok(Ok(()))) => None,
        Some(Ok(Err(e))) => Some(format!("Packet capture error: {e}")),
        Some(Err(e)) => Some(format!("Capture task failed: {e}")),
    };

    if capture_stuck {
        tracing::warn!(
            "[MAIN] Capture did not stop within {:?}, saving without draining",
            SHUTDOWN_GRACE
        );
    } else {
        // Capture has dropped its sender, so ingestion drains what is left and returns.
        match monitor::join_within(&mut ingestion, SHUTDOWN_GRACE).await {
            Some(Ok(_)) => {}
            Some(Err(e)) => tracing::error!("[MAIN] Ingestion task failed: {}", e),
            None => tracing::warn!("[MAIN] Ingestion did not drain within {:?}", SHUTDOWN_GRACE),
        }
    }
    sweep.abort();
    let _ = sweep.await;

    let reason = match (&capture_error, interrupted) {
        (_, true) => "Scan terminated by user",
        (Some(message), false) => message.as_str(),
        (None, false) => "Capture stopped",
    };
    // Failure is already logged; there is nothing more to do on the way out.
    let _ = monitor.shutdown(reason);

    if let Err(e) = dashboard::draw(&monitor.snapshot(), mode) {
        tracing::warn!("[MAIN] Final redraw failed: {}", e);
    }

    if capture_stuck {
        // The blocking pool would otherwise wait on the capture thread forever.
        std::process::exit(0);
    }
    match capture_error {
        Some(message) if !interrupted => Err(message.into()),
        _ => Ok(()),
    }
}
