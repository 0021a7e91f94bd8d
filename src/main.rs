//! FlexoGear Session Runner - Main Entry Point
//!
//! Runs one exercise session against the simulated wrist device and logs
//! the live instruction, angles and progress as the session advances.
//!
//! Usage: `flexogear-rs [CONFIG] [PRESCRIPTION_JSON]`

use anyhow::Context;
use flexogear_rs::{
    config::{self, AppConfig, LOGS_DIR},
    controller::{FlexoBackend, SessionUpdate},
    device::SimulatedDevice,
    exercise::Prescription,
    session::{FinalizeOutcome, JsonLinesStore},
    types::ConnectionStatus,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Longest a demo session may run
const SESSION_TIMEOUT: Duration = Duration::from_secs(180);

fn main() -> anyhow::Result<()> {
    // Log to a daily file when the data directory is available
    let (file_layer, _guard) = match config::ensure_app_data_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join(LOGS_DIR), "flexogear.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flexogear_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("Starting FlexoGear session runner");

    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .or_else(config::default_config_path);
    let config = match &config_path {
        Some(path) => {
            tracing::info!("Using configuration {:?}", path);
            AppConfig::load_or_default(path)
        }
        None => AppConfig::default(),
    };

    let prescription = match args.next() {
        Some(path) => load_prescription(Path::new(&path), &config)?,
        None => demo_prescription(),
    };

    let sessions_dir = config.sessions_dir()?;
    let store = JsonLinesStore::new(sessions_dir.clone())?;
    tracing::info!("Writing session records to {:?}", sessions_dir);

    tracing::info!("Device {}", config.device.link_summary());
    let device = SimulatedDevice::new(config.device.name.clone(), config.simulation.clone());
    let connect_timeout = config.device.connect_timeout();

    let (backend, handle) = FlexoBackend::new(config, Box::new(device), Box::new(store));
    let worker = backend.spawn().context("Failed to spawn session worker")?;

    // Connect and wait for telemetry to flow
    handle.connect();
    let streaming = handle.wait_for(connect_timeout, |update| match update {
        SessionUpdate::Snapshot(snapshot) => {
            snapshot.status == ConnectionStatus::Connected && snapshot.telemetry.accepted > 0
        }
        SessionUpdate::Error(_) => true,
        _ => false,
    });

    match streaming {
        Some(SessionUpdate::Snapshot(_)) => {
            handle.calibrate();
            handle.select_prescription(prescription);
            handle.start_session();
            run_until_finalized(&handle);
        }
        Some(SessionUpdate::Error(message)) => tracing::error!("{}", message),
        _ => tracing::error!("Timed out waiting for the device"),
    }

    tracing::info!("Shutting down...");
    handle.shutdown();
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("Session worker panicked"))?;

    Ok(())
}

fn load_prescription(path: &Path, config: &AppConfig) -> anyhow::Result<Prescription> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prescription {:?}", path))?;
    let prescription: Prescription = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse prescription {:?}", path))?;
    let prescription = prescription.normalized();
    prescription.validate(&config.motors)?;
    Ok(prescription)
}

fn demo_prescription() -> Prescription {
    Prescription::new("Wrist Flexion", 3, 2).with_instructions([
        "Bend your wrist down slowly",
        "Return to neutral",
    ])
}

fn run_until_finalized(handle: &flexogear_rs::SessionHandle) {
    let deadline = Instant::now() + SESSION_TIMEOUT;
    let mut last_instruction = String::new();

    while Instant::now() < deadline {
        let Some(update) = handle.wait_for(Duration::from_millis(250), |_| true) else {
            continue;
        };

        match update {
            SessionUpdate::Snapshot(snapshot) => {
                if snapshot.instruction != last_instruction {
                    tracing::info!(
                        "{} | pitch {:.1} yaw {:.1} | {:.0}%",
                        snapshot.instruction,
                        snapshot.angles.pitch,
                        snapshot.angles.yaw,
                        snapshot.progress.progress_pct
                    );
                    last_instruction = snapshot.instruction;
                }
            }
            SessionUpdate::Rejected(message) => tracing::warn!("{}", message),
            SessionUpdate::Error(message) => tracing::error!("{}", message),
            SessionUpdate::Finalized { reason, outcome } => {
                match outcome {
                    FinalizeOutcome::Persisted(record) => {
                        tracing::info!("{}: {} reps saved", reason, record.reps)
                    }
                    FinalizeOutcome::PersistFailed { error, .. } => {
                        tracing::error!("{}: record not saved: {}", reason, error)
                    }
                    other => tracing::info!("{}: {:?}", reason, other),
                }
                return;
            }
            SessionUpdate::Saved(record) => {
                tracing::info!("Saved record for {}", record.exercise_name)
            }
            SessionUpdate::Shutdown => return,
        }
    }

    tracing::warn!("Session did not finish in time, stopping");
    handle.stop_session();
}
