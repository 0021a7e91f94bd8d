//! Integration tests for session persistence
//!
//! - Records written to JSON-lines files per patient
//! - Failed writes held for a retry
//! - Configuration files driving the session

mod common;

use common::builders::top_center;
use common::mock_helpers::{fast_config, spawn_session, spawn_with_store};
use common::{test_timeout, wait_finalized, wait_streaming};
use flexogear_rs::config::AppConfig;
use flexogear_rs::controller::SessionUpdate;
use flexogear_rs::session::{FinalizeOutcome, JsonLinesStore};

fn run_automated_session(handle: &flexogear_rs::SessionHandle, cycles: u32) -> SessionUpdate {
    handle.connect();
    assert!(wait_streaming(handle));
    handle.calibrate();
    handle.select_prescription(top_center(cycles));
    handle.start_session();
    wait_finalized(handle).expect("session should finish")
}

#[test]
fn test_records_land_in_patient_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fast_config();
    config.recorder.patient_id = "patient-7".to_string();
    config.recorder.sessions_dir = Some(dir.path().to_path_buf());

    let store = JsonLinesStore::new(dir.path()).unwrap();
    let session = spawn_with_store(config, Box::new(store));
    run_automated_session(&session.handle, 1);
    session.shutdown();

    let reader = JsonLinesStore::new(dir.path()).unwrap();
    assert!(reader.patient_file("patient-7").exists());
    let records = reader.load("patient-7").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].exercise_name, "Assisted Flexion");
    assert_eq!(records[0].reps, 1);
    assert!(records[0].was_automated);

    let line = std::fs::read_to_string(reader.patient_file("patient-7")).unwrap();
    assert!(line.contains("\"exerciseName\""));
    assert!(line.contains("\"wasEmergencyStop\":false"));
}

#[test]
fn test_failed_write_can_be_retried() {
    let (session, store) = spawn_session(fast_config());
    store.set_failing(true);

    let finalized = run_automated_session(&session.handle, 1);
    let SessionUpdate::Finalized { outcome, .. } = finalized else {
        unreachable!("wait_finalized only returns Finalized");
    };
    assert!(matches!(outcome, FinalizeOutcome::PersistFailed { .. }));
    assert!(store.is_empty());

    let unsaved = session.handle.wait_for(test_timeout(), |u| match u {
        SessionUpdate::Snapshot(s) => s.has_unsaved,
        _ => false,
    });
    assert!(unsaved.is_some());

    store.set_failing(false);
    session.handle.retry_persist();
    let saved = session
        .handle
        .wait_for(test_timeout(), |u| matches!(u, SessionUpdate::Saved(_)));
    let Some(SessionUpdate::Saved(record)) = saved else {
        panic!("retry should save the record");
    };
    assert_eq!(record.reps, 1);
    assert_eq!(store.len(), 1);

    session.shutdown();
}

#[test]
fn test_config_file_drives_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[exercise]
automation_delay_ms = 10

[simulation]
connect_latency_ms = 0
sample_rate_hz = 200
noise_deg = 0.0

[motors.relax]
a1 = "90"
a2 = "60"
a3 = "60"
"#,
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.exercise.automation_delay_ms, 10);

    let (session, store) = spawn_session(config);
    let finalized = run_automated_session(&session.handle, 1);
    assert!(matches!(
        finalized,
        SessionUpdate::Finalized {
            outcome: FinalizeOutcome::Persisted(_),
            ..
        }
    ));
    assert_eq!(store.len(), 1);

    let relaxed = common::wait_until(test_timeout(), || {
        session
            .link
            .received_commands()
            .last()
            .map(|c| c.a2 == "60")
            .unwrap_or(false)
    });
    assert!(relaxed, "configured RELAX posture should be sent");

    session.shutdown();
}
