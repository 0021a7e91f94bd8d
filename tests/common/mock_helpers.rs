//! Backend construction helpers

use flexogear_rs::config::{AppConfig, SimulationConfig};
use flexogear_rs::controller::{FlexoBackend, SessionHandle};
use flexogear_rs::device::{LinkControl, MotionPattern, SimulatedDevice};
use flexogear_rs::session::{MemoryStore, SessionStore};
use std::thread::JoinHandle;

/// Config with a quiet, fast simulated device and short automation steps
pub fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.exercise.automation_delay_ms = 20;
    config.simulation = SimulationConfig {
        sample_rate_hz: 200,
        connect_latency_ms: 0,
        noise_deg: 0.0,
        pattern: MotionPattern::Still {
            pitch: 0.0,
            yaw: 0.0,
        },
        ..SimulationConfig::default()
    };
    config
}

/// A running session worker wired to a simulated device
pub struct TestSession {
    pub handle: SessionHandle,
    pub link: LinkControl,
    pub worker: JoinHandle<()>,
}

impl TestSession {
    /// Shut the worker down and wait for it
    pub fn shutdown(self) {
        self.handle.shutdown();
        self.worker.join().expect("session worker panicked");
    }
}

/// Spawn a session worker with `store`
pub fn spawn_with_store(config: AppConfig, store: Box<dyn SessionStore>) -> TestSession {
    let device = SimulatedDevice::new("FlexoGear", config.simulation.clone());
    let link = device.link_control();
    let (backend, handle) = FlexoBackend::new(config, Box::new(device), store);
    let worker = backend.spawn().expect("failed to spawn session worker");
    TestSession {
        handle,
        link,
        worker,
    }
}

/// Spawn a session worker backed by a memory store
pub fn spawn_session(config: AppConfig) -> (TestSession, MemoryStore) {
    let store = MemoryStore::new();
    let session = spawn_with_store(config, Box::new(store.clone()));
    (session, store)
}
