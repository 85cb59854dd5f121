//! Simulation scheduling and the Monte-Carlo jobs it runs.

mod black_scholes;
mod engine;
mod histogram;
mod math;
mod request;
mod result;

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub use black_scholes::{
    BlackScholes, MODEL_BLACK, MODEL_BLACK_SCHOLES_FUTURE_APPROXIMATION,
    MODEL_BLACK_SCHOLES_FUTURE_TRUNCATION, MODEL_BLACK_SCHOLES_SPOT, MODEL_BUNEA,
};
pub use engine::{SimulationEngine, SimulationListener};
pub use histogram::{DEFAULT_INTERVALS, DistributionHistogram};
pub use math::NormalDistribution;
pub use request::SimulationRequest;
pub use result::{Graph, SimulationResult};

/// Hosts the engine worker thread within the application module order.
pub struct SimulationModule {
    engine: Arc<SimulationEngine>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SimulationModule {
    pub fn new(engine: Arc<SimulationEngine>) -> Self {
        Self {
            engine,
            worker: Mutex::new(None),
        }
    }
}

impl crate::app::Module for SimulationModule {
    fn name(&self) -> &str {
        "simulation"
    }

    fn init(&self) -> crate::Result<()> {
        let engine = Arc::clone(&self.engine);
        let handle = std::thread::spawn(move || engine.run());
        *self.worker.lock().expect("worker lock poisoned") = Some(handle);
        Ok(())
    }

    fn cleanup(&self) {
        self.engine.request_simulation_stop();
        self.engine.request_shutdown();
        let handle = self.worker.lock().expect("worker lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}
