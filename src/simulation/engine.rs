//! Single-slot simulation scheduler.
//!
//! One worker thread services the slot: at most one simulation runs at a
//! time, later requests are dropped with a warning, and a cooperative stop
//! flag lets a client interrupt a long-running job. Progress fans out to a
//! set of registered listeners.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex};

use super::request::SimulationRequest;
use super::result::SimulationResult;

pub trait SimulationListener: Send + Sync {
    /// `percent_remaining` counts down to 0.0; the terminal update carries
    /// the final result when the run completed.
    fn progress_update(&self, percent_remaining: f64, result: Option<&SimulationResult>);
}

#[derive(Default)]
struct SlotState {
    request: Option<Arc<dyn SimulationRequest>>,
    stop_requested: bool,
    shutdown: bool,
}

pub struct SimulationEngine {
    slot: Mutex<SlotState>,
    available: Condvar,
    listeners: Mutex<BTreeMap<i32, Arc<dyn SimulationListener>>>,
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(SlotState::default()),
            available: Condvar::new(),
            listeners: Mutex::new(BTreeMap::new()),
        }
    }

    /// Hands a simulation to the worker. Rejected while another one runs.
    pub fn request_simulation(&self, request: Box<dyn SimulationRequest>) {
        let mut slot = self.slot.lock().expect("slot lock poisoned");
        if slot.request.is_some() {
            tracing::warn!("cannot request a simulation while another one is running");
            return;
        }
        slot.request = Some(Arc::from(request));
        self.available.notify_all();
    }

    /// Asks the running simulation to stop at its next poll.
    pub fn request_simulation_stop(&self) {
        tracing::info!("simulation stop requested");
        let mut slot = self.slot.lock().expect("slot lock poisoned");
        slot.stop_requested = true;
    }

    pub fn is_simulation_stop_requested(&self) -> bool {
        self.slot.lock().expect("slot lock poisoned").stop_requested
    }

    /// Lets the worker exit once the in-flight simulation returns.
    pub fn request_shutdown(&self) {
        tracing::info!("simulation engine shutdown requested");
        let mut slot = self.slot.lock().expect("slot lock poisoned");
        slot.shutdown = true;
        self.available.notify_all();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.slot.lock().expect("slot lock poisoned").shutdown
    }

    pub fn add_listener(&self, token: i32, listener: Arc<dyn SimulationListener>) {
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners.insert(token, listener);
    }

    pub fn remove_listener(&self, token: i32) {
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners.remove(&token);
    }

    /// Fans progress out to every listener. Iterates a snapshot so a
    /// listener calling back into the engine cannot deadlock, and one slow
    /// listener cannot hold the set lock.
    pub fn notify_progress(&self, percent_remaining: f64, result: Option<&SimulationResult>) {
        tracing::debug!(percent_remaining, "simulation progress");
        let listeners: Vec<Arc<dyn SimulationListener>> = {
            let listeners = self.listeners.lock().expect("listener lock poisoned");
            listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener.progress_update(percent_remaining, result);
        }
    }

    /// Blocks until a simulation is handed over or shutdown is requested.
    /// Taking a request arms a fresh stop flag; the slot stays occupied
    /// until the run returns.
    fn wait_request(&self) -> Option<Arc<dyn SimulationRequest>> {
        let mut slot = self.slot.lock().expect("slot lock poisoned");
        while slot.request.is_none() && !slot.shutdown {
            slot = self.available.wait(slot).expect("slot lock poisoned");
        }
        if slot.shutdown {
            return None;
        }
        slot.stop_requested = false;
        slot.request.clone()
    }

    fn clear_slot(&self) {
        let mut slot = self.slot.lock().expect("slot lock poisoned");
        slot.request = None;
    }

    /// Worker loop. Runs until shutdown.
    pub fn run(&self) {
        tracing::info!("simulation engine running");
        loop {
            let Some(request) = self.wait_request() else {
                break;
            };
            tracing::info!("simulation started");
            request.run(self);
            tracing::info!("simulation completed");
            self.clear_slot();
        }
        tracing::info!("simulation engine stopped");
    }
}
