//! Runnable simulation requests.

use crate::serial::Serializable;

use super::engine::SimulationEngine;

/// A simulation decoded off the wire.
///
/// `run` executes on the engine worker thread. Implementations report
/// progress through [`SimulationEngine::notify_progress`], poll
/// [`SimulationEngine::is_simulation_stop_requested`] at bounded intervals,
/// and emit exactly one terminal update with `percent_remaining == 0.0`
/// (carrying the result, or nothing when interrupted).
pub trait SimulationRequest: Serializable {
    fn run(&self, engine: &SimulationEngine);
}
