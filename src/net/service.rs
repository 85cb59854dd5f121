//! Per-connection simulation subscription.
//!
//! Each connection subscribes to the engine's progress updates for its
//! lifetime and forwards them to its own peer as result messages.

use std::sync::{Arc, Weak};

use crate::simulation::{SimulationEngine, SimulationListener, SimulationResult};

use super::connection::Connection;
use super::messages::SimulationResultMessage;

pub struct SimulationService {
    engine: Arc<SimulationEngine>,
    token: i32,
}

impl SimulationService {
    pub fn new(engine: Arc<SimulationEngine>, token: i32) -> Self {
        Self { engine, token }
    }

    pub fn engine(&self) -> &Arc<SimulationEngine> {
        &self.engine
    }

    pub fn subscribe(&self, connection: &Arc<Connection>) {
        let forwarder = ProgressForwarder {
            connection: Arc::downgrade(connection),
        };
        self.engine.add_listener(self.token, Arc::new(forwarder));
    }

    pub fn unsubscribe(&self) {
        self.engine.remove_listener(self.token);
    }
}

/// Non-owning back-handle: the manager owns the connection.
struct ProgressForwarder {
    connection: Weak<Connection>,
}

impl SimulationListener for ProgressForwarder {
    fn progress_update(&self, percent_remaining: f64, result: Option<&SimulationResult>) {
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        let message = SimulationResultMessage::new(percent_remaining, result.cloned());
        if let Err(err) = connection.send_message(&message) {
            tracing::warn!("{}: failed encoding progress update: {err}", connection.name());
        }
    }
}
