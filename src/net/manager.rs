//! Connection manager: a single-threaded event processor owning the live
//! connections.
//!
//! Reader and writer workers signal closure concurrently; funnelling both
//! through one worker makes the list mutation race-free and calls cleanup
//! exactly once per connection.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam::channel::{Receiver, Sender};

use super::connection::Connection;

pub enum ConnectionEvent {
    Added(Arc<Connection>),
    Removed(i32),
    Stop,
}

pub struct ConnectionManager {
    events_tx: Sender<ConnectionEvent>,
    events_rx: Receiver<ConnectionEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        let (events_tx, events_rx) = crossbeam::channel::unbounded();
        Self {
            events_tx,
            events_rx,
            worker: Mutex::new(None),
        }
    }

    /// Event producers (the listener, each connection's workers) hold clones
    /// of this sender.
    pub fn events(&self) -> Sender<ConnectionEvent> {
        self.events_tx.clone()
    }

    pub fn init(&self) {
        let events = self.events_rx.clone();
        let handle = std::thread::spawn(move || run_events(events));
        *self.worker.lock().expect("worker lock poisoned") = Some(handle);
    }

    /// Drains pending events, then tears down every live connection.
    pub fn cleanup(&self) {
        let _ = self.events_tx.send(ConnectionEvent::Stop);
        let handle = self.worker.lock().expect("worker lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn run_events(events: Receiver<ConnectionEvent>) {
    tracing::info!("connection manager running");
    let mut connections: BTreeMap<i32, Arc<Connection>> = BTreeMap::new();

    loop {
        let event = match events.recv() {
            Ok(event) => event,
            Err(_) => break,
        };
        match event {
            ConnectionEvent::Added(connection) => process_added(&mut connections, connection),
            ConnectionEvent::Removed(id) => process_removed(&mut connections, id),
            ConnectionEvent::Stop => break,
        }
    }

    for (id, connection) in std::mem::take(&mut connections) {
        tracing::info!(id, "tearing down live connection");
        connection.cleanup();
    }
    tracing::info!("connection manager stopped");
}

fn process_added(connections: &mut BTreeMap<i32, Arc<Connection>>, connection: Arc<Connection>) {
    let id = connection.id();
    tracing::info!(id, "adding connection");
    match connection.init() {
        Ok(()) => {
            connections.insert(id, connection);
        }
        Err(err) => {
            tracing::error!(id, "failed initializing connection: {err}");
            connection.cleanup();
        }
    }
}

fn process_removed(connections: &mut BTreeMap<i32, Arc<Connection>>, id: i32) {
    // Both workers of a dying connection may report it; the second lookup
    // finds nothing.
    let Some(connection) = connections.remove(&id) else {
        return;
    };
    tracing::info!(id, "removing connection");
    connection.cleanup();
}
