//! Accept loop feeding the connection manager.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::Sender;

use crate::app::IdCounter;
use crate::serial::ObjectFactory;
use crate::simulation::SimulationEngine;

use super::connection::Connection;
use super::manager::ConnectionEvent;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub struct ConnectionListener {
    host: String,
    port: u16,
    name: String,
    events: Sender<ConnectionEvent>,
    factory: Arc<ObjectFactory>,
    engine: Arc<SimulationEngine>,
    ids: Arc<IdCounter>,
    local_addr: Mutex<Option<SocketAddr>>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionListener {
    pub fn new(
        host: String,
        port: u16,
        events: Sender<ConnectionEvent>,
        factory: Arc<ObjectFactory>,
        engine: Arc<SimulationEngine>,
        ids: Arc<IdCounter>,
    ) -> Self {
        let name = format!("Clsn.{host}.{port}");
        Self {
            host,
            port,
            name,
            events,
            factory,
            engine,
            ids,
            local_addr: Mutex::new(None),
            stop: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// The bound address, available after `init` (the configured port may
    /// be 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().expect("listener lock poisoned")
    }

    pub fn init(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))?;
        listener.set_nonblocking(true)?;
        *self.local_addr.lock().expect("listener lock poisoned") = Some(listener.local_addr()?);

        let runtime = AcceptRuntime {
            name: self.name.clone(),
            events: self.events.clone(),
            factory: Arc::clone(&self.factory),
            engine: Arc::clone(&self.engine),
            ids: Arc::clone(&self.ids),
            stop: Arc::clone(&self.stop),
        };
        let handle = std::thread::spawn(move || run_accept_loop(listener, runtime));
        *self.worker.lock().expect("listener lock poisoned") = Some(handle);
        Ok(())
    }

    pub fn cleanup(&self) {
        self.stop.store(true, Ordering::Relaxed);
        let handle = self.worker.lock().expect("listener lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

struct AcceptRuntime {
    name: String,
    events: Sender<ConnectionEvent>,
    factory: Arc<ObjectFactory>,
    engine: Arc<SimulationEngine>,
    ids: Arc<IdCounter>,
    stop: Arc<AtomicBool>,
}

fn run_accept_loop(listener: TcpListener, runtime: AcceptRuntime) {
    tracing::info!("{}: listening", runtime.name);

    loop {
        if runtime.stop.load(Ordering::Relaxed) {
            break;
        }

        match listener.accept() {
            Ok((stream, addr)) => {
                tracing::info!("{}: accepted {addr}", runtime.name);
                let _ = stream.set_nonblocking(false);
                let connection = Arc::new(Connection::new(
                    stream,
                    runtime.events.clone(),
                    Arc::clone(&runtime.factory),
                    Arc::clone(&runtime.engine),
                    runtime.ids.next(),
                ));
                let _ = runtime.events.send(ConnectionEvent::Added(connection));
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) => {
                tracing::warn!("{}: accept error: {err}", runtime.name);
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }

    tracing::info!("{}: stopped", runtime.name);
}
