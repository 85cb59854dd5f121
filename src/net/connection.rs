//! A client connection: one stream, a receiver worker and a sender worker.

use std::net::{Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam::channel::Sender;

use crate::serial::{ArchiveError, ObjectFactory, ReadArchive, Serializable};
use crate::simulation::SimulationEngine;

use super::manager::ConnectionEvent;
use super::messages::encode_message;
use super::receiver::read_frame;
use super::sender::{self, Outbox};
use super::service::SimulationService;

pub struct Connection {
    id: i32,
    name: String,
    stream: TcpStream,
    outbox: Arc<Outbox>,
    events: Sender<ConnectionEvent>,
    factory: Arc<ObjectFactory>,
    service: SimulationService,
    stop_requested: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        events: Sender<ConnectionEvent>,
        factory: Arc<ObjectFactory>,
        engine: Arc<SimulationEngine>,
        listener_token: i32,
    ) -> Self {
        let id = stream.as_raw_fd();
        Self {
            id,
            name: format!("Conn.{id}"),
            stream,
            outbox: Arc::new(Outbox::new()),
            events,
            factory,
            service: SimulationService::new(engine, listener_token),
            stop_requested: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// The stream handle is the connection's identity.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &Arc<SimulationEngine> {
        self.service.engine()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    /// Starts both workers and subscribes the peer to simulation progress.
    pub fn init(self: &Arc<Self>) -> std::io::Result<()> {
        let receiver_stream = self.stream.try_clone()?;
        let mut sender_stream = self.stream.try_clone()?;
        self.service.subscribe(self);

        let receiver = {
            let connection = Arc::clone(self);
            std::thread::spawn(move || run_receiver(connection, receiver_stream))
        };
        let sender = {
            let connection = Arc::clone(self);
            std::thread::spawn(move || {
                if !sender::run_sender(&connection.outbox, &mut sender_stream, &connection.name) {
                    connection.connection_closed();
                }
            })
        };

        let mut workers = self.workers.lock().expect("worker lock poisoned");
        workers.push(receiver);
        workers.push(sender);
        tracing::info!("{}: connection open", self.name);
        Ok(())
    }

    /// Stops and joins both workers. Safe to call more than once.
    pub fn cleanup(&self) {
        self.stop_requested.store(true, Ordering::Relaxed);
        self.service.unsubscribe();
        self.outbox.request_stop();
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            tracing::debug!("{}: stream shutdown: {err}", self.name);
        }

        let workers: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().expect("worker lock poisoned");
            workers.drain(..).collect()
        };
        for worker in workers {
            let _ = worker.join();
        }
        tracing::info!("{}: connection closed", self.name);
    }

    /// One-way closure signal toward the manager; either worker may raise it.
    pub fn connection_closed(&self) {
        let _ = self.events.send(ConnectionEvent::Removed(self.id));
    }

    /// Frames and queues a message toward the peer, in submit order.
    pub fn send_message(&self, message: &dyn Serializable) -> Result<(), ArchiveError> {
        let packet = encode_message(message)?;
        self.outbox.post(packet);
        Ok(())
    }

    /// Decodes one received packet and runs its action. Decode failures drop
    /// the message and keep the connection alive, so cross-version peers can
    /// send types we do not know.
    fn dispatch(self: &Arc<Self>, packet: &[u8]) {
        let mut archive = ReadArchive::with_factory(&self.factory, packet);
        let message = match archive.read_object("message") {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::warn!("{}: received null message", self.name);
                return;
            }
            Err(err) => {
                tracing::warn!("{}: dropping message: {err}", self.name);
                return;
            }
        };

        match message.into_message() {
            Ok(message) => message.execute(self),
            Err(other) => {
                tracing::warn!("{}: message has no action: {}", self.name, other.hierarchy());
            }
        }
    }
}

fn run_receiver(connection: Arc<Connection>, mut stream: TcpStream) {
    loop {
        if connection.is_stop_requested() {
            break;
        }

        match read_frame(&mut stream) {
            Ok(Some(packet)) => connection.dispatch(&packet),
            Ok(None) => {
                tracing::info!("{}: peer closed", connection.name);
                connection.connection_closed();
                break;
            }
            Err(err) => {
                if !connection.is_stop_requested() {
                    tracing::error!("{}: receive failed: {err}", connection.name);
                    connection.connection_closed();
                }
                break;
            }
        }
    }
}
