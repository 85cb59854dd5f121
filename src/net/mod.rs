//! Connection-oriented messaging over TCP.
//!
//! A listener accepts streams and hands them to a single-threaded manager;
//! each connection runs a framed receiver and a queue-driven sender.

mod connection;
mod listener;
mod manager;
mod message;
mod messages;
mod receiver;
mod sender;
mod service;

use std::net::SocketAddr;
use std::sync::Arc;

pub use connection::Connection;
pub use listener::ConnectionListener;
pub use manager::{ConnectionEvent, ConnectionManager};
pub use message::Message;
pub use messages::{SimulationRequestMessage, SimulationResultMessage, encode_message};
pub use receiver::FrameError;
pub use sender::{MAX_QUEUE_BYTES, Outbox, SEND_RETRY_WAIT};

use crate::app::{AppContext, Module};

/// Transport module: the manager and the accept loop, in that order.
pub struct NetModule {
    manager: ConnectionManager,
    listener: ConnectionListener,
}

impl NetModule {
    pub fn new(ctx: &AppContext) -> Self {
        let host = ctx.config.host.clone();
        let port = ctx.config.port;
        tracing::info!(host = %host, port, "net module configured");

        let manager = ConnectionManager::new();
        let listener = ConnectionListener::new(
            host,
            port,
            manager.events(),
            Arc::clone(&ctx.factory),
            Arc::clone(&ctx.engine),
            Arc::clone(&ctx.ids),
        );
        Self { manager, listener }
    }

    /// The bound address, available once the module is initialized.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Module for NetModule {
    fn name(&self) -> &str {
        "net"
    }

    fn init(&self) -> crate::Result<()> {
        self.manager.init();
        self.listener.init()?;
        Ok(())
    }

    fn cleanup(&self) {
        self.listener.cleanup();
        self.manager.cleanup();
    }
}
