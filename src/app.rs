//! Application shell: module lifecycle, shared context, stop signaling.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::net::{NetModule, SimulationRequestMessage, SimulationResultMessage};
use crate::serial::{ObjectFactory, Serializable};
use crate::simulation::{BlackScholes, SimulationEngine, SimulationModule, SimulationResult};

/// A unit of the application with ordered startup and teardown.
pub trait Module {
    fn name(&self) -> &str;
    fn init(&self) -> crate::Result<()>;
    fn cleanup(&self);
}

/// Monotonically increasing process-local ids, starting at 1.
#[derive(Default)]
pub struct IdCounter(AtomicI32);

impl IdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// The flag `main` parks on; transitions once, from running to stopped.
#[derive(Default)]
pub struct StopBarrier {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        let mut stopped = self.stopped.lock().expect("stop barrier lock poisoned");
        *stopped = true;
        self.cond.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().expect("stop barrier lock poisoned")
    }

    pub fn wait_timeout(&self, timeout: Duration) {
        let stopped = self.stopped.lock().expect("stop barrier lock poisoned");
        if !*stopped {
            let _ = self
                .cond
                .wait_timeout(stopped, timeout)
                .expect("stop barrier lock poisoned");
        }
    }
}

/// Shared handles threaded through module constructors.
pub struct AppContext {
    pub config: Arc<Config>,
    pub factory: Arc<ObjectFactory>,
    pub engine: Arc<SimulationEngine>,
    pub ids: Arc<IdCounter>,
    pub stop: Arc<StopBarrier>,
}

/// Every type the factory can instantiate off the wire.
pub fn default_prototypes() -> Vec<Box<dyn Serializable>> {
    vec![
        Box::new(SimulationRequestMessage::default()),
        Box::new(SimulationResultMessage::default()),
        Box::new(SimulationResult::new()),
        Box::new(BlackScholes::new()),
    ]
}

pub struct Application {
    ctx: AppContext,
    net: NetModule,
    simulation: SimulationModule,
    signal: Arc<AtomicBool>,
}

impl Application {
    pub fn new(config: Config) -> Self {
        let mut factory = ObjectFactory::new();
        for prototype in default_prototypes() {
            factory.register(prototype);
        }

        let ctx = AppContext {
            config: Arc::new(config),
            factory: Arc::new(factory),
            engine: Arc::new(SimulationEngine::new()),
            ids: Arc::new(IdCounter::new()),
            stop: Arc::new(StopBarrier::new()),
        };
        let net = NetModule::new(&ctx);
        let simulation = SimulationModule::new(Arc::clone(&ctx.engine));

        Self {
            ctx,
            net,
            simulation,
            signal: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// The bound listen address, available after `init`.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.net.local_addr()
    }

    fn modules(&self) -> [&dyn Module; 2] {
        [&self.net, &self.simulation]
    }

    /// SIGINT/SIGTERM set a flag the run loop polls.
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&self.signal))?;
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&self.signal))?;
        Ok(())
    }

    /// Initializes modules in order: transport first, then the scheduler.
    pub fn init(&self) -> crate::Result<()> {
        for module in self.modules() {
            tracing::info!(module = module.name(), "initializing module");
            module.init()?;
        }
        Ok(())
    }

    /// Parks until a stop is requested or a termination signal arrives.
    pub fn run(&self) {
        loop {
            if self.signal.load(Ordering::Relaxed) {
                tracing::info!("termination signal received");
                self.ctx.stop.request_stop();
            }
            if self.ctx.stop.is_stopped() {
                break;
            }
            self.ctx.stop.wait_timeout(Duration::from_millis(200));
        }
    }

    pub fn request_stop(&self) {
        tracing::info!("stop requested");
        self.ctx.stop.request_stop();
    }

    /// Tears modules down in reverse init order.
    pub fn cleanup(&self) {
        for module in self.modules().iter().rev() {
            tracing::info!(module = module.name(), "cleaning up module");
            module.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ids = IdCounter::new();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);
    }

    #[test]
    fn stop_barrier_wakes_a_waiter() {
        let barrier = Arc::new(StopBarrier::new());
        let waiter = {
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                while !barrier.is_stopped() {
                    barrier.wait_timeout(Duration::from_secs(5));
                }
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        barrier.request_stop();
        waiter.join().unwrap();
        assert!(barrier.is_stopped());
    }

    #[test]
    fn default_prototypes_cover_the_wire_types() {
        let mut factory = ObjectFactory::new();
        for prototype in default_prototypes() {
            factory.register(prototype);
        }

        for hierarchy in [
            "net.SimulationRequestMessage",
            "net.SimulationResultMessage",
            "simulation.SimulationResult",
            "simulation.BlackScholes",
        ] {
            assert!(factory.create(hierarchy).is_some(), "missing {hierarchy}");
        }
    }
}
