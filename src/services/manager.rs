//! Registry of long-running services and the broadcast shutdown fan-out.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A long-running component of the application. Implementations loop until
/// the shutdown receiver fires and must exit promptly afterwards.
#[async_trait]
pub trait Service: Send {
    async fn run(self: Box<Self>, shutdown_rx: broadcast::Receiver<()>);
}

pub struct ServiceManager {
    registered: Vec<(&'static str, Box<dyn Service>)>,
    running: Vec<(&'static str, JoinHandle<()>)>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registered: Vec::new(),
            running: Vec::new(),
            shutdown_tx,
        }
    }

    pub fn register_service(&mut self, name: &'static str, service: Box<dyn Service>) {
        self.registered.push((name, service));
    }

    pub fn has_services(&self) -> bool {
        !self.registered.is_empty() || !self.running.is_empty()
    }

    /// Spawn every registered service with its own shutdown receiver.
    pub fn spawn_all(&mut self) {
        for (name, service) in self.registered.drain(..) {
            let shutdown_rx = self.shutdown_tx.subscribe();
            info!(service = name, "spawning service");
            self.running.push((name, tokio::spawn(service.run(shutdown_rx))));
        }
    }

    /// Signal every running service to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for all running services to exit.
    pub async fn join_all(self) {
        for (name, handle) in self.running {
            if let Err(e) = handle.await {
                warn!(service = name, error = ?e, "service task ended abnormally");
            }
        }
    }
}
