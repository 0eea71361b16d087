//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;

use super::connection::Connection;
use crate::config::Config;
use crate::dispatch::{Cancellation, Invokers};
use crate::error::Result;

/// TCP server for mmpkv
pub struct Server {
    config: Config,
    invokers: Invokers,
    shutdown: Cancellation,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new server dispatching to `invokers`
    pub fn new(config: Config, invokers: Invokers) -> Self {
        Self {
            config,
            invokers,
            shutdown: Cancellation::new(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Signal that stops the accept loop and every connection
    pub fn shutdown_handle(&self) -> Cancellation {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Bind the configured address and serve (blocking)
    pub fn run(&self) -> Result<()> {
        self.config.validate()?;
        let listener = TcpListener::bind(&self.config.listen_addr)?;
        self.serve(listener)
    }

    /// Serve an already bound listener until shutdown, then wait for the
    /// connection threads to finish
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        self.config.validate()?;
        listener.set_nonblocking(true)?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        let poll = Duration::from_millis(self.config.accept_poll_ms.max(1));
        let connections = WaitGroup::new();

        while !self.shutdown.is_cancelled() {
            match listener.accept() {
                Ok((stream, addr)) => self.spawn_connection(stream, addr, connections.clone()),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
                Err(e) => {
                    tracing::error!("Error occurred when accepting client: {}", e);
                    thread::sleep(poll);
                }
            }
        }

        tracing::info!(
            "Shutting down, waiting for {} connections",
            self.active_connections()
        );
        connections.wait();
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr, done: WaitGroup) {
        if self.active_connections() >= self.config.max_connections {
            tracing::warn!(
                "Rejecting {}: connection limit {} reached",
                addr,
                self.config.max_connections
            );
            return;
        }
        // Accepted sockets may inherit the listener's non-blocking mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping {}: {}", addr, e);
            return;
        }

        self.active.fetch_add(1, Ordering::Relaxed);
        let active = Arc::clone(&self.active);
        let invokers = self.invokers.clone();
        let cancel = self.shutdown.clone();
        let config = self.config.clone();

        let spawned = thread::Builder::new()
            .name(format!("mmp-conn-{}", addr))
            .spawn(move || {
                let _done = done;
                match Connection::new(stream, invokers, cancel, &config) {
                    Ok(mut connection) => {
                        if let Err(e) = connection.handle() {
                            tracing::warn!("Connection {} ended with error: {}", addr, e);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to set up connection {}: {}", addr, e),
                }
                active.fetch_sub(1, Ordering::Relaxed);
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread for {}: {}", addr, e);
            self.active.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
