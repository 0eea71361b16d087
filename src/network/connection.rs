//! Connection Handler
//!
//! Handles individual client connections.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use crate::config::Config;
use crate::dispatch::{Cancellation, CycleOutcome, Dispatcher, Invokers};
use crate::error::{MmpError, Result};

/// Handles a single client connection
pub struct Connection {
    /// Dispatch pipeline reading from and writing to the socket
    dispatcher: Dispatcher<TcpStream, TcpStream>,

    /// Server shutdown signal
    cancel: Cancellation,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Splits the socket into read/write handles and configures timeouts
    pub fn new(
        stream: TcpStream,
        invokers: Invokers,
        cancel: Cancellation,
        config: &Config,
    ) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        if config.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        }
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            dispatcher: Dispatcher::with_config(
                read_stream,
                write_stream,
                invokers,
                cancel.clone(),
                config,
            ),
            cancel,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Runs dispatch cycles until the client disconnects, the server shuts
    /// down or the socket fails.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            match self.dispatcher.run_cycle() {
                Ok(CycleOutcome::Closed) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Ok(CycleOutcome::Dispatched(stats)) => {
                    tracing::trace!("Dispatched batch for {}: {:?}", self.peer_addr, stats);
                }
                Err(MmpError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Idle read timeout (Windows reports TimedOut): keep the
                    // connection unless the server is shutting down
                    if self.cancel.is_cancelled() {
                        tracing::debug!("Closing idle connection {} on shutdown", self.peer_addr);
                        return Ok(());
                    }
                }
                Err(MmpError::Io(ref e))
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset
                            | ErrorKind::ConnectionAborted
                            | ErrorKind::BrokenPipe
                            | ErrorKind::UnexpectedEof
                    ) =>
                {
                    tracing::debug!("Connection to {} lost: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error on connection {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
