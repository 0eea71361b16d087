//! Configuration for mmpkv
//!
//! Centralized configuration with sensible defaults.

use crate::error::{MmpError, Result};
use crate::protocol::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_NESTING_DEPTH};

/// Diagnostic code used when none (or an unusable one) is configured
pub const DEFAULT_INTERNAL_ERROR_CODE: &str = "NCD0001";

/// Main configuration for an mmpkv node
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none).
    /// Idle connections check for shutdown at this interval.
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// How long the idle accept loop sleeps between polls (milliseconds)
    pub accept_poll_ms: u64,

    // -------------------------------------------------------------------------
    // Dispatch Configuration
    // -------------------------------------------------------------------------
    /// Size of each chunk read from a connection (bytes)
    pub read_buffer_size: usize,

    /// Diagnostic code reported for unexpected handler failures.
    /// Written on the wire as `I` followed by this code (max 7 ASCII chars).
    pub internal_error_code: String,

    // -------------------------------------------------------------------------
    // Parser Limits
    // -------------------------------------------------------------------------
    /// Deepest array/map nesting accepted from a client
    pub max_nesting_depth: usize,

    /// Largest declared length or incomplete request buffered per
    /// connection (bytes)
    pub max_frame_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7070".to_string(),
            max_connections: 1024,
            read_timeout_ms: 1000,
            write_timeout_ms: 5000,
            accept_poll_ms: 50,
            read_buffer_size: 8192,
            internal_error_code: DEFAULT_INTERNAL_ERROR_CODE.to_string(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check values that would otherwise only fail once traffic arrives
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(MmpError::Config("read_buffer_size must be non-zero".into()));
        }
        if self.max_connections == 0 {
            return Err(MmpError::Config("max_connections must be non-zero".into()));
        }
        if self.max_nesting_depth == 0 {
            return Err(MmpError::Config("max_nesting_depth must be non-zero".into()));
        }
        if self.max_frame_size == 0 {
            return Err(MmpError::Config("max_frame_size must be non-zero".into()));
        }
        Self::check_internal_error_code(&self.internal_error_code)
    }

    /// The code must fit the 7 bytes left after the `I` prefix
    pub fn check_internal_error_code(code: &str) -> Result<()> {
        if !code.is_ascii() || code.len() > 7 {
            return Err(MmpError::Config(format!(
                "internal_error_code must be at most 7 ASCII characters, got {:?}",
                code
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the accept loop poll interval (in milliseconds)
    pub fn accept_poll_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_ms = ms;
        self
    }

    /// Set the per-read chunk size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the internal error diagnostic code
    pub fn internal_error_code(mut self, code: impl Into<String>) -> Self {
        self.config.internal_error_code = code.into();
        self
    }

    /// Set the deepest accepted array/map nesting
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    /// Set the frame size limit (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
