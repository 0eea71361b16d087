//! Error types for mmpkv
//!
//! Provides a unified error type for all operations, plus the structured
//! syntax error raised by the parser and the command decoder.

use std::fmt;

use thiserror::Error;

/// Result type alias using MmpError
pub type Result<T> = std::result::Result<T, MmpError>;

/// Unified error type for mmpkv operations
#[derive(Debug, Error)]
pub enum MmpError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Encoding error: {0}")]
    Encode(String),

    // -------------------------------------------------------------------------
    // Dispatch Errors
    // -------------------------------------------------------------------------
    #[error("Invoker failed: {0}")]
    Invoke(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A fatal syntax error, optionally caused by a nested one.
///
/// `position` is a byte offset for parser errors and an object index for
/// command decoding errors; the message already names it. Errors raised while
/// reading an array item or a map entry are wrapped by the enclosing frame,
/// so the chain reads outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    message: String,
    position: usize,
    cause: Option<Box<SyntaxError>>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            cause: None,
        }
    }

    /// Wrap `cause` in a new outer frame.
    pub fn wrap(message: impl Into<String>, position: usize, cause: SyntaxError) -> Self {
        Self {
            message: message.into(),
            position,
            cause: Some(Box::new(cause)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Offset (or index) the error was detected at
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn cause(&self) -> Option<&SyntaxError> {
        self.cause.as_deref()
    }

    /// Iterate the chain, outermost frame first
    pub fn chain(&self) -> impl Iterator<Item = &SyntaxError> {
        std::iter::successors(Some(self), |e| e.cause())
    }

    /// Innermost frame of the chain
    pub fn root_cause(&self) -> &SyntaxError {
        self.chain().last().unwrap_or(self)
    }

    /// Render the whole chain, one frame per line.
    ///
    /// The n-th nested cause is indented by `2 * n` tabs.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (depth, frame) in self.chain().enumerate() {
            if depth > 0 {
                out.push('\n');
                out.extend(std::iter::repeat('\t').take(depth * 2));
            }
            out.push_str(&frame.to_string());
        }
        out
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SyntaxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
