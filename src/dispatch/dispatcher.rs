//! Per-connection dispatch pipeline
//!
//! One cycle reads a batch of requests, decodes them into commands, runs
//! each through the invoker snapshot in order and flushes the responses.
//!
//! ## Cycle
//! ```text
//! read ──► parse ──► decode ──► dispatch (one command at a time) ──► flush
//!            │          │                 │
//!            └── syntax error ──► error object ◄── handler error
//! ```
//! The flush runs on every path. Syntax errors and handler failures become
//! error objects in the response; they never escape the cycle. Only I/O
//! failures on the stream itself are returned to the caller.

use std::any::Any;
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};

use super::cancel::Cancellation;
use super::context::CommandContext;
use super::invoker::{Invocation, Invokers};
use crate::config::{Config, DEFAULT_INTERNAL_ERROR_CODE};
use crate::error::{MmpError, Result, SyntaxError};
use crate::protocol::{
    decode_commands, read_batch, Command, ObjectWriter, Parser, StreamWriter, WireError,
};

/// What happened during one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Commands decoded from the batch
    pub commands: usize,
    pub invoked: usize,
    pub unknown: usize,
    pub syntax_errors: usize,
    pub internal_errors: usize,
    /// Commands not run because of cancellation or an aborted batch
    pub skipped: usize,
    pub bytes_flushed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A batch was handled and its responses flushed
    Dispatched(CycleStats),
    /// The stream ended or cancellation was observed
    Closed,
}

/// Dispatch loop state for one connection
pub struct Dispatcher<R: Read, W: Write> {
    reader: R,
    response: StreamWriter<W>,
    parser: Parser,
    chunk: Vec<u8>,
    invokers: Invokers,
    cancel: Cancellation,
    internal_code: String,
}

impl<R: Read, W: Write> Dispatcher<R, W> {
    /// Create a dispatcher with the default configuration
    pub fn new(reader: R, writer: W, invokers: Invokers, cancel: Cancellation) -> Self {
        Self::with_config(reader, writer, invokers, cancel, &Config::default())
    }

    pub fn with_config(
        reader: R,
        writer: W,
        invokers: Invokers,
        cancel: Cancellation,
        config: &Config,
    ) -> Self {
        // An unusable code would fail to encode exactly when a handler fails
        let internal_code = match Config::check_internal_error_code(&config.internal_error_code) {
            Ok(()) => config.internal_error_code.clone(),
            Err(e) => {
                tracing::warn!("{}; using {}", e, DEFAULT_INTERNAL_ERROR_CODE);
                DEFAULT_INTERNAL_ERROR_CODE.to_string()
            }
        };

        Self {
            reader,
            response: StreamWriter::new(writer),
            parser: Parser::with_limits(config.max_nesting_depth, config.max_frame_size),
            chunk: vec![0u8; config.read_buffer_size.max(1)],
            invokers,
            cancel,
            internal_code,
        }
    }

    /// Run cycles until the stream closes or cancellation is requested
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.run_cycle()? {
                CycleOutcome::Closed => return Ok(()),
                CycleOutcome::Dispatched(stats) => {
                    tracing::trace!("Cycle done: {:?}", stats);
                }
            }
        }
    }

    /// Read, dispatch and flush one batch
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        if self.cancel.is_cancelled() {
            return Ok(CycleOutcome::Closed);
        }

        let mut stats = CycleStats::default();
        let outcome = self.read_and_dispatch(&mut stats);

        // Flush on every path; a read failure still reports that failure.
        let flushed = self.response.flush();
        let closed = outcome?;
        stats.bytes_flushed = flushed?;

        if closed {
            Ok(CycleOutcome::Closed)
        } else {
            Ok(CycleOutcome::Dispatched(stats))
        }
    }

    /// Returns `true` when the connection should close
    fn read_and_dispatch(&mut self, stats: &mut CycleStats) -> Result<bool> {
        let objects = match read_batch(&mut self.reader, &mut self.parser, &mut self.chunk) {
            Ok(Some(objects)) => objects,
            Ok(None) => {
                if self.parser.has_remaining() {
                    tracing::debug!(
                        "Stream closed with {} bytes of an incomplete object",
                        self.parser.remaining().len()
                    );
                }
                return Ok(true);
            }
            Err(MmpError::Syntax(e)) => {
                // The buffered bytes cannot be resynchronised
                self.parser.reset();
                self.report_syntax_error(&e, stats)?;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let commands = match decode_commands(objects) {
            Ok(commands) => commands,
            Err(e) => {
                self.report_syntax_error(&e, stats)?;
                return Ok(false);
            }
        };
        stats.commands = commands.len();

        for (index, command) in commands.iter().enumerate() {
            if self.cancel.is_cancelled() {
                stats.skipped = commands.len() - index;
                tracing::debug!("Cancelled with {} commands left in batch", stats.skipped);
                return Ok(true);
            }

            match self.dispatch_one(command) {
                Ok(Invocation::Invoked(_)) => stats.invoked += 1,
                Ok(Invocation::Unknown) => stats.unknown += 1,
                Err(MmpError::Syntax(e)) => {
                    stats.skipped = commands.len() - index - 1;
                    self.report_syntax_error(&e, stats)?;
                    return Ok(false);
                }
                Err(e) => {
                    tracing::error!("Error occurred when handling {}: {}", command.keyword(), e);
                    stats.internal_errors += 1;
                    stats.skipped = commands.len() - index - 1;
                    self.response
                        .write_wire_error(WireError::internal(&self.internal_code))?;
                    return Ok(false);
                }
            }
        }

        Ok(false)
    }

    /// Invoke one command in a fresh context. Output of a failed handler is
    /// rolled back so the error object replaces it.
    fn dispatch_one(&mut self, command: &Command) -> Result<Invocation> {
        let mark = self.response.buffer().mark();

        let invokers = &self.invokers;
        let response = self.response.buffer_mut();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = CommandContext::new(command, response, invokers);
            invokers.invoke(command, &mut ctx)
        }))
        .unwrap_or_else(|payload| {
            Err(MmpError::Invoke(format!(
                "invoker panicked: {}",
                panic_message(payload.as_ref())
            )))
        });

        if result.is_err() {
            self.response.buffer_mut().rollback(mark);
        }
        result
    }

    fn report_syntax_error(&mut self, error: &SyntaxError, stats: &mut CycleStats) -> Result<()> {
        tracing::warn!("Syntax error: {}", error);
        stats.syntax_errors += 1;
        self.response.write_wire_error(WireError::syntax(error))
    }

    pub fn invokers(&self) -> &Invokers {
        &self.invokers
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn writer(&self) -> &W {
        self.response.get_ref()
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.response.into_inner())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
