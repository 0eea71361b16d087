//! Built-in server commands
//!
//! - `PING [message]`: `PONG`, or the message when one is given
//! - `ECHO message`: the message, unchanged
//! - `TIME`: server clock as unix milliseconds (Long)

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::context::CommandContext;
use super::invoker::Invoker;
use crate::error::{MmpError, Result};
use crate::protocol::{Command, ObjectWriter, WireError};

const KEYWORDS: [&str; 3] = ["PING", "ECHO", "TIME"];

/// Connection-level commands every node answers
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerInvoker;

impl Invoker for ServerInvoker {
    fn name(&self) -> &str {
        "server"
    }

    fn can_invoke(&self, command: &Command) -> bool {
        KEYWORDS.iter().any(|keyword| command.is(keyword))
    }

    fn invoke(&self, command: &Command, ctx: &mut CommandContext<'_>) -> Result<()> {
        let response = ctx.response();

        if command.is("PING") {
            match command.parameters() {
                [] => response.write_str("PONG"),
                [message] => response.write_object(message.clone()),
                _ => response.write_wire_error(WireError::invalid_arguments(
                    command.keyword(),
                    "expected at most 1 argument",
                )),
            }
        } else if command.is("ECHO") {
            match command.parameters() {
                [message] => response.write_object(message.clone()),
                _ => response.write_wire_error(WireError::invalid_arguments(
                    command.keyword(),
                    "expected exactly 1 argument",
                )),
            }
        } else {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| MmpError::Invoke(format!("clock before unix epoch: {}", e)))?;
            response.write_long(unix_millis(now)?)
        }
    }
}

fn unix_millis(since_epoch: Duration) -> Result<i64> {
    i64::try_from(since_epoch.as_millis())
        .map_err(|_| MmpError::Invoke(format!("clock out of range: {:?}", since_epoch)))
}
