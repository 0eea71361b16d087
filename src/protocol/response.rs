//! Error responses
//!
//! The fixed error objects the dispatch pipeline writes back to clients.

use super::object::ProtocolObject;
use crate::error::SyntaxError;

/// Request could not be parsed or decoded
pub const SYNTAX_ERROR_CODE: &str = "00000001";

/// No invoker claimed the command
pub const UNKNOWN_COMMAND_CODE: &str = "00000002";

/// Command was claimed but its arguments were rejected
pub const ARGUMENT_ERROR_CODE: &str = "00000003";

const INTERNAL_ERROR_MESSAGE: &str = "Internal error occurred.";

/// An error response: ASCII code plus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError {
    pub code: String,
    pub message: String,
}

impl WireError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Syntax error with the whole cause chain rendered into the message
    pub fn syntax(error: &SyntaxError) -> Self {
        Self::new(SYNTAX_ERROR_CODE, error.render())
    }

    pub fn unknown_command(keyword: &str) -> Self {
        Self::new(UNKNOWN_COMMAND_CODE, format!("Unknown Command {}", keyword))
    }

    pub fn invalid_arguments(keyword: &str, reason: &str) -> Self {
        Self::new(
            ARGUMENT_ERROR_CODE,
            format!("Invalid arguments for {}: {}", keyword, reason),
        )
    }

    /// Generic internal error. The code is `I` + the diagnostic code,
    /// left aligned in the remaining 7 bytes.
    pub fn internal(diagnostic: &str) -> Self {
        Self::new(format!("I{:<7}", diagnostic), INTERNAL_ERROR_MESSAGE)
    }

    pub fn into_object(self) -> ProtocolObject {
        ProtocolObject::Error {
            code: self.code,
            message: self.message,
        }
    }
}

impl From<WireError> for ProtocolObject {
    fn from(error: WireError) -> Self {
        error.into_object()
    }
}
