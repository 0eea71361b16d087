//! Command context
//!
//! Binds the command being handled to the response buffer collecting its
//! output. Contexts live on the dispatcher's call stack: a nested invocation
//! borrows its parent, so the parent is restored simply by the child going
//! out of scope, and no context is ever shared between connections.

use super::invoker::{Invocation, Invokers};
use crate::error::Result;
use crate::protocol::{Command, MessageBuffer};

/// Immutable link in the context chain
#[derive(Debug, Clone, Copy)]
struct Frame<'a> {
    command: &'a Command,
    parent: Option<&'a Frame<'a>>,
}

/// Execution scope of one command
pub struct CommandContext<'a> {
    frame: Frame<'a>,
    response: &'a mut MessageBuffer,
    invokers: &'a Invokers,
}

impl<'a> CommandContext<'a> {
    /// Open a top-level context
    pub fn new(
        command: &'a Command,
        response: &'a mut MessageBuffer,
        invokers: &'a Invokers,
    ) -> Self {
        Self {
            frame: Frame {
                command,
                parent: None,
            },
            response,
            invokers,
        }
    }

    pub fn command(&self) -> &Command {
        self.frame.command
    }

    /// Response buffer shared by the whole chain
    pub fn response(&mut self) -> &mut MessageBuffer {
        &mut *self.response
    }

    /// Command of the enclosing context, if this one is nested
    pub fn parent(&self) -> Option<&Command> {
        self.frame.parent.map(|frame| frame.command)
    }

    /// Commands from this context up to the root
    pub fn ancestry(&self) -> impl Iterator<Item = &Command> {
        std::iter::successors(Some(&self.frame), |frame| frame.parent).map(|frame| frame.command)
    }

    /// 0 for a top-level context
    pub fn depth(&self) -> usize {
        self.ancestry().count() - 1
    }

    /// Invoker snapshot this context dispatches against
    pub fn invokers(&self) -> &Invokers {
        self.invokers
    }

    /// Dispatch `command` in a child context writing to the same response.
    pub fn invoke_nested(&mut self, command: &Command) -> Result<Invocation> {
        let invokers = self.invokers;
        let mut child = CommandContext {
            frame: Frame {
                command,
                parent: Some(&self.frame),
            },
            response: &mut *self.response,
            invokers,
        };
        invokers.invoke(command, &mut child)
    }
}
