//! Invokers
//!
//! Pluggable command handlers and the ordered registry they live in.
//!
//! Registration order is priority order: dispatch scans the list and the
//! first invoker whose `can_invoke` accepts the command handles it, so an
//! earlier invoker shadows later ones for overlapping keywords.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::CommandContext;
use crate::error::Result;
use crate::protocol::{Command, ObjectWriter, WireError};

/// A handler for some subset of commands
pub trait Invoker: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    fn can_invoke(&self, command: &Command) -> bool;

    /// Handle `command`, writing its response through `ctx`
    fn invoke(&self, command: &Command, ctx: &mut CommandContext<'_>) -> Result<()>;
}

/// How a command was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Handled by the named invoker
    Invoked(String),
    /// No invoker claimed it; an unknown-command error was written
    Unknown,
}

/// Immutable, cheaply cloned snapshot of registered invokers
#[derive(Clone)]
pub struct Invokers {
    list: Arc<[Arc<dyn Invoker>]>,
}

impl Invokers {
    pub fn empty() -> Self {
        Self::from(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Invoker>> {
        self.list.iter()
    }

    /// First invoker, in registration order, that claims `command`
    pub fn find(&self, command: &Command) -> Option<&Arc<dyn Invoker>> {
        self.list.iter().find(|invoker| invoker.can_invoke(command))
    }

    /// Run `command` through the first matching invoker, or answer with an
    /// unknown-command error when none matches.
    pub fn invoke(&self, command: &Command, ctx: &mut CommandContext<'_>) -> Result<Invocation> {
        match self.find(command) {
            Some(invoker) => {
                tracing::trace!(
                    "Invoking {} with {} ({} params, depth {})",
                    command.keyword(),
                    invoker.name(),
                    command.parameters().len(),
                    ctx.depth()
                );
                invoker.invoke(command, ctx)?;
                Ok(Invocation::Invoked(invoker.name().to_string()))
            }
            None => {
                tracing::debug!("Unknown command {}", command.keyword());
                ctx.response()
                    .write_wire_error(WireError::unknown_command(command.keyword()))?;
                Ok(Invocation::Unknown)
            }
        }
    }
}

impl Default for Invokers {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Arc<dyn Invoker>>> for Invokers {
    fn from(list: Vec<Arc<dyn Invoker>>) -> Self {
        Self { list: list.into() }
    }
}

impl fmt::Debug for Invokers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.list.iter().map(|invoker| invoker.name()))
            .finish()
    }
}

/// Append-only builder for an [`Invokers`] snapshot
#[derive(Default)]
pub struct InvokerRegistry {
    list: Vec<Arc<dyn Invoker>>,
}

impl InvokerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an invoker at the lowest priority so far
    pub fn register(&mut self, invoker: impl Invoker + 'static) -> &mut Self {
        self.list.push(Arc::new(invoker));
        self
    }

    pub fn register_shared(&mut self, invoker: Arc<dyn Invoker>) -> &mut Self {
        self.list.push(invoker);
        self
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn snapshot(&self) -> Invokers {
        Invokers::from(self.list.clone())
    }
}

// =============================================================================
// Process-wide registry
// =============================================================================

static GLOBAL_INVOKERS: RwLock<Vec<Arc<dyn Invoker>>> = RwLock::new(Vec::new());

/// Register an invoker process-wide. Call during startup, before traffic;
/// dispatchers created earlier keep the snapshot they were given.
pub fn register_invoker(invoker: impl Invoker + 'static) {
    let invoker: Arc<dyn Invoker> = Arc::new(invoker);
    tracing::debug!("Registering invoker {}", invoker.name());
    GLOBAL_INVOKERS.write().push(invoker);
}

/// Snapshot of the process-wide invokers in registration order
pub fn registered_invokers() -> Invokers {
    Invokers::from(GLOBAL_INVOKERS.read().clone())
}
