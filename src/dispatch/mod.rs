//! Dispatch Module
//!
//! Routes decoded commands to pluggable invokers and frames the responses.
//!
//! ## Architecture
//! - One [`Dispatcher`] per connection, strictly sequential within a batch
//! - Invokers are looked up in an immutable [`Invokers`] snapshot taken at
//!   startup, first match wins
//! - Each command runs inside a [`CommandContext`] on the dispatcher's stack
//! - [`Cancellation`] is checked before each read and before each command

mod builtin;
mod cancel;
mod context;
mod dispatcher;
mod invoker;

pub use builtin::ServerInvoker;
pub use cancel::Cancellation;
pub use context::CommandContext;
pub use dispatcher::{CycleOutcome, CycleStats, Dispatcher};
pub use invoker::{
    register_invoker, registered_invokers, Invocation, Invoker, InvokerRegistry, Invokers,
};
