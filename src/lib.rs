//! # mmpkv
//!
//! Wire-protocol core of a distributed key-value node:
//! - MMP object model with a resumable, allocation-light parser
//! - Streaming response writer with scoped array/map builders
//! - Command envelopes and a pluggable invoker registry
//! - Per-connection dispatch loop with error containment
//! - Blocking TCP server and client
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (thread per connection)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Dispatcher                               │
//! │        read ─► parse ─► decode ─► invoke ─► flush            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Parser    │          │  Invokers   │
//!   │ (resumable) │          │ (snapshot)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Writer    │
//!                           │  (buffered) │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod dispatch;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MmpError, Result, SyntaxError};
pub use config::Config;
pub use protocol::{Command, ObjectWriter, Parser, ProtocolObject};
pub use dispatch::{Cancellation, CommandContext, Dispatcher, Invoker, Invokers};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of mmpkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
