//! Tools domain module.
//!
//! Tools are the only MCP capability these servers expose. A call flows
//! `Dispatcher` -> `ToolRegistry` -> [`ToolHandler`] -> envelope.
//!
//! ## Architecture
//!
//! - `definitions/` - toolsets, one directory each, one file per tool family
//! - `toolsets.rs` - toolset selection and registry construction
//! - `registry.rs` - per-server table of handlers, in registration order
//! - `dispatcher.rs` - name routing and error envelope conversion
//! - `handlers.rs` - the handler trait and descriptor/argument helpers
//! - `error.rs` - tool error taxonomy
//!
//! ## Adding a New Tool
//!
//! 1. Implement [`ToolHandler`] in the toolset's directory under `definitions/`
//! 2. Return it from that toolset's `handlers` function
//!
//! The server and transports never need to change.

pub mod definitions;
mod dispatcher;
mod error;
mod handlers;
mod registry;
pub mod toolsets;

pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, ToolError};
pub use handlers::*;
pub use registry::ToolRegistry;
pub use toolsets::{ToolContext, Toolset, build_registry};
