//! Tools domain module.
//!
//! This module handles all tool-related functionality for the MCP server.
//! Tools are typed functions that MCP clients discover with `tools/list`
//! and invoke with `tools/call`.
//!
//! ## Architecture
//!
//! - `definitions/` - Built-in tool implementations (one file per tool)
//! - `handlers.rs` - The `Tool` declaration, its builder and the handler trait
//! - `schema.rs` - Parameter types and schema derivation
//! - `registry.rs` - Central tool registry
//! - `dispatcher.rs` - Argument validation and execution
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` (e.g., `my_tool.rs`)
//! 2. Declare its parameters and body with `Tool::builder()`
//! 3. Export it in `definitions/mod.rs`
//! 4. Register it in `ToolRegistry::with_builtin_tools()`

pub mod definitions;
mod dispatcher;
mod error;
mod handlers;
mod registry;
mod schema;

pub use dispatcher::{Dispatcher, InvocationError, InvocationResponse, validate};
pub use error::ToolError;
pub use handlers::{Tool, ToolArguments, ToolBuilder, ToolHandler};
pub use registry::ToolRegistry;
pub use schema::{ParamType, Parameter, ParameterSchema, ToolSchema};
