//! Tool definitions module.
//!
//! This module exports all built-in tool definitions.
//! Each tool is defined in its own file.

pub mod sum;

pub use sum::SumTool;
