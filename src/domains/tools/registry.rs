//! Tool Registry - central registration and lookup for all tools.
//!
//! This module provides:
//! - Registration of tools at startup, rejecting duplicate names
//! - Lookup by name for the dispatcher
//! - Schema listing in registration order
//!
//! The registry is built once and then shared read-only behind an `Arc`, so
//! concurrent sessions never contend on it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::definitions::SumTool;
use super::error::ToolError;
use super::handlers::Tool;
use super::schema::ToolSchema;

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - holds the registered tools in registration order.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in tool.
    ///
    /// This is the single place where built-in tools are registered.
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        for tool in [SumTool::tool()] {
            // Built-in names are distinct constants.
            if let Err(e) = registry.register(tool) {
                tracing::error!("Failed to register built-in tool: {}", e);
            }
        }
        registry
    }

    /// Add a tool. Fails with [`ToolError::DuplicateName`] if the name is
    /// already taken.
    pub fn register(&mut self, tool: Tool) -> Result<(), ToolError> {
        if self.index.contains_key(tool.name()) {
            return Err(ToolError::duplicate(tool.name()));
        }

        debug!("Registering tool: {}", tool.name());
        self.index.insert(tool.name().to_string(), self.tools.len());
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    /// Builder-style registration.
    pub fn with_tool(mut self, tool: Tool) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Result<Arc<Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&i| self.tools[i].clone())
            .ok_or_else(|| ToolError::not_found(name))
    }

    /// Schemas of all registered tools, in registration order.
    ///
    /// Schemas are derived on every call; repeated calls on an unchanged
    /// registry return identical sequences.
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| ToolSchema::derive(t)).collect()
    }

    /// Get all tool names, in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
