//! Schema derivation for registered tools.
//!
//! Every tool declares its parameters statically with [`Parameter`] and a
//! [`ParamType`] tag. The schema is a pure projection of that declaration:
//! deriving twice from the same tool yields identical schemas, and nothing
//! is inspected at runtime.

use std::sync::Arc;

use rmcp::model::{JsonObject, Tool as McpTool};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::handlers::Tool;

// ============================================================================
// Parameter types
// ============================================================================

/// Primitive type tag for parameters and return values.
///
/// Numeric types are deliberately not narrowed: integers and floating point
/// numbers are the only numeric categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    String,
    Boolean,
}

impl ParamType {
    /// JSON-Schema type name.
    pub fn json_type(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    /// Check a JSON value against this type and normalize it.
    ///
    /// Integers may be supplied as integral numeric literals (`5.0`), which
    /// are normalized to a JSON integer. Returns `None` on a mismatch.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match self {
            Self::Integer => {
                if let Some(i) = value.as_i64() {
                    return Some(Value::from(i));
                }
                let f = value.as_f64()?;
                if value.is_f64()
                    && f.is_finite()
                    && f.fract() == 0.0
                    && f >= i64::MIN as f64
                    && f < i64::MAX as f64
                {
                    Some(Value::from(f as i64))
                } else {
                    None
                }
            }
            Self::Number => value.is_number().then(|| value.clone()),
            Self::String => value.is_string().then(|| value.clone()),
            Self::Boolean => value.is_boolean().then(|| value.clone()),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.json_type())
    }
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Parameter declaration
// ============================================================================

/// A declared tool parameter.
///
/// A parameter without a default is required.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParamType,
    pub description: Option<String>,
    pub default: Option<Value>,
}

impl Parameter {
    /// Declare a required parameter.
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            default: None,
        }
    }

    /// Declare an optional parameter with a default value.
    pub fn optional(name: impl Into<String>, ty: ParamType, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            default: Some(default.into()),
        }
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

// ============================================================================
// Derived schema
// ============================================================================

/// Serializable description of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Serializable description of a tool, derived from its declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSchema>,
    pub returns: ParamType,
}

impl ToolSchema {
    /// Derive the schema of a tool. Parameters keep declaration order.
    pub fn derive(tool: &Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool
                .parameters()
                .iter()
                .map(|p| ParameterSchema {
                    name: p.name.clone(),
                    ty: p.ty,
                    required: p.is_required(),
                    description: p.description.clone(),
                    default: p.default.clone(),
                })
                .collect(),
            returns: tool.returns(),
        }
    }

    /// Names of the required parameters, in declaration order.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// JSON-Schema object describing the tool's arguments.
    pub fn input_schema(&self) -> JsonObject {
        // Properties are listed in declaration order (`preserve_order`).
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(param.ty.json_type()));
            if let Some(description) = &param.description {
                prop.insert("description".into(), json!(description));
            }
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("title".into(), json!(format!("{}Arguments", self.name)));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), json!(self.required()));
        schema
    }

    /// JSON-Schema object describing the structured result.
    pub fn output_schema(&self) -> JsonObject {
        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert(
            "properties".into(),
            json!({ "result": { "type": self.returns.json_type() } }),
        );
        schema.insert("required".into(), json!(["result"]));
        schema
    }

    /// Wire representation used by `tools/list`.
    pub fn to_tool(&self) -> McpTool {
        McpTool {
            name: self.name.clone().into(),
            description: Some(self.description.clone().into()),
            input_schema: Arc::new(self.input_schema()),
            annotations: None,
            output_schema: Some(Arc::new(self.output_schema())),
            icons: None,
            meta: None,
            title: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
