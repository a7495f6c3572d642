//! Integer addition tool definition.

use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::tools::handlers::{Tool, ToolArguments};
use crate::domains::tools::schema::{ParamType, Parameter};

/// Sum tool - adds two integers.
pub struct SumTool;

impl SumTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "sum";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Add two integers together.";

    /// Execute the tool logic.
    ///
    /// Overflow of 64-bit signed addition is reported as a failure rather
    /// than wrapping.
    #[instrument(skip_all, name = "sum")]
    pub async fn execute(arguments: ToolArguments) -> anyhow::Result<Value> {
        let a = arguments.get_i64("a")?;
        let b = arguments.get_i64("b")?;

        let sum = a
            .checked_add(b)
            .ok_or_else(|| anyhow::anyhow!("integer overflow adding {a} and {b}"))?;

        info!("sum({}, {}) = {}", a, b, sum);
        Ok(json!(sum))
    }

    /// Create the Tool declaration for registration.
    pub fn tool() -> Tool {
        Tool::builder(Self::NAME)
            .description(Self::DESCRIPTION)
            .param(Parameter::required("a", ParamType::Integer).with_description("First integer"))
            .param(Parameter::required("b", ParamType::Integer).with_description("Second integer"))
            .returns(ParamType::Integer)
            .handler(Self::execute)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(a: i64, b: i64) -> ToolArguments {
        match json!({ "a": a, "b": b }) {
            Value::Object(map) => ToolArguments::new(map),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_sum_execute() {
        assert_eq!(SumTool::execute(args(5, 3)).await.unwrap(), json!(8));
        assert_eq!(SumTool::execute(args(-2, 7)).await.unwrap(), json!(5));
        assert_eq!(SumTool::execute(args(0, 0)).await.unwrap(), json!(0));
    }

    #[tokio::test]
    async fn test_sum_overflow() {
        let err = SumTool::execute(args(i64::MAX, 1)).await.unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_sum_declaration() {
        let tool = SumTool::tool();
        assert_eq!(tool.name(), "sum");
        let names: Vec<_> = tool.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(tool.parameters().iter().all(|p| p.is_required()));
    }
}
