//! Tool definitions and their executable bodies.
//!
//! A [`Tool`] couples a static declaration (name, description, parameters,
//! return type) with a [`ToolHandler`] that runs on validated arguments.
//! Tools are assembled with [`Tool::builder`] and handed to the registry at
//! startup.

use std::future::Future;
use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use serde_json::{Map, Value};

use super::schema::{ParamType, Parameter};

// ============================================================================
// Arguments
// ============================================================================

/// Validated arguments passed to a tool body.
///
/// Every declared parameter is present (defaults already applied) and has
/// the declared type, so the typed accessors only fail on a programming
/// error in the tool itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_i64(&self, name: &str) -> anyhow::Result<i64> {
        self.get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("argument '{name}' is not an integer"))
    }

    pub fn get_f64(&self, name: &str) -> anyhow::Result<f64> {
        self.get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow::anyhow!("argument '{name}' is not a number"))
    }

    pub fn get_str(&self, name: &str) -> anyhow::Result<&str> {
        self.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("argument '{name}' is not a string"))
    }

    pub fn get_bool(&self, name: &str) -> anyhow::Result<bool> {
        self.get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| anyhow::anyhow!("argument '{name}' is not a boolean"))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

// ============================================================================
// Handler trait
// ============================================================================

/// Executable body of a tool.
///
/// Implement this trait directly for stateful tools; plain async closures
/// are accepted by [`ToolBuilder::handler`].
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. Any error is reported to the caller as an execution
    /// failure carrying the error's message.
    async fn call(&self, arguments: ToolArguments) -> anyhow::Result<Value>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
struct FnHandler<F>(F);

#[async_trait::async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(ToolArguments) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync,
{
    async fn call(&self, arguments: ToolArguments) -> anyhow::Result<Value> {
        (self.0)(arguments).await
    }
}

// ============================================================================
// Tool
// ============================================================================

/// A named, schema-described callable exposed by the server.
///
/// The declaration is immutable once built.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    returns: ParamType,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    /// Start building a tool with the given unique name.
    pub fn builder(name: impl Into<String>) -> ToolBuilder {
        ToolBuilder {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            returns: ParamType::String,
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn returns(&self) -> ParamType {
        self.returns
    }

    /// Shared handle to the body, for running it on another task.
    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        self.handler.clone()
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Tool`].
pub struct ToolBuilder {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    returns: ParamType,
    handler: Option<Arc<dyn ToolHandler>>,
}

impl ToolBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a parameter. Declaration order is preserved in the schema.
    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns(mut self, ty: ParamType) -> Self {
        self.returns = ty;
        self
    }

    /// Use an async closure as the body.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let handler: Arc<dyn ToolHandler> =
            Arc::new(FnHandler(move |args: ToolArguments| f(args).boxed()));
        self.handler = Some(handler);
        self
    }

    /// Use a [`ToolHandler`] implementation as the body.
    pub fn handler_impl(mut self, handler: impl ToolHandler + 'static) -> Self {
        let handler: Arc<dyn ToolHandler> = Arc::new(handler);
        self.handler = Some(handler);
        self
    }

    /// Finish the tool. A tool without a body fails every call.
    pub fn build(self) -> Tool {
        let handler: Arc<dyn ToolHandler> = match self.handler {
            Some(handler) => handler,
            None => {
                let name = self.name.clone();
                Arc::new(FnHandler(move |_args: ToolArguments| {
                    let name = name.clone();
                    async move { Err::<Value, _>(anyhow::anyhow!("tool '{name}' has no handler")) }
                        .boxed()
                }))
            }
        };

        Tool {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            returns: self.returns,
            handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait::async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, arguments: ToolArguments) -> anyhow::Result<Value> {
            Ok(Value::Object(arguments.into_inner()))
        }
    }

    fn args(value: Value) -> ToolArguments {
        match value {
            Value::Object(map) => ToolArguments::new(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_typed_accessors() {
        let a = args(json!({"i": 3, "f": 1.5, "s": "x", "b": true}));
        assert_eq!(a.get_i64("i").unwrap(), 3);
        assert_eq!(a.get_f64("f").unwrap(), 1.5);
        assert_eq!(a.get_str("s").unwrap(), "x");
        assert!(a.get_bool("b").unwrap());
        assert!(a.get_i64("s").is_err());
        assert!(a.get_str("missing").is_err());
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let tool = Tool::builder("double")
            .param(Parameter::required("x", ParamType::Integer))
            .returns(ParamType::Integer)
            .handler(|args| async move { Ok(json!(args.get_i64("x")? * 2)) })
            .build();

        let out = tool.handler().call(args(json!({"x": 21}))).await.unwrap();
        assert_eq!(out, json!(42));
        assert_eq!(tool.returns(), ParamType::Integer);
    }

    #[tokio::test]
    async fn test_trait_handler() {
        let tool = Tool::builder("echo").handler_impl(Echo).build();
        let out = tool.handler().call(args(json!({"k": 1}))).await.unwrap();
        assert_eq!(out["k"], 1);
    }

    #[tokio::test]
    async fn test_missing_handler_fails() {
        let tool = Tool::builder("empty").build();
        let err = tool.handler().call(ToolArguments::default()).await.unwrap_err();
        assert!(err.to_string().contains("no handler"));
    }
}
