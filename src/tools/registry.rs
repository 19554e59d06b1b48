//! Tool registry for managing MCP tool handlers.
//!
//! Provides a `ToolHandler` trait for implementing tools and a `ToolRegistry`
//! for registering and invoking them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool as McpTool};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::auth::{AccessToken, ScopeError, require_scope};

/// Per-call context handed to tool handlers.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Token validated by the bearer gate for this request. `None` when the
    /// gate runs in gateway mode.
    pub access_token: Option<AccessToken>,
}

impl ToolContext {
    pub fn new(access_token: Option<AccessToken>) -> Self {
        Self { access_token }
    }

    /// Check the call's token for `scope`.
    pub fn require_scope(&self, scope: &str) -> Result<(), ScopeError> {
        require_scope(self.access_token.as_ref(), scope)
    }
}

/// Trait for handling MCP tool invocations.
///
/// Each tool implements this trait to define its schema and execution logic.
pub trait ToolHandler: Send + Sync {
    /// Returns the tool's name (e.g., "create_todo").
    fn name(&self) -> &str;

    /// Returns the tool's human-readable title.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Returns the tool's description.
    fn description(&self) -> &str;

    /// Returns the input schema for this tool.
    fn input_schema(&self) -> JsonObject;

    /// Scope the tool checks before acting, if any.
    fn required_scope(&self) -> Option<&str> {
        None
    }

    /// Executes the tool with the given arguments.
    fn execute(
        &self,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>>;

    /// Converts this handler to an `McpTool` for use in `list_tools`.
    fn to_mcp_tool(&self) -> McpTool {
        use std::borrow::Cow;

        McpTool {
            name: Cow::Owned(self.name().to_string()),
            title: self.title().map(|s| s.to_string()),
            description: Some(Cow::Owned(self.description().to_string())),
            input_schema: Arc::new(self.input_schema()),
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        }
    }
}

/// Registry for managing tool handlers.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler from a type that implements `ToolHandler`.
    pub fn register_handler<T: ToolHandler + 'static>(mut self, handler: T) -> Self {
        self.handlers
            .insert(handler.name().to_string(), Arc::new(handler));
        self
    }

    /// Get a tool handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// All registered tools, sorted by name.
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.handlers
            .values()
            .map(|handler| handler.to_mcp_tool())
            .collect()
    }

    /// Every scope some registered tool requires, sorted.
    pub fn required_scopes(&self) -> Vec<String> {
        self.handlers
            .values()
            .filter_map(|handler| handler.required_scope().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Execute a tool by name with the given arguments.
    pub async fn call_tool(
        &self,
        name: &str,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult> {
        let handler = self
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Tool not found: {}", name))?;
        handler.execute(args, ctx).await
    }

    /// Check if a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Return the number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Return `true` if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Successful tool result carrying `payload` as text and structured content.
pub fn json_result(payload: Value) -> CallToolResult {
    payload_result(payload, false)
}

/// In-band failure: `{"error": message}` with `isError` set.
pub fn error_result(message: impl Display) -> CallToolResult {
    payload_result(json!({ "error": message.to_string() }), true)
}

fn payload_result(payload: Value, is_error: bool) -> CallToolResult {
    let text = serde_json::to_string(&payload)
        .unwrap_or_else(|_| "internal serialization error".to_string());
    CallToolResult {
        content: vec![Content::text(text)],
        structured_content: Some(payload),
        is_error: Some(is_error),
        meta: None,
    }
}

/// Deserialize tool arguments into `T`.
pub fn parse_args<T: DeserializeOwned>(args: JsonObject) -> std::result::Result<T, CallToolResult> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| error_result(format!("Invalid arguments: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TODO_READ;

    struct EchoHandler {
        scope: Option<&'static str>,
        name: &'static str,
    }

    impl ToolHandler for EchoHandler {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echo the arguments back."
        }

        fn input_schema(&self) -> JsonObject {
            let mut schema = JsonObject::new();
            schema.insert("type".to_string(), json!("object"));
            schema
        }

        fn required_scope(&self) -> Option<&str> {
            self.scope
        }

        fn execute(
            &self,
            args: JsonObject,
            _ctx: &ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
            Box::pin(async move { Ok(json_result(Value::Object(args))) })
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .register_handler(EchoHandler {
                scope: Some("b:write"),
                name: "b",
            })
            .register_handler(EchoHandler {
                scope: Some("a:read"),
                name: "a",
            })
            .register_handler(EchoHandler {
                scope: Some("a:read"),
                name: "c",
            })
            .register_handler(EchoHandler {
                scope: None,
                name: "d",
            })
    }

    #[test]
    fn test_registry_lists_tools_by_name() {
        let registry = registry();
        assert_eq!(registry.len(), 4);
        assert!(registry.contains("a"));
        assert!(!registry.contains("z"));

        let names: Vec<String> = registry
            .list_tools()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_required_scopes_are_deduplicated() {
        assert_eq!(registry().required_scopes(), vec!["a:read", "b:write"]);
        assert!(ToolRegistry::new().required_scopes().is_empty());
    }

    #[tokio::test]
    async fn test_call_unknown_tool_fails() {
        let err = registry()
            .call_tool("missing", JsonObject::new(), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Tool not found: missing"));
    }

    #[tokio::test]
    async fn test_call_tool_dispatches() {
        let mut args = JsonObject::new();
        args.insert("x".to_string(), json!(1));
        let result = registry()
            .call_tool("a", args, &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(result.structured_content, Some(json!({"x": 1})));
        assert_eq!(result.is_error, Some(false));
    }

    #[test]
    fn test_error_result_shape() {
        let result = error_result("Todo not found");
        assert_eq!(result.structured_content, Some(json!({"error": "Todo not found"})));
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_context_scope_check() {
        let ctx = ToolContext::new(Some(AccessToken::with_scopes([TODO_READ])));
        assert!(ctx.require_scope(TODO_READ).is_ok());
        assert!(ctx.require_scope("todo:write").is_err());
        assert!(ToolContext::default().require_scope(TODO_READ).is_err());
    }
}
