//! Handler for the `list_todos` tool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::{CallToolResult, JsonObject};
use serde_json::json;

use crate::auth::TODO_READ;
use crate::todos::TodoStore;
use crate::tools::{ToolContext, ToolHandler, error_result, json_result};

/// Lists every stored to-do. Requires `todo:read`.
pub struct ListTodosHandler {
    store: Arc<TodoStore>,
}

impl ListTodosHandler {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

impl ToolHandler for ListTodosHandler {
    fn name(&self) -> &str {
        "list_todos"
    }

    fn description(&self) -> &str {
        "List all todos. Requires: todo:read scope."
    }

    fn input_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), json!({}));
        schema
    }

    fn required_scope(&self) -> Option<&str> {
        Some(TODO_READ)
    }

    fn execute(
        &self,
        _args: JsonObject,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<CallToolResult>> + Send + '_>> {
        let denied = ctx.require_scope(TODO_READ).err();
        let store = self.store.clone();

        Box::pin(async move {
            if let Some(err) = denied {
                return Ok(error_result(err));
            }
            let todos = store.list().await;
            Ok(json_result(json!({ "todos": todos })))
        })
    }
}
