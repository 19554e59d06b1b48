//! Handler for the `create_todo` tool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::{CallToolResult, JsonObject};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::auth::TODO_WRITE;
use crate::todos::TodoStore;
use crate::tools::{ToolContext, ToolHandler, error_result, json_result, parse_args};

#[derive(Deserialize)]
struct CreateTodoArgs {
    text: String,
}

/// Creates a to-do. Requires `todo:write`.
pub struct CreateTodoHandler {
    store: Arc<TodoStore>,
}

impl CreateTodoHandler {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

impl ToolHandler for CreateTodoHandler {
    fn name(&self) -> &str {
        "create_todo"
    }

    fn description(&self) -> &str {
        "Create a new todo. Requires: todo:write scope."
    }

    fn input_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert(
            "properties".to_string(),
            json!({
                "text": {
                    "type": "string",
                    "description": "What needs doing."
                }
            }),
        );
        schema.insert("required".to_string(), json!(["text"]));
        schema
    }

    fn required_scope(&self) -> Option<&str> {
        Some(TODO_WRITE)
    }

    fn execute(
        &self,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<CallToolResult>> + Send + '_>> {
        let denied = ctx.require_scope(TODO_WRITE).err();
        let store = self.store.clone();

        Box::pin(async move {
            if let Some(err) = denied {
                return Ok(error_result(err));
            }
            let args: CreateTodoArgs = match parse_args(args) {
                Ok(args) => args,
                Err(result) => return Ok(result),
            };

            let todo = store.create(args.text).await;
            debug!(id = %todo.id, "Created todo");
            Ok(json_result(json!({ "todo": todo })))
        })
    }
}
