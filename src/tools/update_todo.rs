//! Handler for the `update_todo` tool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::{CallToolResult, JsonObject};
use serde::Deserialize;
use serde_json::json;

use crate::auth::TODO_WRITE;
use crate::todos::{TodoPatch, TodoStore};
use crate::tools::{ToolContext, ToolHandler, error_result, json_result, parse_args};
use crate::types::TodoId;

#[derive(Deserialize)]
struct UpdateTodoArgs {
    todo_id: TodoId,
    #[serde(flatten)]
    patch: TodoPatch,
}

/// Partially updates a to-do. Requires `todo:write`.
pub struct UpdateTodoHandler {
    store: Arc<TodoStore>,
}

impl UpdateTodoHandler {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

impl ToolHandler for UpdateTodoHandler {
    fn name(&self) -> &str {
        "update_todo"
    }

    fn description(&self) -> &str {
        "Update an existing todo. Requires: todo:write scope."
    }

    fn input_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert(
            "properties".to_string(),
            json!({
                "todo_id": {
                    "type": "string",
                    "description": "Id of the todo to change."
                },
                "text": {
                    "type": ["string", "null"],
                    "description": "New text. Omit to keep the current text."
                },
                "done": {
                    "type": ["boolean", "null"],
                    "description": "New completion state. Omit to keep it."
                }
            }),
        );
        schema.insert("required".to_string(), json!(["todo_id"]));
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
            let args: UpdateTodoArgs = match parse_args(args) {
                Ok(args) => args,
                Err(result) => return Ok(result),
            };

            match store.update(&args.todo_id, args.patch).await {
                Ok(todo) => Ok(json_result(json!({ "todo": todo }))),
                Err(err) => Ok(error_result(err)),
            }
        })
    }
}
