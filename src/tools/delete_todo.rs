//! Handler for the `delete_todo` tool.

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
use crate::types::TodoId;

#[derive(Deserialize)]
struct DeleteTodoArgs {
    todo_id: TodoId,
}

/// Deletes a to-do. Requires `todo:write`.
pub struct DeleteTodoHandler {
    store: Arc<TodoStore>,
}

impl DeleteTodoHandler {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

impl ToolHandler for DeleteTodoHandler {
    fn name(&self) -> &str {
        "delete_todo"
    }

    fn description(&self) -> &str {
        "Delete a todo. Requires: todo:write scope."
    }

    fn input_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert(
            "properties".to_string(),
            json!({
                "todo_id": {
                    "type": "string",
                    "description": "Id of the todo to delete."
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
            let args: DeleteTodoArgs = match parse_args(args) {
                Ok(args) => args,
                Err(result) => return Ok(result),
            };

            match store.delete(&args.todo_id).await {
                Ok(deleted) => {
                    debug!(id = %deleted.id, "Deleted todo");
                    Ok(json_result(json!({ "deleted": deleted })))
                }
                Err(err) => Ok(error_result(err)),
            }
        })
    }
}
