//! Handler for the `hello` tool.

use std::future::Future;
use std::pin::Pin;

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::Deserialize;
use serde_json::json;

use crate::tools::{ToolContext, ToolHandler, error_result, json_result, parse_args};

#[derive(Deserialize)]
struct HelloArgs {
    name: String,
}

/// Greets the caller. Optionally gated by a scope.
pub struct HelloHandler {
    required_scope: Option<&'static str>,
}

impl HelloHandler {
    /// Ungated greeting, for servers whose gate does not pass claims on.
    /// Replies with plain text: `Hi <name>!`.
    pub fn open() -> Self {
        Self {
            required_scope: None,
        }
    }

    /// Greeting that requires `scope`. Replies with
    /// `{"message": "Hello, <name>!"}`.
    pub fn scoped(scope: &'static str) -> Self {
        Self {
            required_scope: Some(scope),
        }
    }
}

impl ToolHandler for HelloHandler {
    fn name(&self) -> &str {
        "hello"
    }

    fn description(&self) -> &str {
        "Say hello."
    }

    fn input_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert(
            "properties".to_string(),
            json!({
                "name": {
                    "type": "string",
                    "description": "Who to greet."
                }
            }),
        );
        schema.insert("required".to_string(), json!(["name"]));
        schema
    }

    fn required_scope(&self) -> Option<&str> {
        self.required_scope
    }

    fn execute(
        &self,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<CallToolResult>> + Send + '_>> {
        let denied = self
            .required_scope
            .and_then(|scope| ctx.require_scope(scope).err());
        let scoped = self.required_scope.is_some();

        Box::pin(async move {
            if let Some(err) = denied {
                return Ok(error_result(err));
            }
            let args: HelloArgs = match parse_args(args) {
                Ok(args) => args,
                Err(result) => return Ok(result),
            };
            if scoped {
                Ok(json_result(json!({ "message": format!("Hello, {}!", args.name) })))
            } else {
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Hi {}!",
                    args.name
                ))]))
            }
        })
    }
}
