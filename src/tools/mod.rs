//! Tool handler registry and the tools this server exposes.
//!
//! Handlers that need authorization call [`ToolContext::require_scope`]
//! before touching state and turn a refusal into an in-band error result.

mod registry;

pub use registry::{
    ToolContext, ToolHandler, ToolRegistry, error_result, json_result, parse_args,
};

mod create_todo;
mod delete_todo;
mod hello;
mod list_todos;
mod update_todo;

pub use create_todo::CreateTodoHandler;
pub use delete_todo::DeleteTodoHandler;
pub use hello::HelloHandler;
pub use list_todos::ListTodosHandler;
pub use update_todo::UpdateTodoHandler;

use std::sync::Arc;

use crate::auth::EXAMPLE_READ;
use crate::todos::TodoStore;

/// Tools served behind a gateway-mode gate. No claims reach the tools, so
/// nothing here is scope-gated.
pub fn gateway_tools() -> ToolRegistry {
    ToolRegistry::new().register_handler(HelloHandler::open())
}

/// Scope-gated tools served behind a provider-mode gate.
pub fn provider_tools(store: Arc<TodoStore>) -> ToolRegistry {
    ToolRegistry::new()
        .register_handler(HelloHandler::scoped(EXAMPLE_READ))
        .register_handler(ListTodosHandler::new(store.clone()))
        .register_handler(CreateTodoHandler::new(store.clone()))
        .register_handler(UpdateTodoHandler::new(store.clone()))
        .register_handler(DeleteTodoHandler::new(store))
}
