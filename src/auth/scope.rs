//! Per-operation scope checks on an already validated token.

use std::fmt;

use crate::auth::token::AccessToken;

/// Scope required to read to-dos.
pub const TODO_READ: &str = "todo:read";
/// Scope required to create, update, or delete to-dos.
pub const TODO_WRITE: &str = "todo:write";
/// Scope required by the `hello` tool in provider mode.
pub const EXAMPLE_READ: &str = "example:read";

/// The caller's token does not grant a required scope.
///
/// This is an application-level outcome reported inside a successful tool
/// result, not a transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeError {
    scope: String,
}

impl ScopeError {
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Insufficient permissions: `{}` scope required.", self.scope)
    }
}

impl std::error::Error for ScopeError {}

/// Check that `token` grants `scope`.
///
/// A missing token holds no scopes.
pub fn require_scope(token: Option<&AccessToken>, scope: &str) -> Result<(), ScopeError> {
    match token {
        Some(t) if t.has_scope(scope) => Ok(()),
        _ => Err(ScopeError {
            scope: scope.to_string(),
        }),
    }
}
