//! Authentication and authorization.
//!
//! Two layers protect the tool server:
//!
//! - **Bearer gate** ([`bearer_gate`]): HTTP middleware in front of every
//!   non-exempt path. Missing or non-Bearer credentials and tokens the
//!   [`TokenValidator`] refuses are answered with `401` and a
//!   `WWW-Authenticate` challenge pointing at the protected-resource metadata.
//! - **Scope gate** ([`require_scope`]): called by each tool with the
//!   request's [`AccessToken`]. A missing scope is reported in-band as a tool
//!   result, never as an HTTP error.
//!
//! In provider mode the gate stores the validated token in the request
//! extensions; the MCP server copies it into the [`ToolContext`] of each
//! call, so tools receive it explicitly.
//!
//! [`ToolContext`]: crate::tools::ToolContext

mod gate;
pub mod jwks;
mod scope;
mod token;
mod validator;

pub use gate::{
    EXEMPT_PATHS, GateMode, GateState, HEALTH_PATH, RESOURCE_METADATA_PATH, bearer_gate,
    bearer_token, challenge_header,
};
pub use jwks::{DEFAULT_CACHE_TTL_SECONDS, JwksCache, JwksError, MIN_REFRESH_INTERVAL};
pub use scope::{EXAMPLE_READ, ScopeError, TODO_READ, TODO_WRITE, require_scope};
pub use token::{AccessToken, JwtClaims};
pub use validator::{AuthError, JwtValidator, TokenValidator, ValidatorConfig};
