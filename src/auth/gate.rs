//! HTTP middleware that rejects unauthenticated requests before they reach
//! the MCP endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::validator::{AuthError, TokenValidator};

/// Path of the protected-resource metadata document.
pub const RESOURCE_METADATA_PATH: &str = "/.well-known/oauth-protected-resource";
/// Path of the health check.
pub const HEALTH_PATH: &str = "/health";

/// Paths served without a token.
pub const EXEMPT_PATHS: [&str; 2] = [HEALTH_PATH, RESOURCE_METADATA_PATH];

/// What the gate does with a validated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Forward the request unchanged.
    Gateway,
    /// Attach the [`AccessToken`](crate::auth::AccessToken) to the request
    /// extensions for downstream scope checks.
    Provider,
}

/// State shared by every invocation of [`bearer_gate`].
#[derive(Clone)]
pub struct GateState {
    validator: Arc<dyn TokenValidator>,
    challenge: HeaderValue,
    mode: GateMode,
}

impl GateState {
    /// Build gate state. `resource_metadata_url` is advertised in the
    /// `WWW-Authenticate` challenge.
    pub fn new(
        validator: Arc<dyn TokenValidator>,
        resource_metadata_url: &str,
        mode: GateMode,
    ) -> anyhow::Result<Self> {
        let challenge = HeaderValue::from_str(&challenge_header(resource_metadata_url))
            .map_err(|e| anyhow::anyhow!("Invalid resource metadata URL for challenge: {}", e))?;
        Ok(Self {
            validator,
            challenge,
            mode,
        })
    }
}

/// `WWW-Authenticate` value pointing clients at the metadata document.
pub fn challenge_header(resource_metadata_url: &str) -> String {
    format!(
        "Bearer realm=\"OAuth\", resource_metadata=\"{}\"",
        resource_metadata_url
    )
}

/// Token part of an `Authorization` header, if it uses the Bearer scheme.
pub fn bearer_token(authorization: Option<&HeaderValue>) -> Option<&str> {
    authorization
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Bearer gate, installed with `axum::middleware::from_fn_with_state`.
pub async fn bearer_gate(
    State(gate): State<GateState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if EXEMPT_PATHS.contains(&path) {
        return next.run(request).await;
    }

    let token = match bearer_token(request.headers().get(header::AUTHORIZATION)) {
        Some(token) => token.to_string(),
        None => {
            debug!(path, "Request without bearer token");
            return unauthorized(&gate.challenge, &AuthError::MissingBearer);
        }
    };

    match gate.validator.validate(&token).await {
        Ok(access) => {
            if gate.mode == GateMode::Provider {
                request.extensions_mut().insert(access);
            }
            next.run(request).await
        }
        Err(err) => {
            warn!(error = %err, "Bearer token rejected");
            unauthorized(&gate.challenge, &err)
        }
    }
}

fn unauthorized(challenge: &HeaderValue, err: &AuthError) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": err.client_message() })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, challenge.clone());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessToken;
    use axum::{Extension, Router, body::Body, http::Request as HttpRequest, routing::get};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use tower::ServiceExt;

    const METADATA_URL: &str = "http://localhost:3002/.well-known/oauth-protected-resource";

    /// Accepts the tokens it knows, rejects everything else; "boom" fails
    /// as if the validator were unreachable.
    struct StaticValidator {
        tokens: HashMap<String, AccessToken>,
    }

    impl TokenValidator for StaticValidator {
        fn validate<'a>(
            &'a self,
            token: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<AccessToken, AuthError>> + Send + 'a>> {
            Box::pin(async move {
                if token == "boom" {
                    return Err(AuthError::Unavailable("connection refused".into()));
                }
                self.tokens
                    .get(token)
                    .cloned()
                    .ok_or_else(|| AuthError::Rejected("unknown token".into()))
            })
        }
    }

    fn app(mode: GateMode) -> Router {
        let mut tokens = HashMap::new();
        tokens.insert(
            "good".to_string(),
            AccessToken::with_scopes(["todo:read"]).with_subject("alice"),
        );
        let gate = GateState::new(Arc::new(StaticValidator { tokens }), METADATA_URL, mode).unwrap();

        Router::new()
            .route(HEALTH_PATH, get(|| async { "healthy" }))
            .route(RESOURCE_METADATA_PATH, get(|| async { "metadata" }))
            .route(
                "/mcp",
                get(|token: Option<Extension<AccessToken>>| async move {
                    match token {
                        Some(Extension(t)) => format!("token:{}", t.subject().unwrap_or("-")),
                        None => "no-token".to_string(),
                    }
                }),
            )
            .layer(axum::middleware::from_fn_with_state(gate, bearer_gate))
    }

    fn request(path: &str, authorization: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn assert_unauthorized(response: Response, body: &str) {
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"OAuth\", resource_metadata=\"http://localhost:3002/.well-known/oauth-protected-resource\""
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_text(response).await, body);
    }

    #[test]
    fn test_bearer_token_extraction() {
        let value = HeaderValue::from_static("Bearer abc.def ");
        assert_eq!(bearer_token(Some(&value)), Some("abc.def"));

        let value = HeaderValue::from_static("bearer abc");
        assert_eq!(bearer_token(Some(&value)), None);

        let value = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(Some(&value)), None);

        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_invalid_metadata_url_is_rejected() {
        let validator = Arc::new(StaticValidator {
            tokens: HashMap::new(),
        });
        assert!(GateState::new(validator, "http://bad\nurl", GateMode::Gateway).is_err());
    }

    #[tokio::test]
    async fn test_exempt_paths_need_no_token() {
        let response = app(GateMode::Gateway)
            .oneshot(request(HEALTH_PATH, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "healthy");

        let response = app(GateMode::Gateway)
            .oneshot(request(RESOURCE_METADATA_PATH, Some("Bearer garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "metadata");
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let response = app(GateMode::Gateway)
            .oneshot(request("/mcp", None))
            .await
            .unwrap();
        assert_unauthorized(response, r#"{"error":"Missing Bearer token"}"#).await;
    }

    #[tokio::test]
    async fn test_non_bearer_header_is_rejected() {
        let response = app(GateMode::Gateway)
            .oneshot(request("/mcp", Some("Basic dXNlcjpwYXNz")))
            .await
            .unwrap();
        assert_unauthorized(response, r#"{"error":"Missing Bearer token"}"#).await;
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let response = app(GateMode::Gateway)
            .oneshot(request("/mcp", Some("Bearer forged")))
            .await
            .unwrap();
        assert_unauthorized(response, r#"{"error":"Token validation failed"}"#).await;
    }

    #[tokio::test]
    async fn test_validator_failure_is_treated_as_rejection() {
        let response = app(GateMode::Provider)
            .oneshot(request("/mcp", Some("Bearer boom")))
            .await
            .unwrap();
        assert_unauthorized(response, r#"{"error":"Token validation failed"}"#).await;
    }

    #[tokio::test]
    async fn test_unknown_paths_are_gated_too() {
        let response = app(GateMode::Gateway)
            .oneshot(request("/anything", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(GateMode::Gateway)
            .oneshot(request("/anything", Some("Bearer good")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_gateway_forwards_without_claims() {
        let response = app(GateMode::Gateway)
            .oneshot(request("/mcp", Some("Bearer good")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "no-token");
    }

    #[tokio::test]
    async fn test_provider_attaches_access_token() {
        let response = app(GateMode::Provider)
            .oneshot(request("/mcp", Some("Bearer good")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "token:alice");
    }
}
