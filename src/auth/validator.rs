//! Bearer token validation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tracing::debug;

use crate::auth::jwks::{DEFAULT_CACHE_TTL_SECONDS, JwksCache};
use crate::auth::token::{AccessToken, JwtClaims};

/// Authentication errors surfaced by the bearer gate.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No `Authorization: Bearer ...` header
    MissingBearer,
    /// Token present but rejected (bad signature, issuer, audience, expiry, ...)
    Rejected(String),
    /// Validation could not be performed (JWKS unreachable, ...)
    Unavailable(String),
}

impl AuthError {
    /// Message returned to the client in the 401 body.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::MissingBearer => "Missing Bearer token",
            Self::Rejected(_) | Self::Unavailable(_) => "Token validation failed",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBearer => write!(f, "Missing Bearer token"),
            Self::Rejected(msg) => write!(f, "Token rejected: {}", msg),
            Self::Unavailable(msg) => write!(f, "Token validation unavailable: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Validates a raw bearer token.
///
/// Implementations make a single attempt; the gate treats every error the
/// same way.
pub trait TokenValidator: Send + Sync {
    fn validate<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken, AuthError>> + Send + 'a>>;
}

/// Expected token issuer, audience, and where to find signing keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub issuer: String,
    /// Expected `aud`. `None` disables audience validation.
    pub audience: Option<String>,
    pub jwks_url: String,
    pub jwks_cache_seconds: u64,
}

impl ValidatorConfig {
    /// Config for an issuer that publishes its JWKS at `<issuer>/keys`.
    pub fn for_issuer(issuer: impl Into<String>, audience: Option<String>) -> Self {
        let issuer = issuer.into();
        let jwks_url = format!("{}/keys", issuer.trim_end_matches('/'));
        Self {
            issuer,
            audience: audience.filter(|a| !a.is_empty()),
            jwks_url,
            jwks_cache_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }

    pub fn with_jwks_url(mut self, jwks_url: impl Into<String>) -> Self {
        self.jwks_url = jwks_url.into();
        self
    }
}

enum KeySource {
    Jwks(JwksCache),
    Fixed(DecodingKey),
}

/// JWT validator checking signature, issuer, audience, and expiry.
pub struct JwtValidator {
    issuer: String,
    audience: Option<String>,
    algorithm: Algorithm,
    keys: KeySource,
}

impl JwtValidator {
    /// RS256 validator backed by the issuer's JWKS.
    pub fn from_jwks(config: &ValidatorConfig) -> Result<Self, AuthError> {
        let cache = JwksCache::new(config.jwks_url.clone(), config.jwks_cache_seconds)
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            algorithm: Algorithm::RS256,
            keys: KeySource::Jwks(cache),
        })
    }

    /// Validator with a single known key, for locally signed tokens.
    pub fn with_key(config: &ValidatorConfig, key: DecodingKey, algorithm: Algorithm) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            algorithm,
            keys: KeySource::Fixed(key),
        }
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        match &self.keys {
            KeySource::Jwks(cache) => cache
                .get_key(kid)
                .await
                .map_err(|e| AuthError::Unavailable(e.to_string())),
            KeySource::Fixed(key) => Ok(key.clone()),
        }
    }

    async fn verify(&self, token: &str) -> Result<AccessToken, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Rejected("empty token".to_string()));
        }

        let header = decode_header(token)
            .map_err(|e| AuthError::Rejected(format!("invalid JWT header: {}", e)))?;
        let key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<JwtClaims>(token, &key, &validation)
            .map_err(|e| AuthError::Rejected(e.to_string()))?;

        let token = AccessToken::from_claims(data.claims);
        debug!(
            subject = token.subject().unwrap_or("-"),
            "Bearer token validated"
        );
        Ok(token)
    }
}

impl TokenValidator for JwtValidator {
    fn validate<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken, AuthError>> + Send + 'a>> {
        Box::pin(self.verify(token))
    }
}
