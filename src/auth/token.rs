//! Validated access token, the per-request identity handed to tools.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::types::Scope;

/// Claims read from a bearer JWT.
///
/// Authorization servers disagree on where scopes live, so all three common
/// spellings are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwtClaims {
    /// Subject (user or client identifier)
    #[serde(default)]
    pub sub: Option<String>,
    /// OAuth client that requested the token
    #[serde(default)]
    pub client_id: Option<String>,
    /// Expiration time (Unix timestamp)
    #[serde(default)]
    pub exp: Option<u64>,
    /// Space-delimited scope string (RFC 8693 style)
    #[serde(default)]
    pub scope: Option<String>,
    /// Scope list
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    /// Scope list (Azure / Okta style)
    #[serde(default)]
    pub scp: Option<Vec<String>>,
}

/// Result of a successful token validation.
///
/// Created by a [`TokenValidator`](crate::auth::TokenValidator) for a single
/// request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    subject: Option<String>,
    client_id: Option<String>,
    scopes: BTreeSet<Scope>,
    expires_at: Option<u64>,
}

impl AccessToken {
    /// Create a token carrying only the given scopes.
    pub fn with_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scope>,
    {
        Self {
            subject: None,
            client_id: None,
            scopes: scopes.into_iter().map(Into::into).collect(),
            expires_at: None,
        }
    }

    /// Build the token view from decoded JWT claims.
    pub fn from_claims(claims: JwtClaims) -> Self {
        let mut scopes = BTreeSet::new();
        if let Some(scope) = &claims.scope {
            scopes.extend(scope.split_whitespace().map(Scope::from));
        }
        for list in [claims.scopes, claims.scp].into_iter().flatten() {
            scopes.extend(list.into_iter().filter(|s| !s.is_empty()).map(Scope::from));
        }

        Self {
            subject: claims.sub,
            client_id: claims.client_id,
            scopes,
            expires_at: claims.exp,
        }
    }

    /// Set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Whether the token grants `scope`.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Granted scopes, sorted.
    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }
}
