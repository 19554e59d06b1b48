//! Signing keys published by the authorization server.
//!
//! Keys are fetched from the issuer's JWKS endpoint and cached by `kid`. A
//! lookup for an unknown `kid` forces one refresh so rotated keys are picked
//! up without waiting for the TTL. Such refreshes are spaced at least
//! [`MIN_REFRESH_INTERVAL`] apart, and only one fetch runs at a time.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Default cache TTL in seconds (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Minimum age of the cached keys before an unknown `kid` may trigger
/// another fetch.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for a single JWKS request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A single JSON Web Key from a JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA")
    pub kty: String,
    /// Key ID, matched against the JWT header `kid`
    pub kid: Option<String>,
    /// Algorithm (e.g., "RS256")
    pub alg: Option<String>,
    /// Key use ("sig" or "enc")
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url encoded)
    pub n: Option<String>,
    /// RSA exponent (base64url encoded)
    pub e: Option<String>,
}

/// A JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

impl JwksDocument {
    /// Turn every usable RSA signing key into a decoding key, keyed by `kid`.
    ///
    /// Keys without a `kid` are stored under `"default"`.
    pub fn decoding_keys(&self) -> HashMap<String, DecodingKey> {
        let mut keys = HashMap::new();
        for jwk in &self.keys {
            if jwk.kty != "RSA" {
                debug!("Skipping non-RSA key: {}", jwk.kty);
                continue;
            }
            if jwk.key_use.as_deref() == Some("enc") {
                debug!("Skipping encryption key");
                continue;
            }
            match rsa_decoding_key(jwk) {
                Ok(key) => {
                    let kid = jwk.kid.clone().unwrap_or_else(|| "default".to_string());
                    keys.insert(kid, key);
                }
                Err(e) => warn!("Ignoring JWK: {}", e),
            }
        }
        keys
    }
}

fn rsa_decoding_key(jwk: &Jwk) -> Result<DecodingKey, JwksError> {
    let n = jwk
        .n
        .as_deref()
        .ok_or_else(|| JwksError::Parse("missing 'n' in RSA key".to_string()))?;
    let e = jwk
        .e
        .as_deref()
        .ok_or_else(|| JwksError::Parse("missing 'e' in RSA key".to_string()))?;

    DecodingKey::from_rsa_components(n, e)
        .map_err(|err| JwksError::Parse(format!("invalid RSA components: {}", err)))
}

struct KeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// JWKS cache shared by all requests.
pub struct JwksCache {
    jwks_url: String,
    ttl: Duration,
    state: RwLock<Option<KeySet>>,
    /// Held for the duration of a fetch.
    refresh_lock: Mutex<()>,
    client: reqwest::Client,
}

impl JwksCache {
    /// Create an empty cache for `jwks_url`. Nothing is fetched until the
    /// first lookup.
    pub fn new(jwks_url: impl Into<String>, ttl_seconds: u64) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            ttl: Duration::from_secs(ttl_seconds),
            state: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            client,
        })
    }

    /// Look up the key for `kid`, fetching the JWKS if the cache is cold,
    /// expired, or does not know the key. With no `kid`, any cached key is
    /// returned.
    ///
    /// A miss against keys fetched less than [`MIN_REFRESH_INTERVAL`] ago
    /// fails with [`JwksError::KeyNotFound`] without fetching.
    pub async fn get_key(&self, kid: Option<&str>) -> Result<DecodingKey, JwksError> {
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        let _guard = self.refresh_lock.lock().await;
        {
            let state = self.state.read().await;
            if let Some(set) = state.as_ref() {
                let age = set.fetched_at.elapsed();
                if age < self.ttl
                    && let Some(key) = lookup(&set.keys, kid)
                {
                    return Ok(key);
                }
                if age < MIN_REFRESH_INTERVAL {
                    debug!("Key miss within refresh interval, not refetching JWKS");
                    return Err(missing(kid));
                }
            }
        }

        self.fetch().await?;

        let state = self.state.read().await;
        state
            .as_ref()
            .and_then(|set| lookup(&set.keys, kid))
            .ok_or_else(|| missing(kid))
    }

    /// Fetch the JWKS and replace the cached keys.
    pub async fn refresh(&self) -> Result<(), JwksError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch().await
    }

    async fn cached_key(&self, kid: Option<&str>) -> Option<DecodingKey> {
        let state = self.state.read().await;
        state
            .as_ref()
            .filter(|set| set.fetched_at.elapsed() < self.ttl)
            .and_then(|set| lookup(&set.keys, kid))
    }

    async fn fetch(&self) -> Result<(), JwksError> {
        debug!("Fetching JWKS from {}", self.jwks_url);

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let document: JwksDocument = response
            .json()
            .await
            .map_err(|e| JwksError::Parse(e.to_string()))?;

        let keys = document.decoding_keys();
        if keys.is_empty() {
            return Err(JwksError::NoKeys);
        }

        debug!("Cached {} signing keys", keys.len());
        self.store(keys).await;
        Ok(())
    }

    async fn store(&self, keys: HashMap<String, DecodingKey>) {
        *self.state.write().await = Some(KeySet {
            keys,
            fetched_at: Instant::now(),
        });
    }

    /// Number of cached keys.
    pub async fn key_count(&self) -> usize {
        self.state
            .read()
            .await
            .as_ref()
            .map(|set| set.keys.len())
            .unwrap_or(0)
    }
}

fn missing(kid: Option<&str>) -> JwksError {
    match kid {
        Some(k) => JwksError::KeyNotFound(k.to_string()),
        None => JwksError::NoKeys,
    }
}

fn lookup(keys: &HashMap<String, DecodingKey>, kid: Option<&str>) -> Option<DecodingKey> {
    match kid {
        Some(k) => keys.get(k).cloned(),
        None => keys.values().next().cloned(),
    }
}

/// Errors from fetching or reading the JWKS.
#[derive(Debug, Clone)]
pub enum JwksError {
    /// The endpoint could not be reached or answered with an error status.
    Fetch(String),
    /// The response was not a usable JWKS.
    Parse(String),
    /// The JWKS contained no usable signing keys.
    NoKeys,
    /// No key with this `kid`, even after a refresh.
    KeyNotFound(String),
}

impl fmt::Display for JwksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "Failed to fetch JWKS: {}", msg),
            Self::Parse(msg) => write!(f, "Failed to parse JWKS: {}", msg),
            Self::NoKeys => write!(f, "No usable signing keys in JWKS"),
            Self::KeyNotFound(kid) => write!(f, "Signing key not found: {}", kid),
        }
    }
}

impl std::error::Error for JwksError {}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULUS: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    #[test]
    fn test_jwks_error_display() {
        let err = JwksError::Fetch("timeout".to_string());
        assert_eq!(err.to_string(), "Failed to fetch JWKS: timeout");

        let err = JwksError::KeyNotFound("key123".to_string());
        assert_eq!(err.to_string(), "Signing key not found: key123");
    }

    #[test]
    fn test_jwk_deserialization() {
        let json = format!(
            r#"{{"kty": "RSA", "kid": "snk_1", "alg": "RS256", "use": "sig", "n": "{}", "e": "AQAB"}}"#,
            MODULUS
        );
        let jwk: Jwk = serde_json::from_str(&json).unwrap();
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid.as_deref(), Some("snk_1"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
    }

    #[test]
    fn test_decoding_keys_skips_unusable_entries() {
        let json = format!(
            r#"{{"keys": [
                {{"kty": "RSA", "kid": "sig-key", "use": "sig", "n": "{m}", "e": "AQAB"}},
                {{"kty": "RSA", "kid": "enc-key", "use": "enc", "n": "{m}", "e": "AQAB"}},
                {{"kty": "EC", "kid": "ec-key", "crv": "P-256"}},
                {{"kty": "RSA", "kid": "broken"}},
                {{"kty": "RSA", "n": "{m}", "e": "AQAB"}}
            ]}}"#,
            m = MODULUS
        );
        let doc: JwksDocument = serde_json::from_str(&json).unwrap();
        let keys = doc.decoding_keys();

        assert_eq!(keys.len(), 2);
        assert!(keys.contains_key("sig-key"));
        assert!(keys.contains_key("default"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_fetch_error() {
        let cache = JwksCache::new("http://127.0.0.1:9/keys", DEFAULT_CACHE_TTL_SECONDS).unwrap();
        assert_eq!(cache.key_count().await, 0);

        let err = cache.get_key(Some("snk_1")).await.unwrap_err();
        assert!(matches!(err, JwksError::Fetch(_)));
        assert_eq!(cache.key_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_kid_within_refresh_interval_does_not_refetch() {
        // Nothing listens on port 9, so any fetch would fail with Fetch.
        let cache = JwksCache::new("http://127.0.0.1:9/keys", DEFAULT_CACHE_TTL_SECONDS).unwrap();
        let mut keys = HashMap::new();
        keys.insert("snk_1".to_string(), DecodingKey::from_secret(b"secret"));
        cache.store(keys).await;

        assert!(cache.get_key(Some("snk_1")).await.is_ok());
        assert!(cache.get_key(None).await.is_ok());

        for _ in 0..3 {
            let err = cache.get_key(Some("made-up")).await.unwrap_err();
            assert!(matches!(err, JwksError::KeyNotFound(ref kid) if kid == "made-up"));
        }
        assert_eq!(cache.key_count().await, 1);
    }

    #[tokio::test]
    async fn test_explicit_refresh_still_fetches() {
        let cache = JwksCache::new("http://127.0.0.1:9/keys", DEFAULT_CACHE_TTL_SECONDS).unwrap();
        cache.store(HashMap::new()).await;

        let err = cache.refresh().await.unwrap_err();
        assert!(matches!(err, JwksError::Fetch(_)));
    }
}
