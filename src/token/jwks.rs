//! Signing key lookup through a JWKS endpoint

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::auth::error::AuthError;

/// Capability to look up a token signing key by key id
#[async_trait]
pub trait SigningKeyStore: Send + Sync {
    async fn get_signing_key(&self, kid: &str) -> Result<DecodingKey, AuthError>;
}

/// JWKS cache entry
#[derive(Clone)]
struct CachedJwks {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Cached, rate-limited JWKS client
///
/// Keys are cached for `cache_duration`. An unknown `kid` triggers a refetch,
/// but no more than `requests_per_minute` fetches happen in any sliding minute.
#[derive(Clone)]
pub struct JwksClient {
    http_client: Client,
    jwks_uri: String,
    cache_duration: Duration,
    requests_per_minute: usize,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    recent_fetches: Arc<Mutex<VecDeque<Instant>>>,
}

impl JwksClient {
    pub fn new(jwks_uri: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            jwks_uri: jwks_uri.into(),
            cache_duration: Duration::from_secs(36000),
            requests_per_minute: 10,
            cache: Arc::new(RwLock::new(None)),
            recent_fetches: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn with_cache_duration(mut self, cache_duration: Duration) -> Self {
        self.cache_duration = cache_duration;
        self
    }

    pub fn with_requests_per_minute(mut self, requests_per_minute: usize) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref()?;
        if cached.fetched_at.elapsed() >= self.cache_duration {
            return None;
        }
        cached.keys.get(kid).cloned()
    }

    async fn acquire_fetch_slot(&self) -> Result<(), AuthError> {
        let mut recent = self.recent_fetches.lock().await;
        let window = Duration::from_secs(60);
        while recent.front().is_some_and(|at| at.elapsed() >= window) {
            recent.pop_front();
        }
        if recent.len() >= self.requests_per_minute {
            tracing::warn!("JWKS request rate limit reached for: {}", self.jwks_uri);
            return Err(AuthError::KeyResolutionFailure(
                "Too many requests to the signing key endpoint".to_string(),
            ));
        }
        recent.push_back(Instant::now());
        Ok(())
    }

    /// Fetch the key set, bypassing the cache, and replace the cache with it
    pub async fn fetch_keys(&self) -> Result<HashMap<String, DecodingKey>, AuthError> {
        self.acquire_fetch_slot().await?;

        tracing::debug!("Fetching JWKS from: {}", self.jwks_uri);

        let response = self
            .http_client
            .get(&self.jwks_uri)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AuthError::KeyResolutionFailure(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyResolutionFailure(format!(
                "JWKS fetch failed with status: {}",
                response.status()
            )));
        }

        let jwk_set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::KeyResolutionFailure(format!("Failed to parse JWKS: {}", e)))?;

        let keys = signing_keys(&jwk_set);

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }
}

/// Usable RSA signing keys from a key set, by key id
pub fn signing_keys(jwk_set: &JwkSet) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::new();
    for jwk in &jwk_set.keys {
        let Some(kid) = &jwk.common.key_id else {
            tracing::warn!("JWK missing kid field, skipping");
            continue;
        };
        if !matches!(jwk.algorithm, AlgorithmParameters::RSA(_)) {
            tracing::warn!("Skipping non-RSA key {}", kid);
            continue;
        }
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid.clone(), key);
            }
            Err(err) => {
                tracing::warn!("Failed to create decoding key for kid {}: {}", kid, err);
            }
        }
    }
    keys
}

#[async_trait]
impl SigningKeyStore for JwksClient {
    async fn get_signing_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        let mut keys = self.fetch_keys().await?;
        keys.remove(kid).ok_or_else(|| {
            AuthError::KeyResolutionFailure(format!("Unable to find a signing key that matches '{}'", kid))
        })
    }
}
