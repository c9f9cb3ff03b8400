//! Authenticated request pipeline for the Apple Music API.
//!
//! [`AppleMusicClient::execute`] is the only way tools reach the network:
//! 1. resolve the URL (this string is also the cache key)
//! 2. serve cacheable reads from [`ResponseCache`]
//! 3. attach the developer token and, when required, the Music User Token
//! 4. send, retrying only on HTTP 429
//! 5. classify failures and cache successful reads

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::cache::ResponseCache;
use super::error::{ApiError, ApiResult, ErrorResponse};
use super::upstream::{Method, ReqwestUpstream, Upstream, UpstreamRequest, UpstreamResponse};
use crate::core::config::AppleMusicConfig;
use crate::domains::auth::CredentialManager;

/// Total attempts per request, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Header carrying the user credential.
pub const USER_TOKEN_HEADER: &str = "Music-User-Token";

/// Per-call options for [`AppleMusicClient::execute`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Query parameters; `None` values are skipped.
    pub params: Vec<(String, Option<String>)>,
    pub requires_user_token: bool,
    /// Zero disables caching.
    pub cache_ttl: Duration,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Default::default()
        }
    }

    pub fn delete(body: Option<Value>) -> Self {
        Self {
            method: Method::Delete,
            body,
            ..Default::default()
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), Some(value.to_string())));
        self
    }

    pub fn param_opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        self.params.push((key.to_string(), value.map(|v| v.to_string())));
        self
    }

    pub fn with_user_token(mut self) -> Self {
        self.requires_user_token = true;
        self
    }

    pub fn cache_for(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// Merge `params` into the query of `base`.
///
/// A key already present is replaced in place; new keys are appended in
/// order. Parameters without a value are skipped.
pub fn resolve_url(base: &str, params: &[(String, Option<String>)]) -> ApiResult<String> {
    let mut url = Url::parse(base)
        .map_err(|e| ApiError::configuration(format!("Invalid request URL '{base}': {e}")))?;

    if params.iter().all(|(_, v)| v.is_none()) {
        return Ok(url.to_string());
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    for (key, value) in params {
        let Some(value) = value else { continue };
        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.clone(),
            None => pairs.push((key.clone(), value.clone())),
        }
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url.to_string())
}

/// Delay before retrying a 429: the server's `Retry-After` seconds when
/// usable, else `2^(attempt+1)` seconds.
fn retry_delay(response: &UpstreamResponse, attempt: u32) -> Duration {
    response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(2u64.pow(attempt + 1)))
}

/// Turn a non-success status other than 401/403/429 into an [`ApiError`].
fn classify_failure(response: &UpstreamResponse) -> ApiError {
    match serde_json::from_slice::<ErrorResponse>(&response.body) {
        Ok(body) if !body.errors.is_empty() => ApiError::with_details(response.status, body.errors),
        _ => ApiError::status(response.status),
    }
}

/// Shared client: credentials, cache and transport.
pub struct AppleMusicClient {
    credentials: Arc<CredentialManager>,
    upstream: Arc<dyn Upstream>,
    cache: ResponseCache,
    storefront: String,
}

impl std::fmt::Debug for AppleMusicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppleMusicClient")
            .field("storefront", &self.storefront)
            .field("cached_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl AppleMusicClient {
    pub fn new(
        credentials: Arc<CredentialManager>,
        upstream: Arc<dyn Upstream>,
        storefront: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            upstream,
            cache: ResponseCache::default(),
            storefront: storefront.into(),
        }
    }

    /// Build the production client: signing identity, credential store and
    /// a reqwest transport.
    pub fn from_config(config: &AppleMusicConfig) -> ApiResult<Self> {
        let credentials = Arc::new(CredentialManager::from_config(config)?);
        let upstream = Arc::new(ReqwestUpstream::new()?);
        Ok(Self::new(credentials, upstream, config.storefront.clone()))
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Default storefront for catalog requests.
    pub fn storefront(&self) -> &str {
        &self.storefront
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Execute and decode into `T`.
    ///
    /// A 204 or empty body decodes from JSON `null`, so use `()` or
    /// `Option<_>` for calls that may return no content.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let value = self.execute_value(url, options).await?;
        serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Execute and return the raw JSON body (`Value::Null` for no content).
    #[instrument(skip(self, options), fields(method = options.method.as_str()))]
    pub async fn execute_value(&self, url: &str, options: RequestOptions) -> ApiResult<Value> {
        let resolved = resolve_url(url, &options.params)?;
        let cacheable = options.method.is_read() && !options.cache_ttl.is_zero();

        if cacheable {
            if let Some(hit) = self.cache.get(&resolved) {
                debug!("Cache hit for {}", resolved);
                return Ok(hit);
            }
        }

        let service = self.credentials.current_service_credential()?;
        let mut headers = vec![("Authorization".to_string(), service.bearer())];

        if options.requires_user_token {
            let user = self.credentials.user_credential().ok_or_else(|| {
                ApiError::authentication(
                    "Music User Token required for this operation. \
                     Set APPLE_MUSIC_USER_TOKEN after authorizing with Apple Music.",
                )
            })?;
            headers.push((USER_TOKEN_HEADER.to_string(), user.token().to_string()));
        }

        if options.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        let request = UpstreamRequest {
            method: options.method,
            url: resolved.clone(),
            headers,
            body: options.body,
        };

        for attempt in 0..MAX_ATTEMPTS {
            let response = self.upstream.send(request.clone()).await?;

            match response.status {
                429 => {
                    if attempt + 1 < MAX_ATTEMPTS {
                        let delay = retry_delay(&response, attempt);
                        warn!(
                            "Rate limited (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            MAX_ATTEMPTS,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
                401 => {
                    return Err(ApiError::authentication(
                        "Authentication failed (401). Developer token may be expired or invalid. \
                         Check APPLE_MUSIC_TEAM_ID, APPLE_MUSIC_KEY_ID and the private key.",
                    ));
                }
                403 => {
                    return Err(ApiError::authentication(
                        "Access forbidden (403). Music User Token may be expired or invalid, \
                         or lacks the required scope. Re-authorize and update APPLE_MUSIC_USER_TOKEN.",
                    ));
                }
                _ if !response.is_success() => return Err(classify_failure(&response)),
                _ => {}
            }

            if response.status == 204 || response.body.is_empty() {
                return Ok(Value::Null);
            }

            let value: Value = serde_json::from_slice(&response.body)
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

            if cacheable {
                self.cache.set(resolved, value.clone(), options.cache_ttl);
            }
            return Ok(value);
        }

        Err(ApiError::Api {
            status: 429,
            message: format!("Rate limit exceeded after {MAX_ATTEMPTS} attempts"),
            errors: Vec::new(),
        })
    }
}
