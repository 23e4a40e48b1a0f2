//! Content-delivery API client.
//!
//! DESIGN
//! ======
//! Thin HTTP wrapper over the CMS content API with an in-memory TTL cache.
//! On upstream failure the expired cache entry is served when one exists
//! (stale beats nothing), otherwise the error propagates and the HTTP layer
//! falls back to the built-in defaults. The relay core never depends on
//! this module.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

const DEFAULT_API_URL: &str = "https://cdn.umbraco.io";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const REQUEST_TIMEOUT_SECS: u64 = 5;
const CONNECT_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone)]
pub struct ContentConfig {
    pub project_alias: String,
    pub api_key: String,
    pub api_url: String,
    pub cache_ttl: Duration,
    pub fallback_enabled: bool,
}

impl ContentConfig {
    /// Read configuration from the environment. Returns `None` when the
    /// client is disabled or the required credentials are missing, in which
    /// case the HTTP layer serves built-in defaults.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let enabled =
            std::env::var("CONTENT_ENABLED").map_or(true, |v| v.to_lowercase() != "false");
        if !enabled {
            return None;
        }

        let project_alias = std::env::var("CONTENT_PROJECT_ALIAS").ok()?;
        let api_key = std::env::var("CONTENT_API_KEY").ok()?;
        if project_alias.is_empty() || api_key.is_empty() {
            return None;
        }

        Some(Self {
            project_alias,
            api_key,
            api_url: std::env::var("CONTENT_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            cache_ttl: Duration::from_secs(env_parse("CONTENT_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)),
            fallback_enabled: std::env::var("CONTENT_FALLBACK_ENABLED")
                .map_or(true, |v| v.to_lowercase() != "false"),
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("http client build failed: {0}")]
    ClientBuild(String),
    #[error("content request failed: {0}")]
    Request(String),
    #[error("content API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("content response was not in the expected shape: {0}")]
    Parse(String),
    #[error("no content items of type {0}")]
    Empty(String),
}

struct CacheEntry {
    data: Value,
    stored_at: Instant,
}

pub struct ContentClient {
    http: reqwest::Client,
    config: ContentConfig,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Deserialize)]
struct Embedded {
    content: Vec<Value>,
}

// =============================================================================
// CLIENT
// =============================================================================

impl ContentClient {
    /// Build a client with request and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ClientBuild` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: ContentConfig) -> Result<Self, ContentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ContentError::ClientBuild(e.to_string()))?;
        Ok(Self { http, config, cache: Mutex::new(HashMap::new()) })
    }

    /// Fetch the first content item of the given type. Options become query
    /// parameters and part of the cache key. Served from cache within the
    /// TTL; on upstream failure the expired entry is served if present.
    ///
    /// # Errors
    ///
    /// Returns the upstream error when the request fails and no cached copy
    /// exists (or fallback is disabled), `Empty` when the API returns no
    /// items.
    pub async fn fetch_content(
        &self,
        content_type: &str,
        options: Option<&HashMap<String, String>>,
    ) -> Result<Value, ContentError> {
        let key = cache_key(content_type, options);
        if let Some(fresh) = self.cached(&key) {
            return Ok(fresh);
        }

        let url = format!(
            "{}/{}/content/type/{}",
            self.config.api_url, self.config.project_alias, content_type
        );
        match self.request(&url, options).await {
            Ok(response) => {
                let item = response
                    .embedded
                    .content
                    .into_iter()
                    .next()
                    .ok_or_else(|| ContentError::Empty(content_type.to_string()))?;
                self.store(key, item.clone());
                Ok(item)
            }
            Err(err) => self.stale_or(&key, err),
        }
    }

    /// Fetch the home page content item.
    ///
    /// # Errors
    ///
    /// Same as [`ContentClient::fetch_content`].
    pub async fn fetch_home_page(&self) -> Result<Value, ContentError> {
        self.fetch_content("homePage", None).await
    }

    /// Fetch every platform configuration item, sorted for display.
    ///
    /// # Errors
    ///
    /// Same as [`ContentClient::fetch_content`].
    pub async fn fetch_platform_configs(&self) -> Result<Vec<Value>, ContentError> {
        let mut options = HashMap::new();
        options.insert("sort".to_string(), "sortOrder:asc".to_string());
        let key = cache_key("platformConfig", Some(&options));
        if let Some(fresh) = self.cached(&key) {
            return Ok(as_array(fresh));
        }

        let url = format!(
            "{}/{}/content/type/platformConfig",
            self.config.api_url, self.config.project_alias
        );
        match self.request(&url, Some(&options)).await {
            Ok(response) => {
                let configs = response.embedded.content;
                self.store(key, Value::Array(configs.clone()));
                Ok(configs)
            }
            Err(err) => self.stale_or(&key, err).map(as_array),
        }
    }

    /// Drop every cached entry.
    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    // -------------------------------------------------------------------------

    async fn request(
        &self,
        url: &str,
        options: Option<&HashMap<String, String>>,
    ) -> Result<ApiResponse, ContentError> {
        let mut request = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .header("Umb-Project-Alias", &self.config.project_alias)
            .header("Api-Key", &self.config.api_key);
        if let Some(options) = options {
            if !options.is_empty() {
                request = request.query(options);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| ContentError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ContentError::Request(e.to_string()))?;
        if status != 200 {
            return Err(ContentError::Status { status, body: text });
        }

        parse_response(&text)
    }

    /// Entry within the TTL, if any.
    fn cached(&self, key: &str) -> Option<Value> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.get(key)?;
        if entry.stored_at.elapsed() < self.config.cache_ttl {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    fn store(&self, key: String, data: Value) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(key, CacheEntry { data, stored_at: Instant::now() });
    }

    /// Serve the cached entry regardless of age, or propagate the error.
    fn stale_or(&self, key: &str, err: ContentError) -> Result<Value, ContentError> {
        if self.config.fallback_enabled {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = cache.get(key) {
                warn!(error = %err, "content API failed, serving stale cache");
                return Ok(entry.data.clone());
            }
        }
        Err(err)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn parse_response(text: &str) -> Result<ApiResponse, ContentError> {
    serde_json::from_str(text).map_err(|e| ContentError::Parse(e.to_string()))
}

/// Deterministic cache key: options are sorted so insertion order of the map
/// does not split the cache.
fn cache_key(content_type: &str, options: Option<&HashMap<String, String>>) -> String {
    let mut parts: Vec<String> = options
        .into_iter()
        .flatten()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    parts.sort();
    format!("{content_type}?{}", parts.join("&"))
}

fn as_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Built-in home page content served when the CMS is unreachable or not
/// configured.
#[must_use]
pub fn default_home_page() -> Value {
    json!({
        "heading": "Hello World!",
        "description": "Welcome to our multi-platform demo showcasing C# (.NET), Node.js, Python, Java, Go, and Rust implementations.",
        "canvasSectionTitle": "Collaborative Canvas",
        "canvasDescription": "Try our real-time collaborative drawing canvas! Draw together with others across different platforms.",
        "launchCanvasButtonText": "Launch Canvas",
        "showQrCodeSection": true,
        "qrCodeButtonText": "Show QR Codes",
        "platformLinksTitle": "Try Other Platforms",
        "showPlatformNavigation": true,
        "showServerInfo": true,
        "backgroundGradientStart": "#667eea",
        "backgroundGradientEnd": "#764ba2",
        "seoTitle": "Multi-Platform Demo",
        "seoDescription": "A demonstration of the same application built with multiple platforms.",
        "seoKeywords": "multi-platform, demo"
    })
}

#[cfg(test)]
#[path = "content_test.rs"]
mod tests;
