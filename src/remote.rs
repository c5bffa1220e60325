// =============================================================================
// REMOTE CLIENT
// =============================================================================
// Thin wrapper over the remote inventory API:
//
//   GET  {base}/api/Coffee        list every coffee
//   GET  {base}/api/Coffee/{id}   existence check
//   POST {base}/api/Coffee        create
//   PUT  {base}/api/Coffee/{id}   update
//
// Every request carries `X-Deploy-Key` when a key is configured.
// No retries happen here; callers decide whether to run again.
// =============================================================================

use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{normalize_keys, Coffee, InventoryData};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "X-Deploy-Key";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared HTTP client.
pub fn build_http_client(timeout: Duration) -> AppResult<Client> {
    Ok(Client::builder()
        .user_agent(concat!("coffee-inventory/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

// -----------------------------------------------------------------------------
// UPSERT OUTCOME
// -----------------------------------------------------------------------------
/// Result of pushing one coffee. Never an `Err`: failure lands in `error`.
#[derive(Debug)]
pub struct UpsertOutcome {
    pub success: bool,
    /// true = PUT (existing item), false = POST (new item)
    pub was_update: bool,
    pub error: Option<AppError>,
}

// -----------------------------------------------------------------------------
// CLIENT
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteClient {
    pub fn new(http: Client, base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
        }
    }

    /// Client for the API configured in the catalog.
    pub fn for_inventory(http: Client, inventory: &InventoryData) -> AppResult<Self> {
        if !inventory.is_sync_configured() {
            return Err(AppError::NotConfigured);
        }
        Ok(Self::new(http, &inventory.api_url, inventory.api_key()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> AppResult<Url> {
        Url::parse(&format!("{}/api/Coffee", self.base_url))
            .map_err(|e| AppError::InvalidInput(format!("bad API URL '{}': {}", self.base_url, e)))
    }

    /// Item URL with `id` as one percent-encoded path segment, so an id
    /// containing `/`, `?` or `#` still addresses that one item.
    fn item_url(&self, id: &str) -> AppResult<Url> {
        let mut url = self.collection_url()?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::InvalidInput(format!("API URL cannot take a path: {}", self.base_url))
            })?
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Send a request and record timing. Only transport failures are errors
    /// here; any HTTP status comes back as a response.
    async fn send(&self, method: Method, url: Url, body: Option<&Coffee>) -> AppResult<Response> {
        let start = Instant::now();
        let mut builder = self.request(method.clone(), url.clone());
        if let Some(coffee) = body {
            builder = builder.json(coffee);
        }

        let result = builder.send().await;
        let elapsed = start.elapsed().as_secs_f64();
        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                metrics::record_remote_request(method.as_str(), Some(status), elapsed);
                debug!(method = %method, url = %url, status, elapsed_secs = elapsed, "Remote request");
                Ok(response)
            }
            Err(e) => {
                metrics::record_remote_request(method.as_str(), None, elapsed);
                debug!(method = %method, url = %url, error = %e, "Remote request failed");
                Err(AppError::Transport(e))
            }
        }
    }

    /// Turn a non-2xx response into `AppError::Api` with its body.
    async fn ensure_success(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Api { status, body })
    }

    // -------------------------------------------------------------------------
    // OPERATIONS
    // -------------------------------------------------------------------------

    /// Every coffee on the server. An empty 2xx body is an empty list.
    /// Field names are matched case-insensitively, like the local files.
    pub async fn fetch_all(&self) -> AppResult<Vec<Coffee>> {
        let response = self.send(Method::GET, self.collection_url()?, None).await?;
        let response = Self::ensure_success(response).await?;
        let body = response.text().await.map_err(AppError::Transport)?;

        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Vec::new());
        }
        let value: serde_json::Value = serde_json::from_str(trimmed)?;
        Ok(serde_json::from_value(normalize_keys(value))?)
    }

    /// Whether the server has a coffee with this id.
    ///
    /// Any non-2xx (404 or otherwise) and any transport failure count as
    /// "does not exist".
    pub async fn exists(&self, id: &str) -> bool {
        let Ok(url) = self.item_url(id) else {
            return false;
        };
        match self.send(Method::GET, url, None).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Create or update one coffee: GET to check, then PUT or POST.
    pub async fn upsert(&self, coffee: &Coffee) -> UpsertOutcome {
        let was_update = self.exists(&coffee.id).await;
        let url = if was_update {
            self.item_url(&coffee.id)
        } else {
            self.collection_url()
        };
        let method = if was_update { Method::PUT } else { Method::POST };
        let result = match url {
            Ok(url) => self.send(method, url, Some(coffee)).await,
            Err(e) => Err(e),
        };

        let error = match result {
            Ok(response) => Self::ensure_success(response).await.err(),
            Err(e) => Some(e),
        };
        if let Some(e) = &error {
            warn!(id = %coffee.id, update = was_update, error_code = e.code(), error = %e, "Upsert failed");
        }

        UpsertOutcome {
            success: error.is_none(),
            was_update,
            error,
        }
    }

    /// Best-effort reachability check: true iff the collection URL answers
    /// 2xx. Advisory only, never gate an operation on it.
    pub async fn test_connection(&self) -> bool {
        let Ok(url) = self.collection_url() else {
            return false;
        };
        match self.send(Method::GET, url, None).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str, key: Option<&str>) -> RemoteClient {
        RemoteClient::new(Client::new(), base, key)
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let c = client("http://localhost:5000//", None);
        assert_eq!(c.base_url(), "http://localhost:5000");
        assert_eq!(
            c.collection_url().unwrap().as_str(),
            "http://localhost:5000/api/Coffee"
        );
        assert_eq!(
            c.item_url("abc").unwrap().as_str(),
            "http://localhost:5000/api/Coffee/abc"
        );
    }

    #[test]
    fn test_item_url_encodes_id_as_one_segment() {
        let c = client("http://localhost:5000", None);
        let url = c.item_url("a/b?c#d").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/Coffee/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_unparseable_base_url_is_invalid_input() {
        let c = client("not a url", None);
        assert!(matches!(c.collection_url(), Err(AppError::InvalidInput(_))));
        assert!(matches!(c.item_url("x"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_api_key_header_only_when_configured() {
        let with_key = client("http://localhost", Some("s3cret"))
            .request(Method::GET, Url::parse("http://localhost/api/Coffee").unwrap())
            .build()
            .unwrap();
        assert_eq!(with_key.headers().get(API_KEY_HEADER).unwrap(), "s3cret");

        let empty_key = client("http://localhost", Some(""))
            .request(Method::GET, Url::parse("http://localhost/api/Coffee").unwrap())
            .build()
            .unwrap();
        assert!(empty_key.headers().get(API_KEY_HEADER).is_none());
    }

    #[test]
    fn test_for_inventory_requires_url() {
        let inventory = InventoryData {
            api_url: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(
            RemoteClient::for_inventory(Client::new(), &inventory),
            Err(AppError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // port 9 (discard) on localhost is closed in test environments
        let c = client("http://127.0.0.1:9", None);
        assert!(matches!(c.fetch_all().await, Err(AppError::Transport(_))));
        assert!(!c.exists("x").await);
        assert!(!c.test_connection().await);

        let outcome = c.upsert(&Coffee::default()).await;
        assert!(!outcome.success);
        assert!(!outcome.was_update);
        assert!(matches!(outcome.error, Some(AppError::Transport(_))));
    }
}
