//! HTTP client for the RapidAPI-hosted quote service.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ApiError, QuoteSource};
use crate::models::QuoteApiResponse;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the quote service
pub const DEFAULT_BASE_URL: &str = "https://get-quotes-api.p.rapidapi.com/";

/// Value sent in the `x-rapidapi-host` header
pub const DEFAULT_API_HOST: &str = "get-quotes-api.p.rapidapi.com";

const API_KEY_HEADER: &str = "x-rapidapi-key";
const API_HOST_HEADER: &str = "x-rapidapi-host";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Quote API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct QuoteApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    api_host: String,
}

impl std::fmt::Debug for QuoteApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_host", &self.api_host)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl QuoteApiClient {
    /// Create a client for `base_url` authenticating with the given RapidAPI key and host.
    pub fn new(base_url: &str, api_key: impl Into<String>, api_host: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid quote API base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Quote API base URL cannot have paths: {}", base_url));
        }
        // Url::join drops the last segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            api_host: api_host.into(),
        })
    }

    /// Create a client with a different key, sharing the connection pool.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: api_key.into(),
            api_host: self.api_host.clone(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if !self.api_key.is_empty() {
            headers.insert(API_KEY_HEADER, header::HeaderValue::from_str(&self.api_key)?);
        }
        headers.insert(API_HOST_HEADER, header::HeaderValue::from_str(&self.api_host)?);
        Ok(headers)
    }

    fn all_quotes_url(&self) -> Result<Url> {
        self.base_url.join("quotes").context("Failed to build quotes URL")
    }

    fn category_url(&self, category: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Quote API base URL cannot have paths"))?
            .pop_if_empty()
            .push("category")
            .push(category);
        Ok(url)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(url.clone())
                .headers(self.auth_headers()?)
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl QuoteSource for QuoteApiClient {
    async fn all_quotes(&self) -> Result<QuoteApiResponse> {
        let url = self.all_quotes_url()?;
        let response: QuoteApiResponse = self.get(url).await?;
        debug!(
            count = response.quotes.as_ref().map(Vec::len).unwrap_or(0),
            message = %response.message,
            "Fetched all quotes"
        );
        Ok(response)
    }

    async fn quotes_by_category(&self, category: &str) -> Result<QuoteApiResponse> {
        let url = self.category_url(category)?;
        let response: QuoteApiResponse = self.get(url).await?;
        debug!(
            category = category,
            count = response.quotes.as_ref().map(Vec::len).unwrap_or(0),
            "Fetched quotes for category"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> QuoteApiClient {
        QuoteApiClient::new(DEFAULT_BASE_URL, "test-key", DEFAULT_API_HOST).expect("client")
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.all_quotes_url().expect("url").as_str(),
            "https://get-quotes-api.p.rapidapi.com/quotes"
        );
        assert_eq!(
            client.category_url("Nature").expect("url").as_str(),
            "https://get-quotes-api.p.rapidapi.com/category/Nature"
        );
        // Category names are path-encoded
        assert_eq!(
            client.category_url("Good Life").expect("url").as_str(),
            "https://get-quotes-api.p.rapidapi.com/category/Good%20Life"
        );
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let client = QuoteApiClient::new("http://localhost:8080/v1", "", DEFAULT_API_HOST).expect("client");
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/v1/");
        assert_eq!(client.all_quotes_url().expect("url").as_str(), "http://localhost:8080/v1/quotes");
        assert_eq!(
            client.category_url("Love").expect("url").as_str(),
            "http://localhost:8080/v1/category/Love"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(QuoteApiClient::new("not a url", "", DEFAULT_API_HOST).is_err());
        assert!(QuoteApiClient::new("mailto:someone@example.com", "", DEFAULT_API_HOST).is_err());
    }

    #[test]
    fn test_auth_headers() {
        let headers = client().auth_headers().expect("headers");
        assert_eq!(headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()), Some("test-key"));
        assert_eq!(
            headers.get(API_HOST_HEADER).and_then(|v| v.to_str().ok()),
            Some(DEFAULT_API_HOST)
        );

        let anonymous = client().with_api_key("");
        assert!(!anonymous.has_api_key());
        assert!(anonymous.auth_headers().expect("headers").get(API_KEY_HEADER).is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("test-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
