//! Bigin API connector implementation
//!
//! Implements the `RecordSource` trait for the Bigin v2 REST API.

use async_trait::async_trait;
use bridge_traits::crm::{FetchAbort, FetchOutcome, RecordSource};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_auth::TokenManager;
use core_runtime::config::CoreConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ZohoError};
use crate::types::{FieldsResponse, RecordsPage};

/// Field set requested when the schema endpoint is unusable
pub const FALLBACK_FIELDS: &str = "id,Created_Time,Modified_Time";

/// Maximum records per page (Bigin API limit)
const MAX_PAGE_SIZE: u32 = 200;

/// Timeout for the field-list request
const SCHEMA_TIMEOUT: Duration = Duration::from_secs(15);

/// Characters of an error body kept in a [`FetchAbort::Status`]
const ERROR_BODY_LIMIT: usize = 500;

/// Bigin API connector
///
/// Implements `RecordSource` for Bigin API v2.
///
/// # Features
///
/// - Field discovery with fallback to [`FALLBACK_FIELDS`]
/// - Paginated listing with a fixed delay between pages
/// - Token refresh and same-page retry on `401`
/// - Partial results on any non-recoverable response
///
/// # Example
///
/// ```ignore
/// use provider_zoho::ZohoConnector;
/// use bridge_traits::crm::RecordSource;
///
/// let connector = ZohoConnector::new(http_client, tokens, "https://www.zohoapis.in/bigin/v2");
/// let outcome = connector.fetch_module("Contacts").await;
/// ```
pub struct ZohoConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Shared credential holder
    tokens: Arc<TokenManager>,

    /// `https://{api_domain}/bigin/v2`
    base_url: String,

    per_page: u32,
    rate_limit_delay: Duration,
    request_timeout: Duration,
}

impl ZohoConnector {
    /// Create a connector with default paging settings
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `tokens` - Token manager shared with the rest of the service
    /// * `base_url` - API base, without a trailing slash
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        tokens: Arc<TokenManager>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            tokens,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            per_page: MAX_PAGE_SIZE,
            rate_limit_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Create a connector from the runtime configuration
    pub fn from_core_config(
        config: &CoreConfig,
        http_client: Arc<dyn HttpClient>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self::new(http_client, tokens, config.base_url())
            .with_page_size(config.records_per_page)
            .with_rate_limit_delay(config.rate_limit_delay)
            .with_request_timeout(config.request_timeout)
    }

    /// Page size, clamped to `1..=200`
    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Comma-joined field names of a module
    ///
    /// A `401` triggers one token refresh and one retry.
    ///
    /// # Errors
    ///
    /// Any failure is returned; callers fall back to [`FALLBACK_FIELDS`].
    #[instrument(skip(self))]
    pub async fn get_module_fields(&self, module: &str) -> Result<String> {
        let url = format!(
            "{}/settings/fields?module={}",
            self.base_url,
            urlencoding::encode(module)
        );

        let mut response = self.get(&url, SCHEMA_TIMEOUT).await?;
        if response.status == 401 {
            debug!("Field list returned 401, refreshing token");
            if !self.tokens.refresh().await {
                return Err(ZohoError::Unauthorized);
            }
            response = self.get(&url, SCHEMA_TIMEOUT).await?;
        }

        if response.status != 200 {
            return Err(ZohoError::ApiError {
                status_code: response.status,
                message: response.text_snippet(ERROR_BODY_LIMIT),
            });
        }

        let parsed: FieldsResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ZohoError::ParseError(format!("Failed to parse field list: {}", e)))?;
        let fields = parsed
            .field_list()
            .ok_or_else(|| ZohoError::ParseError("Field list is empty".to_string()))?;

        debug!(count = parsed.fields.len(), "Resolved module fields");
        Ok(fields)
    }

    fn page_url(&self, module: &str, page: u32, fields: &str) -> String {
        format!(
            "{}/{}?page={}&per_page={}&fields={}",
            self.base_url,
            urlencoding::encode(module),
            page,
            self.per_page,
            urlencoding::encode(fields)
        )
    }

    /// Authenticated GET
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let headers = self.tokens.headers().await?;
        let request = HttpRequest::new(HttpMethod::Get, url)
            .headers(headers)
            .timeout(timeout);
        Ok(self.http_client.execute(request).await?)
    }
}

#[async_trait]
impl RecordSource for ZohoConnector {
    #[instrument(skip(self))]
    async fn fetch_module(&self, module: &str) -> FetchOutcome {
        let fields = match self.get_module_fields(module).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(error = %e, "Using fallback field set");
                FALLBACK_FIELDS.to_string()
            }
        };

        let mut records: Vec<Value> = Vec::new();
        let mut pages_fetched = 0u32;
        let mut page = 1u32;
        let mut refreshed_this_page = false;

        info!(per_page = self.per_page, "Starting module fetch");

        loop {
            let url = self.page_url(module, page, &fields);

            let response = match self.get(&url, self.request_timeout).await {
                Ok(response) => response,
                Err(ZohoError::AuthenticationFailed(e)) => {
                    warn!(page, error = %e, "No access token available");
                    return FetchOutcome::aborted(records, pages_fetched, FetchAbort::Unauthorized);
                }
                Err(e) => {
                    warn!(page, error = %e, "Page request failed");
                    return FetchOutcome::aborted(
                        records,
                        pages_fetched,
                        FetchAbort::Transport(e.to_string()),
                    );
                }
            };

            debug!(page, status = response.status, "Fetched page");

            match response.status {
                200 => {}
                204 => {
                    debug!(page, "No content, module exhausted");
                    break;
                }
                401 => {
                    if refreshed_this_page {
                        warn!(page, "Still unauthorized after refresh, aborting fetch");
                        return FetchOutcome::aborted(
                            records,
                            pages_fetched,
                            FetchAbort::Unauthorized,
                        );
                    }
                    refreshed_this_page = true;
                    if !self.tokens.refresh().await {
                        warn!(page, "Token refresh failed, aborting fetch");
                        return FetchOutcome::aborted(
                            records,
                            pages_fetched,
                            FetchAbort::Unauthorized,
                        );
                    }
                    continue;
                }
                status => {
                    let body = response.text_snippet(ERROR_BODY_LIMIT);
                    warn!(page, status, body = %body, "Unexpected response, aborting fetch");
                    return FetchOutcome::aborted(
                        records,
                        pages_fetched,
                        FetchAbort::Status { status, body },
                    );
                }
            }

            let parsed: RecordsPage = match serde_json::from_slice(&response.body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(page, error = %e, "Page body did not decode");
                    return FetchOutcome::aborted(
                        records,
                        pages_fetched,
                        FetchAbort::Decode(e.to_string()),
                    );
                }
            };

            pages_fetched += 1;
            debug!(page, count = parsed.data.len(), "Page decoded");
            records.extend(parsed.data);

            if !parsed.info.more_records {
                break;
            }

            page += 1;
            refreshed_this_page = false;
            if !self.rate_limit_delay.is_zero() {
                tokio::time::sleep(self.rate_limit_delay).await;
            }
        }

        info!(total = records.len(), pages = pages_fetched, "Module fetch finished");
        FetchOutcome::complete(records, pages_fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use core_auth::{Credentials, OAuthConfig};
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    const BASE: &str = "https://www.zohoapis.in/bigin/v2";
    const TOKEN_URL: &str = "https://accounts.zoho.in/oauth/v2/token";

    fn connector(mock: MockHttpClient) -> ZohoConnector {
        let http: Arc<dyn HttpClient> = Arc::new(mock);
        let tokens = TokenManager::new(
            OAuthConfig::new("1000.CLIENT", "secret", TOKEN_URL).unwrap(),
            Credentials::new("refresh").with_access_token("held"),
            http.clone(),
        );
        ZohoConnector::new(http, Arc::new(tokens), BASE).with_rate_limit_delay(Duration::ZERO)
    }

    fn page_body(ids: &[&str], more: bool) -> String {
        let data: Vec<Value> = ids.iter().map(|id| serde_json::json!({ "id": id })).collect();
        serde_json::json!({ "data": data, "info": { "more_records": more } }).to_string()
    }

    fn fields_ok() -> HttpResponse {
        HttpResponse::new(
            200,
            r#"{"fields":[{"api_name":"id"},{"api_name":"Full_Name"}]}"#,
        )
    }

    fn page_number(url: &str) -> Option<u32> {
        url.split(['?', '&'])
            .find_map(|part| part.strip_prefix("page="))
            .and_then(|n| n.parse().ok())
    }

    #[tokio::test]
    async fn test_fetch_follows_more_records() {
        let mut mock = MockHttpClient::new();
        let urls = Arc::new(Mutex::new(Vec::new()));
        let seen = urls.clone();
        mock.expect_execute().returning(move |req| {
            seen.lock().unwrap().push(req.url.clone());
            if req.url.contains("/settings/fields") {
                return Ok(fields_ok());
            }
            match page_number(&req.url) {
                Some(1) => Ok(HttpResponse::new(200, page_body(&["1", "2"], true))),
                Some(2) => Ok(HttpResponse::new(200, page_body(&["3"], false))),
                _ => panic!("unexpected request {}", req.url),
            }
        });

        let outcome = connector(mock).fetch_module("Contacts").await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.records.len(), 3);

        let urls = urls.lock().unwrap();
        assert_eq!(urls[0], format!("{}/settings/fields?module=Contacts", BASE));
        assert_eq!(
            urls[1],
            format!("{}/Contacts?page=1&per_page=200&fields=id%2CFull_Name", BASE)
        );
        assert!(urls[2].contains("page=2&per_page=200"));
    }

    #[tokio::test]
    async fn test_schema_failure_uses_fallback_fields() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url.contains("/settings/fields") {
                return Ok(HttpResponse::new(500, "oops"));
            }
            assert!(req.url.ends_with("fields=id%2CCreated_Time%2CModified_Time"));
            Ok(HttpResponse::new(200, page_body(&["1"], false)))
        });

        let outcome = connector(mock).fetch_module("Notes").await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_401_refreshes_once_and_retries_same_page() {
        let mut mock = MockHttpClient::new();
        let token_calls = Arc::new(AtomicUsize::new(0));
        let page_one_calls = Arc::new(AtomicUsize::new(0));
        let (tokens, pages) = (token_calls.clone(), page_one_calls.clone());
        mock.expect_execute().returning(move |req| {
            if req.url == TOKEN_URL {
                tokens.fetch_add(1, Ordering::SeqCst);
                return Ok(HttpResponse::new(200, r#"{"access_token":"fresh"}"#));
            }
            if req.url.contains("/settings/fields") {
                return Ok(fields_ok());
            }
            if pages.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(HttpResponse::new(401, r#"{"code":"INVALID_TOKEN"}"#));
            }
            assert_eq!(
                req.headers.get("Authorization").map(String::as_str),
                Some("Zoho-oauthtoken fresh")
            );
            assert_eq!(page_number(&req.url), Some(1));
            Ok(HttpResponse::new(200, page_body(&["1", "2"], false)))
        });

        let outcome = connector(mock).fetch_module("Contacts").await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(token_calls.load(Ordering::SeqCst), 1);
        assert_eq!(page_one_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_401_on_same_page_aborts() {
        let mut mock = MockHttpClient::new();
        let token_calls = Arc::new(AtomicUsize::new(0));
        let tokens = token_calls.clone();
        mock.expect_execute().returning(move |req| {
            if req.url == TOKEN_URL {
                tokens.fetch_add(1, Ordering::SeqCst);
                return Ok(HttpResponse::new(200, r#"{"access_token":"fresh"}"#));
            }
            if req.url.contains("/settings/fields") {
                return Ok(fields_ok());
            }
            Ok(HttpResponse::new(401, ""))
        });

        let outcome = connector(mock).fetch_module("Tasks").await;
        assert_eq!(outcome.abort, Some(FetchAbort::Unauthorized));
        assert!(outcome.records.is_empty());
        assert_eq!(token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_earlier_pages() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url == TOKEN_URL {
                return Ok(HttpResponse::new(400, r#"{"error":"invalid_code"}"#));
            }
            if req.url.contains("/settings/fields") {
                return Ok(fields_ok());
            }
            match page_number(&req.url) {
                Some(1) => Ok(HttpResponse::new(200, page_body(&["A", "D"], true))),
                _ => Ok(HttpResponse::new(401, "")),
            }
        });

        let outcome = connector(mock).fetch_module("Contacts").await;
        assert_eq!(outcome.abort, Some(FetchAbort::Unauthorized));
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_error_status_truncates_body() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url.contains("/settings/fields") {
                return Ok(fields_ok());
            }
            match page_number(&req.url) {
                Some(1) => Ok(HttpResponse::new(200, page_body(&["1"], true))),
                _ => Ok(HttpResponse::new(500, "x".repeat(800))),
            }
        });

        let outcome = connector(mock).fetch_module("Calls").await;
        assert_eq!(outcome.records.len(), 1);
        match outcome.abort {
            Some(FetchAbort::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 500);
            }
            other => panic!("unexpected abort {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_before_data_is_empty_failure() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url.contains("/settings/fields") {
                return Ok(fields_ok());
            }
            Err(BridgeError::Timeout("page".to_string()))
        });

        let outcome = connector(mock).fetch_module("Events").await;
        assert!(matches!(outcome.abort, Some(FetchAbort::Transport(_))));
        assert!(outcome.is_empty_failure());
    }

    #[tokio::test]
    async fn test_decode_failure_aborts() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url.contains("/settings/fields") {
                return Ok(fields_ok());
            }
            Ok(HttpResponse::new(200, "<html>maintenance</html>"))
        });

        let outcome = connector(mock).fetch_module("Accounts").await;
        assert!(matches!(outcome.abort, Some(FetchAbort::Decode(_))));
    }

    #[tokio::test]
    async fn test_204_is_complete_and_empty() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|req| {
            if req.url.contains("/settings/fields") {
                return Ok(fields_ok());
            }
            Ok(HttpResponse::new(204, ""))
        });

        let outcome = connector(mock).fetch_module("Pipelines").await;
        assert!(outcome.is_complete());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.pages_fetched, 0);
    }

    #[tokio::test]
    async fn test_schema_401_refreshes_and_retries() {
        let mut mock = MockHttpClient::new();
        let schema_calls = Arc::new(AtomicUsize::new(0));
        let calls = schema_calls.clone();
        mock.expect_execute().returning(move |req| {
            if req.url == TOKEN_URL {
                return Ok(HttpResponse::new(200, r#"{"access_token":"fresh"}"#));
            }
            if req.url.contains("/settings/fields") {
                return if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(HttpResponse::new(401, ""))
                } else {
                    Ok(fields_ok())
                };
            }
            Ok(HttpResponse::new(204, ""))
        });

        let fields = connector(mock).get_module_fields("Contacts").await.unwrap();
        assert_eq!(fields, "id,Full_Name");
        assert_eq!(schema_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let conn = connector(MockHttpClient::new()).with_page_size(500);
        assert!(conn.page_url("Contacts", 1, "id").contains("per_page=200"));
        let conn = conn.with_page_size(0);
        assert!(conn.page_url("Contacts", 1, "id").contains("per_page=1"));
    }

    #[test]
    fn test_from_core_config() {
        let config = CoreConfig::builder()
            .client_id("1000.CLIENT")
            .client_secret("secret")
            .refresh_token("refresh")
            .records_per_page(50)
            .build()
            .unwrap();
        let http: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());
        let tokens = Arc::new(TokenManager::from_core_config(&config, http.clone()).unwrap());

        let conn = ZohoConnector::from_core_config(&config, http, tokens);
        assert_eq!(conn.base_url(), BASE);
        assert_eq!(conn.per_page, 50);
        assert_eq!(conn.rate_limit_delay, Duration::from_millis(500));
    }
}
