pub mod auth;
pub mod directory;

use crate::config::ConfigManager;
use crate::error::{AdctlError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const GRAPH_API_BETA: &str = "https://graph.microsoft.com/beta";

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 30000;
const JITTER_FACTOR: f64 = 0.3;

/// Exponential backoff with +/- 30% jitter
fn calculate_backoff_with_jitter(attempt: u32) -> Duration {
    let base_backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let capped_backoff = base_backoff.min(MAX_BACKOFF_MS);

    let jitter_range = (capped_backoff as f64 * JITTER_FACTOR) as u64;
    let jitter = if jitter_range > 0 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::time::SystemTime::now().hash(&mut hasher);
        (hasher.finish() % (jitter_range * 2)) as i64 - jitter_range as i64
    } else {
        0
    };

    let final_backoff = (capped_backoff as i64 + jitter).max(100) as u64;
    Duration::from_millis(final_backoff)
}

/// Read-only Graph API client with retry for transient failures
pub struct GraphClient {
    client: Client,
    access_token: String,
    base_url: String,
    beta_url: String,
}

impl GraphClient {
    pub fn new(access_token: String) -> Self {
        Self {
            client: Client::new(),
            access_token,
            base_url: GRAPH_API_BASE.to_string(),
            beta_url: GRAPH_API_BETA.to_string(),
        }
    }

    /// Client pointed at a custom base URL (integration tests)
    pub fn with_base_url(access_token: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            access_token,
            beta_url: base_url.clone(),
            base_url,
        }
    }

    /// Load or acquire a token for the named tenant and build a client
    pub async fn from_config(config: &ConfigManager, tenant_name: &str) -> Result<Self> {
        let graph_auth = auth::GraphAuth::new(config.clone());
        let access_token = graph_auth.get_access_token(tenant_name).await?;
        Ok(Self::new(access_token))
    }

    fn url(&self, base: &str, endpoint: &str) -> String {
        format!("{}/{}", base, endpoint.trim_start_matches('/'))
    }

    /// GET an endpoint on the v1.0 surface and deserialize the JSON body
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(&self.base_url, endpoint);
        let response = self.execute_with_retry(&url).await?;
        Ok(response.json::<T>().await?)
    }

    /// GET an endpoint whose payload is plain text (the usage-report
    /// endpoints redirect to a CSV download; reqwest follows the redirect)
    pub async fn get_text(&self, endpoint: &str) -> Result<String> {
        let url = self.url(&self.base_url, endpoint);
        let response = self.execute_with_retry(&url).await?;
        Ok(response.text().await?)
    }

    /// Fetch all pages of a paginated endpoint, following `@odata.nextLink`
    pub async fn get_all_pages<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
    ) -> Result<Vec<T>> {
        self.collect_pages(self.url(&self.base_url, endpoint)).await
    }

    /// Fetch all pages from the beta surface
    pub async fn get_all_pages_beta<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
    ) -> Result<Vec<T>> {
        self.collect_pages(self.url(&self.beta_url, endpoint)).await
    }

    async fn collect_pages<T: for<'de> Deserialize<'de>>(
        &self,
        first_url: String,
    ) -> Result<Vec<T>> {
        let mut all_items: Vec<T> = Vec::new();
        let mut current_url = first_url;

        loop {
            let response = self.execute_with_retry(&current_url).await?;
            let page: PaginatedResponse<T> = response.json().await?;
            all_items.extend(page.value);

            match page.next_link {
                Some(next) => current_url = next,
                None => break,
            }
        }

        Ok(all_items)
    }

    /// Single GET with bounded retry: honors Retry-After on 429, backs off
    /// with jitter on 5xx and connection errors, and surfaces everything
    /// else immediately.
    async fn execute_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.access_token)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(INITIAL_BACKOFF_MS / 1000);

                        tracing::warn!(
                            retry_after,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            "rate limited by Graph API"
                        );
                        tokio::time::sleep(Duration::from_secs(retry_after)).await;
                        continue;
                    }

                    if status.is_server_error() && attempt < MAX_RETRIES - 1 {
                        let wait_time = calculate_backoff_with_jitter(attempt);
                        tracing::warn!(
                            %status,
                            ?wait_time,
                            attempt = attempt + 1,
                            "Graph API server error, retrying"
                        );
                        tokio::time::sleep(wait_time).await;
                        continue;
                    }

                    if !status.is_success() {
                        let error_text = resp.text().await.unwrap_or_default();
                        let enhanced = crate::error::enhance_graph_error(&error_text);
                        return Err(AdctlError::GraphApiError(format!(
                            "HTTP {}: {}",
                            status, enhanced
                        )));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    if attempt < MAX_RETRIES - 1 {
                        let wait_time = calculate_backoff_with_jitter(attempt);
                        tracing::warn!(error = %e, ?wait_time, "connection error, retrying");
                        tokio::time::sleep(wait_time).await;
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(|e| e.into()).unwrap_or_else(|| {
            AdctlError::GraphApiError(format!("GET {} failed after {} retries", url, MAX_RETRIES))
        }))
    }
}

/// Standard OData page with `value` array and `@odata.nextLink`
#[derive(Debug, Deserialize)]
pub struct PaginatedResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
    #[serde(rename = "@odata.count")]
    pub count: Option<i64>,
}
