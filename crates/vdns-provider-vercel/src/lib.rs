// # Vercel DNS Provider
//
// This crate provides the Vercel DNS implementation of `DnsProvider`.
//
// ## Capabilities
//
// - Lists every record of a domain, following pagination
// - Creates A / AAAA records
// - Deletes records by id
// - Distinguishes a Vercel error payload from an empty record list
// - Maps HTTP status codes to specific errors (401/403, 404, 409, 429, 5xx)
// - Dry-run mode: listing is real, mutations are only logged
// - Bounded requests (client-level timeout)
//
// ## Trust Level: Untrusted (DNS Provider)
//
// No retries, no backoff, no caching, no background tasks. Whether a record
// needs to change is decided by the reconciler in `vdns-core`.
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Token is sent only as a bearer credential to the configured API base
//
// ## API Endpoints
//
// ```http
// GET    /v4/domains/:domain/records?limit=100[&until=:next][&teamId=:team]
// POST   /v2/domains/:domain/records          { "name", "type", "value" }
// DELETE /v2/domains/:domain/records/:id
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vdns_core::config::ProviderConfig;
use vdns_core::{AddressFamily, DnsProvider, DnsRecord, Error, Result};

/// Default Vercel API base URL
pub const VERCEL_API_BASE: &str = vdns_core::config::DEFAULT_VERCEL_API_BASE;

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Records requested per page
const PAGE_LIMIT: &str = "100";

/// Upper bound on followed pages for one listing; hitting it fails the listing
const MAX_PAGES: usize = 50;

/// Successful listing payload
#[derive(Debug, Deserialize)]
struct RecordsPage {
    records: Vec<DnsRecord>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    /// Timestamp to pass as `until` for the next page
    #[serde(default)]
    next: Option<i64>,
}

/// Vercel error payload: `{ "error": { "code": ..., "message": ... } }`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        format!(
            "{}: {}",
            self.code.as_deref().unwrap_or("unknown_error"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

/// A listing response is either a page of records or an error payload
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Failure(ErrorEnvelope),
    Page(RecordsPage),
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    value: &'a str,
}

/// Vercel DNS provider
///
/// Stateless and single-shot: one listing, create or delete per call (a
/// listing may span several pages).
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform listing requests
/// - Log the intended POST / DELETE
/// - **NOT** modify any record
pub struct VercelProvider {
    /// Vercel API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Team scope (sent as `teamId`)
    team_id: Option<String>,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: list for real, skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for VercelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VercelProvider")
            .field("api_token", &"<REDACTED>")
            .field("team_id", &self.team_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl VercelProvider {
    /// Create a new Vercel provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Vercel token with access to the domain
    /// - `team_id`: Optional team scope
    /// - `dry_run`: If true, list records but skip mutations
    /// - `timeout`: Bound on every request
    pub fn new(
        api_token: impl Into<String>,
        team_id: Option<String>,
        dry_run: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Vercel API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vdns/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            team_id,
            api_base: VERCEL_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a live provider with the default timeout
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, None, false, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a dry-run provider with the default timeout
    pub fn new_dry_run(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, None, true, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a provider from validated configuration
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        if config.dry_run {
            tracing::warn!("Vercel provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self::new(
            config.api_token.clone(),
            config.team_id.clone(),
            config.dry_run,
            timeout,
        )?
        .with_api_base(&config.api_base))
    }

    /// Point the provider at another API base (e.g. a test server)
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self, version: &str, domain: &str) -> String {
        format!("{}/{}/domains/{}/records", self.api_base, version, domain)
    }

    fn team_query(&self) -> Vec<(&'static str, String)> {
        self.team_id
            .iter()
            .map(|team| ("teamId", team.clone()))
            .collect()
    }

    fn transport_error(&self, context: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(format!("{}: {}", context, e))
        } else {
            Error::http(format!("{}: HTTP request failed: {}", context, e))
        }
    }

    /// Fetch one page of records
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /v4/domains/:domain/records?limit=100&until=:cursor
    /// Authorization: Bearer <token>
    /// ```
    async fn fetch_page(&self, domain: &str, until: Option<i64>) -> Result<RecordsPage> {
        let mut query = self.team_query();
        query.push(("limit", PAGE_LIMIT.to_string()));
        if let Some(until) = until {
            query.push(("until", until.to_string()));
        }

        let response = self
            .client
            .get(self.records_url("v4", domain))
            .bearer_auth(&self.api_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error("List records", e))?;

        if !response.status().is_success() {
            return Err(status_error(response, "List records").await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error("List records", e))?;

        match serde_json::from_str::<ListResponse>(&body) {
            Ok(ListResponse::Page(page)) => Ok(page),
            Ok(ListResponse::Failure(envelope)) => Err(Error::provider(
                "vercel",
                format!("List records returned an error payload: {}", envelope.error.describe()),
            )),
            Err(e) => Err(Error::provider(
                "vercel",
                format!("Invalid listing response: {}", e),
            )),
        }
    }
}

/// Map a non-2xx response to an error
async fn status_error(response: reqwest::Response, context: &str) -> Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    let detail = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.describe())
        .unwrap_or(body);

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions. Status: {}",
            context, status
        )),
        404 => Error::not_found(format!("{}: {}", context, detail)),
        409 => Error::conflict(format!("{}: {}", context, detail)),
        429 => Error::rate_limited(format!(
            "{}: rate limit exceeded. Status: {}",
            context, status
        )),
        500..=599 => Error::provider(
            "vercel",
            format!("{}: Vercel server error (transient): {} - {}", context, status, detail),
        ),
        _ => Error::provider("vercel", format!("{} failed: {} - {}", context, status, detail)),
    }
}

#[async_trait]
impl DnsProvider for VercelProvider {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        let mut records = Vec::new();
        let mut until = None;

        for page_number in 1..=MAX_PAGES {
            let page = self.fetch_page(domain, until).await?;
            tracing::debug!(
                "Listed page {} for {}: {} record(s)",
                page_number,
                domain,
                page.records.len()
            );
            records.extend(page.records);

            let next = page.pagination.and_then(|p| p.next);
            match next {
                Some(cursor) if Some(cursor) != until => until = Some(cursor),
                _ => return Ok(records),
            }
        }

        // A partial listing is not a baseline
        Err(Error::provider(
            "vercel",
            format!(
                "Listing for {} truncated after {} pages ({} records read)",
                domain,
                MAX_PAGES,
                records.len()
            ),
        ))
    }

    /// # API Call
    ///
    /// ```http
    /// POST /v2/domains/:domain/records
    /// { "name": "home", "type": "A", "value": "203.0.113.7" }
    /// ```
    async fn create_record(
        &self,
        domain: &str,
        name: &str,
        family: AddressFamily,
        value: &str,
    ) -> Result<()> {
        let record_type = family.record_type();
        let payload = CreateRecordRequest {
            name,
            record_type: record_type.as_str(),
            value,
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would POST {} with payload: {}",
                self.records_url("v2", domain),
                serde_json::to_string(&payload)?
            );
            return Ok(());
        }

        let response = self
            .client
            .post(self.records_url("v2", domain))
            .bearer_auth(&self.api_token)
            .query(&self.team_query())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error("Create record", e))?;

        if !response.status().is_success() {
            return Err(status_error(response, "Create record").await);
        }

        tracing::debug!("Vercel created {} {}.{} -> {}", record_type, name, domain, value);
        Ok(())
    }

    /// # API Call
    ///
    /// ```http
    /// DELETE /v2/domains/:domain/records/:id
    /// ```
    async fn delete_record(&self, domain: &str, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.records_url("v2", domain), id);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would DELETE {}", url);
            return Ok(());
        }

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .query(&self.team_query())
            .send()
            .await
            .map_err(|e| self.transport_error("Delete record", e))?;

        if !response.status().is_success() {
            return Err(status_error(response, "Delete record").await);
        }

        tracing::debug!("Vercel deleted record {} of {}", id, domain);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "vercel"
    }
}
