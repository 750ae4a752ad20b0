//! HTTP client for the console list API.
//!
//! Each resource collection answers `POST {server}/api/{resource}/list` with
//! a JSON [`PageRequest`] body and a `{"totalCount", "items"}` response.
//!
//! # Example
//!
//! ```rust,no_run
//! use desk_cli::client::ApiClient;
//! use desk_collection::{CollectionConfig, PagedCollection};
//!
//! # fn example() -> Result<(), desk_cli::CliError> {
//! let base = url::Url::parse("http://localhost:8080").expect("valid url");
//! let client = ApiClient::new(base, None, std::time::Duration::from_secs(30))?;
//! let devices = PagedCollection::new(client.resource("devices"), CollectionConfig::default());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use desk_collection::{PageFuture, PageRequest, PageResult, QueryService};
use desk_sync::{ErrorInfo, ErrorKind};
use reqwest::StatusCode;
use tracing::{debug, trace};
use url::Url;

use crate::error::CliError;

/// Row type of every collection: the server's JSON object, uninterpreted.
pub type Row = serde_json::Value;

/// Shared HTTP client for the console API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Build a client for `base` with a per-request deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base: Url, token: Option<String>, timeout: Duration) -> Result<Self, CliError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("desk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliError::Connection(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, base, token })
    }

    /// Query service for one resource collection.
    #[must_use]
    pub fn resource(&self, resource: impl Into<String>) -> ResourceQuery {
        ResourceQuery {
            client: self.clone(),
            resource: resource.into(),
        }
    }

    /// URL of the list endpoint for `resource`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn list_url(&self, resource: &str) -> Result<Url, ErrorInfo> {
        endpoint(&self.base, &["api", resource, "list"])
    }
}

/// [`QueryService`] over one resource's list endpoint.
#[derive(Debug, Clone)]
pub struct ResourceQuery {
    client: ApiClient,
    resource: String,
}

impl ResourceQuery {
    /// Resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl QueryService for ResourceQuery {
    type Item = Row;

    fn fetch_page(&self, request: PageRequest) -> PageFuture<Row> {
        let client = self.client.clone();
        let resource = self.resource.clone();
        Box::pin(async move {
            let url = client.list_url(&resource)?;
            debug!(%url, limit = request.limit, offset = request.offset, "POST list");

            let mut builder = client.http.post(url).json(&request);
            if let Some(token) = &client.token {
                builder = builder.bearer_auth(token);
            }

            let response = builder.send().await.map_err(classify_reqwest)?;
            let status = response.status();
            let body = response.bytes().await.map_err(classify_reqwest)?;
            trace!(%status, bytes = body.len(), "list response");

            if !status.is_success() {
                return Err(ErrorInfo::new(
                    classify_status(status),
                    format!("{status}: {}", String::from_utf8_lossy(&body).trim()),
                ));
            }

            serde_json::from_slice::<PageResult<Row>>(&body)
                .map_err(|e| ErrorInfo::protocol(format!("invalid list response: {e}")))
        })
    }
}

/// Failure class of a non-success HTTP status.
#[must_use]
pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Auth,
        _ => ErrorKind::Server,
    }
}

fn classify_reqwest(err: reqwest::Error) -> ErrorInfo {
    if err.is_decode() {
        return ErrorInfo::protocol(err.to_string());
    }
    match err.status() {
        Some(status) => ErrorInfo::new(classify_status(status), err.to_string()),
        None => ErrorInfo::transport(err.to_string()),
    }
}

/// Append path segments to `base`, keeping any base path.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ErrorInfo> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ErrorInfo::transport(format!("cannot use '{base}' as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
