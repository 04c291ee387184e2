//! HTTP access to the extraction service, split by endpoint family:
//! - [`envelope`] - the `<return>` value wrapper shared by the job endpoints
//! - [`validation`] - area validation (`processAOI.jsp`)
//! - [`job`] - job submission, initiation, status and final data URL

pub mod envelope;
mod job;
mod validation;

pub use validation::{Piece, ValidationResponse};

use crate::config::Config;
use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Client for the extraction service endpoints
///
/// Cheap to clone: the underlying `reqwest::Client` shares its connection pool.
#[derive(Clone, Debug)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Url,
    chunk_size: u32,
    request_timeout: Duration,
}

impl ServiceClient {
    /// Build a client from the service and validation settings of `config`
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.service.base_url)
            .map_err(|e| Error::config("service.base_url", format!("invalid URL: {e}")))?;

        // Only connecting is bounded client-wide; artifact transfers may run
        // as long as the caller's deadline allows
        let http = reqwest::Client::builder()
            .connect_timeout(config.service.request_timeout)
            .user_agent(config.service.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url,
            chunk_size: config.validation.chunk_size,
            request_timeout: config.service.request_timeout,
        })
    }

    /// Base URL all endpoint paths are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The shared HTTP client (also used for artifact transfer)
    ///
    /// It carries no whole-request timeout; service calls made through
    /// [`ServiceClient`] apply `request_timeout` per request.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute endpoint URL with the given query parameters
    pub(crate) fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| Error::config("service.base_url", format!("cannot join {path}: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Issue a GET bounded by `request_timeout` and fail on transport errors
    /// and non-success statuses
    pub(crate) async fn get(&self, url: Url, cancel: &CancellationToken) -> Result<reqwest::Response> {
        debug!(%url, "GET");
        cancellable(cancel, async {
            let response = self
                .http
                .get(url)
                .timeout(self.request_timeout)
                .send()
                .await?;
            Ok(response.error_for_status()?)
        })
        .await
    }

    /// GET and read the whole body as text
    pub(crate) async fn get_text(&self, url: Url, cancel: &CancellationToken) -> Result<String> {
        let response = self.get(url, cancel).await?;
        let body = cancellable(cancel, async { Ok(response.text().await?) }).await?;
        debug!(body = %body, "response body");
        Ok(body)
    }
}

/// Race `fut` against the cancellation token
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}
