//! Bounded job status polling
//!
//! The poller re-queries the job status at a fixed interval until the service
//! reports a terminal code or the attempt budget runs out. A failed status
//! query is never retried: it aborts polling immediately.
//!
//! # Example
//!
//! ```no_run
//! use landscape_dl::config::PollConfig;
//! use landscape_dl::poller::poll_until_terminal;
//! use landscape_dl::service::ServiceClient;
//! use landscape_dl::types::JobId;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(service: &ServiceClient) -> landscape_dl::Result<()> {
//! let report = poll_until_terminal(
//!     service,
//!     &JobId::new("LF_1234"),
//!     &PollConfig::default(),
//!     &CancellationToken::new(),
//!     |status, attempt| println!("{attempt}: {status}"),
//! )
//! .await?;
//! println!("ready after {} checks", report.attempts);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::service::ServiceClient;
use crate::types::{JobId, StatusCode};

/// Anything that can report the status of a job
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Query the current status of `job`
    async fn poll_status(&self, job: &JobId, cancel: &CancellationToken) -> Result<StatusCode>;
}

#[async_trait]
impl StatusSource for ServiceClient {
    async fn poll_status(&self, job: &JobId, cancel: &CancellationToken) -> Result<StatusCode> {
        self.status(job, cancel).await
    }
}

/// Outcome of a successful poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollReport {
    /// Number of status queries issued
    pub attempts: u32,
    /// Terminal status (always [`StatusCode::READY`])
    pub status: StatusCode,
}

/// Poll `job` until it reaches a terminal status
///
/// `on_status` is called after every successful status read with the code and
/// the 1-based attempt number.
///
/// # Errors
///
/// - whatever the status query returned, on its first failure
/// - [`Error::Timeout`] when `config.max_attempts` queries found no terminal code
/// - [`Error::RemoteExtraction`] when the terminal code is not [`StatusCode::READY`]
/// - [`Error::Cancelled`] when `cancel` fires during a query or a wait
pub async fn poll_until_terminal<S, F>(
    source: &S,
    job: &JobId,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut on_status: F,
) -> Result<PollReport>
where
    S: StatusSource + ?Sized,
    F: FnMut(StatusCode, u32),
{
    let mut attempt = 0;
    let mut last_status = None;

    let status = loop {
        if attempt >= config.max_attempts {
            warn!(
                %job,
                attempts = attempt,
                ?last_status,
                "job did not finish within the attempt budget"
            );
            return Err(Error::Timeout {
                attempts: attempt,
                last_status,
            });
        }
        attempt += 1;

        let status = source.poll_status(job, cancel).await?;
        last_status = Some(status);
        info!(
            %job,
            attempt,
            max_attempts = config.max_attempts,
            status = status.0,
            phase = status.phase_name(),
            "job status"
        );
        on_status(status, attempt);

        if status.is_terminal() {
            break status;
        }

        // No point waiting once the budget is spent
        if attempt < config.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(config.interval) => {}
            }
        }
    };

    if !status.is_success() {
        warn!(%job, %status, "service reported extraction failure");
        return Err(Error::RemoteExtraction {
            job: job.clone(),
            status,
        });
    }

    Ok(PollReport {
        attempts: attempt,
        status,
    })
}
