//! End-to-end acquisition: validate, submit, poll, download, fan out

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extraction::fetch_and_extract;
use crate::poller::poll_until_terminal;
use crate::product::{Product, area_utm_epsg};
use crate::service::ServiceClient;
use crate::types::{AcquisitionReport, AreaOfInterest, Event, Job, JobId};
use crate::utils::{destination_stem, pin_query_param};

/// Query parameter carrying the output projection on the job artifact URL
const PROJECTION_PARAM: &str = "prj";

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Landscape acquisition client
///
/// Cloning is cheap; clones share the configuration, the HTTP connection
/// pool and the event channel.
#[derive(Clone)]
pub struct LandscapeClient {
    config: Arc<Config>,
    service: ServiceClient,
    event_tx: broadcast::Sender<Event>,
}

impl LandscapeClient {
    /// Create a client from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let service = ServiceClient::new(&config)?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            service,
            event_tx,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Endpoint-level client, for callers driving the steps themselves
    pub fn service(&self) -> &ServiceClient {
        &self.service
    }

    /// Subscribe to acquisition events
    ///
    /// Events sent before subscribing are not replayed. A slow subscriber
    /// that falls more than the channel capacity behind receives
    /// `RecvError::Lagged` and should keep receiving. Download progress is
    /// reported at most once per [`PROGRESS_STEP_BYTES`](crate::extraction::PROGRESS_STEP_BYTES).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Fetch the landscape for `area` and unpack it beside `destination`
    ///
    /// Files are named after the stem of `destination` with each archive
    /// entry's own extension, so `out.lcp` produces `out.prj`, `out.asc` and so on.
    pub async fn acquire(
        &self,
        area: &AreaOfInterest,
        destination: impl AsRef<Path>,
    ) -> Result<AcquisitionReport> {
        self.acquire_with_cancel(area, destination, &CancellationToken::new())
            .await
    }

    /// Like [`acquire`](Self::acquire), stopping early when `cancel` fires
    ///
    /// The configured deadline, if any, bounds the whole acquisition.
    pub async fn acquire_with_cancel(
        &self,
        area: &AreaOfInterest,
        destination: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<AcquisitionReport> {
        let destination = destination.as_ref();
        let mut issued: Option<JobId> = None;

        let result = match self.config.deadline {
            Some(deadline) => {
                // Dropping the run on timeout releases the scratch file
                match tokio::time::timeout(deadline, self.run(area, destination, cancel, &mut issued))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(Error::DeadlineExceeded(deadline)),
                }
            }
            None => self.run(area, destination, cancel, &mut issued).await,
        };

        if let Err(e) = &result {
            error!(job = ?issued, error = %e, code = e.error_code(), "acquisition failed");
            self.emit_event(Event::Failed {
                job: issued,
                error: e.to_string(),
            });
        }

        result
    }

    async fn run(
        &self,
        area: &AreaOfInterest,
        destination: &Path,
        cancel: &CancellationToken,
        issued: &mut Option<JobId>,
    ) -> Result<AcquisitionReport> {
        // Fail before any network traffic if the outputs cannot be named
        destination_stem(destination)?;
        debug!(%area, destination = %destination.display(), "starting acquisition");

        let product = match &self.config.validation.product {
            Some(code) => Product::by_code(code.trim()).ok_or_else(|| {
                Error::config("validation.product", format!("unknown product code: {code:?}"))
            })?,
            None => Product::for_area(area)?,
        };
        let product = product.code.to_string();
        let epsg = self
            .config
            .output
            .target_epsg
            .unwrap_or_else(|| area_utm_epsg(area));

        let artifact = self.service.validate(area, &product, cancel).await?;
        self.emit_event(Event::Validated {
            area: *area,
            product: product.clone(),
            url: artifact.to_string(),
        });

        let artifact = pin_query_param(&artifact, PROJECTION_PARAM, &epsg.to_string());
        let id = self.service.submit(&artifact, cancel).await?;
        *issued = Some(id.clone());
        let mut job = Job::new(id.clone());
        info!(job = %id, product, epsg, "projection pinned, initiating job");
        self.emit_event(Event::JobSubmitted {
            job: id.clone(),
            epsg,
        });

        self.service.initiate(&id, cancel).await?;

        let max_attempts = self.config.poll.max_attempts;
        let poll = poll_until_terminal(
            &self.service,
            &id,
            &self.config.poll,
            cancel,
            |status, attempt| {
                job.last_status = Some(status);
                self.emit_event(Event::StatusChanged {
                    job: id.clone(),
                    status,
                    attempt,
                    max_attempts,
                });
            },
        )
        .await?;

        let data_url = self.service.data(&id, cancel).await?;
        job.set_artifact_url(data_url.as_str())?;

        let scratch_dir = self
            .config
            .output
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let (files, archive) = fetch_and_extract(
            self.service.http(),
            &data_url,
            destination,
            &scratch_dir,
            self.config.output.keep_archive,
            cancel,
            |bytes, total| {
                self.emit_event(Event::Downloading {
                    job: id.clone(),
                    bytes,
                    total,
                })
            },
        )
        .await?;

        self.emit_event(Event::Extracted {
            job: id.clone(),
            files: files.clone(),
        });
        info!(job = %id, files = files.len(), attempts = poll.attempts, "acquisition complete");
        self.emit_event(Event::Completed {
            job: id,
            destination: PathBuf::from(destination),
        });

        Ok(AcquisitionReport {
            job,
            product,
            epsg,
            attempts: poll.attempts,
            files,
            archive,
        })
    }
}

impl std::fmt::Debug for LandscapeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandscapeClient")
            .field("base_url", &self.service.base_url().as_str())
            .field("subscribers", &self.event_tx.receiver_count())
            .finish()
    }
}
