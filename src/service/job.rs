//! Job lifecycle endpoints of the download service

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::ServiceClient;
use super::envelope::return_value;
use crate::error::{Error, Result};
use crate::types::{JobId, StatusCode};

const DOWNLOAD_SERVICE_PATH: &str = "/axis2/services/DownloadService/";

impl ServiceClient {
    fn download_service_url(&self, operation: &str, job: &JobId) -> Result<Url> {
        self.endpoint(
            &format!("{DOWNLOAD_SERVICE_PATH}{operation}"),
            &[("downloadID", job.as_str())],
        )
    }

    /// Request the (SRS-pinned) artifact URL returned by validation
    ///
    /// The service answers with the job identifier as its return value.
    pub async fn submit(&self, artifact_url: &Url, cancel: &CancellationToken) -> Result<JobId> {
        let body = self.get_text(artifact_url.clone(), cancel).await?;
        let id = return_value(&body)?;
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::InvalidResponse(
                "service returned an empty job identifier".to_string(),
            ));
        }
        info!(job = id, "job submitted");
        Ok(JobId::new(id))
    }

    /// Ask the service to start processing a job
    ///
    /// Only transport success matters; the body is ignored.
    pub async fn initiate(&self, job: &JobId, cancel: &CancellationToken) -> Result<()> {
        let url = self.download_service_url("initiateDownload", job)?;
        let response = self.get(url, cancel).await?;
        debug!(%job, status = %response.status(), "job initiated");
        Ok(())
    }

    /// Query the current status of a job
    ///
    /// # Errors
    ///
    /// [`Error::InvalidResponse`] when the first comma-separated field of the
    /// return value is not an integer.
    pub async fn status(&self, job: &JobId, cancel: &CancellationToken) -> Result<StatusCode> {
        let url = self.download_service_url("getDownloadStatus", job)?;
        let body = self.get_text(url, cancel).await?;
        return_value(&body)?.parse()
    }

    /// Final download URL of a ready job
    pub async fn data(&self, job: &JobId, cancel: &CancellationToken) -> Result<Url> {
        let url = self.download_service_url("getData", job)?;
        let body = self.get_text(url, cancel).await?;
        let value = return_value(&body)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::InvalidResponse(format!(
                "no artifact URL for job {job}"
            )));
        }
        Url::parse(value)
            .map_err(|e| Error::InvalidResponse(format!("invalid artifact URL {value:?}: {e}")))
    }
}
