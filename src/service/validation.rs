//! Area validation: asks the service whether it has data for an area and
//! returns the job artifact URL of the first deliverable piece.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::{ServiceClient, cancellable};
use crate::error::{Error, Result};
use crate::types::AreaOfInterest;

const VALIDATION_PATH: &str =
    "/requestValidationServiceClient/sampleRequestValidationServiceProxy/processAOI.jsp";

/// Top-level JSON body of the validation endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct ValidationEnvelope {
    #[serde(rename = "REQUEST_SERVICE_RESPONSE")]
    pub response: ValidationResponse,
}

/// Validation outcome: the deliverable pieces for the requested area
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationResponse {
    /// Deliverable chunks; empty when the area has no data
    #[serde(rename = "PIECE", default)]
    pub pieces: Vec<Piece>,

    /// Service-side status flag
    #[serde(rename = "STATUS", default)]
    pub status: bool,
}

/// One deliverable chunk
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Piece {
    /// Job artifact URL
    #[serde(rename = "DOWNLOAD_URL")]
    pub download_url: String,

    /// Preview image URL ("none" when unavailable)
    #[serde(rename = "THUMBNAIL_URL", default)]
    pub thumbnail_url: String,
}

impl ServiceClient {
    /// Validation endpoint URL for an area and product
    pub fn validation_url(&self, area: &AreaOfInterest, product: &str) -> Result<Url> {
        let top = format!("{:.6}", area.north());
        let bottom = format!("{:.6}", area.south());
        let left = format!("{:.6}", area.west());
        let right = format!("{:.6}", area.east());
        let chunk_size = self.chunk_size.to_string();

        self.endpoint(
            VALIDATION_PATH,
            &[
                ("TOP", top.as_str()),
                ("BOTTOM", bottom.as_str()),
                ("LEFT", left.as_str()),
                ("RIGHT", right.as_str()),
                ("CHUNK_SIZE", chunk_size.as_str()),
                ("LAYER_IDS", product),
                ("JSON", "true"),
            ],
        )
    }

    /// Submit an area and product for validation
    ///
    /// Returns the first piece's download URL, which identifies the job artifact.
    ///
    /// # Errors
    ///
    /// - [`Error::Network`] on transport failure, HTTP error status or a body
    ///   that does not decode as the expected JSON
    /// - [`Error::InvalidResponse`] when the piece list is empty or the URL is malformed
    pub async fn validate(
        &self,
        area: &AreaOfInterest,
        product: &str,
        cancel: &CancellationToken,
    ) -> Result<Url> {
        let url = self.validation_url(area, product)?;
        info!(%area, product, "validating area of interest");

        let response = self.get(url, cancel).await?;
        let envelope: ValidationEnvelope =
            cancellable(cancel, async { Ok(response.json().await?) }).await?;
        let response = envelope.response;
        debug!(?response, "validation response");

        let Some(piece) = response.pieces.first() else {
            warn!(%area, product, status = response.status, "validation returned no pieces");
            return Err(Error::InvalidResponse(format!(
                "no data available for {area} (product {product})"
            )));
        };

        if response.pieces.len() > 1 {
            debug!(
                pieces = response.pieces.len(),
                "validation returned several pieces, using the first"
            );
        }

        Url::parse(piece.download_url.trim()).map_err(|e| {
            Error::InvalidResponse(format!(
                "invalid download URL {:?}: {e}",
                piece.download_url
            ))
        })
    }
}
