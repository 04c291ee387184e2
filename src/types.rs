//! Core types for landscape-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Smallest accepted side length of an area of interest, in degrees
pub const MIN_AREA_SIDE_DEGREES: f64 = 0.001;

/// Rectangular geographic bounding box (WGS84 degrees)
///
/// Edges are stored in west, south, east, north order and never change after
/// construction. The remote service is the authority on whether the area has
/// data; [`AreaOfInterest::new`] only rejects boxes that cannot be requested at all.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
}

impl AreaOfInterest {
    /// Create a new area from its four edges
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArea`] when an edge is not finite, out of
    /// geographic range, the edges are inverted, or either side is smaller
    /// than [`MIN_AREA_SIDE_DEGREES`].
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        for (name, value) in [
            ("west", west),
            ("south", south),
            ("east", east),
            ("north", north),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidArea(format!("{name} edge is not finite")));
            }
        }

        if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            return Err(Error::InvalidArea(format!(
                "longitude out of range: west={west}, east={east}"
            )));
        }
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err(Error::InvalidArea(format!(
                "latitude out of range: south={south}, north={north}"
            )));
        }
        if west >= east || south >= north {
            return Err(Error::InvalidArea(format!(
                "edges inverted: west={west}, south={south}, east={east}, north={north}"
            )));
        }
        if east - west < MIN_AREA_SIDE_DEGREES || north - south < MIN_AREA_SIDE_DEGREES {
            return Err(Error::InvalidArea(format!(
                "bounding box too small, must be greater than {MIN_AREA_SIDE_DEGREES} x {MIN_AREA_SIDE_DEGREES} degrees"
            )));
        }

        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    // Caller guarantees the edges are well-formed
    pub(crate) const fn from_edges(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Western edge (minimum longitude)
    pub fn west(&self) -> f64 {
        self.west
    }

    /// Southern edge (minimum latitude)
    pub fn south(&self) -> f64 {
        self.south
    }

    /// Eastern edge (maximum longitude)
    pub fn east(&self) -> f64 {
        self.east
    }

    /// Northern edge (maximum latitude)
    pub fn north(&self) -> f64 {
        self.north
    }

    /// Centre point as `(lon, lat)`
    pub fn center(&self) -> (f64, f64) {
        (
            self.west + (self.east - self.west) / 2.0,
            self.south + (self.north - self.south) / 2.0,
        )
    }

    /// True when this area lies entirely inside `other`
    pub fn is_within(&self, other: &AreaOfInterest) -> bool {
        self.west >= other.west
            && self.east <= other.east
            && self.south >= other.south
            && self.north <= other.north
    }
}

impl std::fmt::Display for AreaOfInterest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[w={}, s={}, e={}, n={}]",
            self.west, self.south, self.east, self.north
        )
    }
}

/// Opaque job identifier issued by the extraction service
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic phase of a server-reported status code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Request received (100)
    Received,
    /// Processing initiated (200)
    Initiated,
    /// Extraction in progress (210)
    Extracting,
    /// Packaging results (390)
    Finishing,
    /// Artifact ready for download (400)
    Ready,
    /// Server-side extraction failed (900)
    ExtractionError,
}

impl Phase {
    /// Human-readable phase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Received => "received",
            Phase::Initiated => "initiated",
            Phase::Extracting => "extracting",
            Phase::Finishing => "finishing",
            Phase::Ready => "ready",
            Phase::ExtractionError => "extraction error",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status code reported by the extraction service
///
/// Any code at or above [`StatusCode::READY`] is terminal; only `READY` itself
/// means success. Codes outside the known vocabulary are kept as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// Request received
    pub const RECEIVED: StatusCode = StatusCode(100);
    /// Processing initiated
    pub const INITIATED: StatusCode = StatusCode(200);
    /// Extraction in progress
    pub const EXTRACTING: StatusCode = StatusCode(210);
    /// Packaging results
    pub const FINISHING: StatusCode = StatusCode(390);
    /// Artifact ready (the only successful terminal code)
    pub const READY: StatusCode = StatusCode(400);
    /// Server-side extraction failure
    pub const EXTRACTION_ERROR: StatusCode = StatusCode(900);

    /// Map the code to its phase, if it is part of the known vocabulary
    pub fn phase(&self) -> Option<Phase> {
        match self.0 {
            100 => Some(Phase::Received),
            200 => Some(Phase::Initiated),
            210 => Some(Phase::Extracting),
            390 => Some(Phase::Finishing),
            400 => Some(Phase::Ready),
            900 => Some(Phase::ExtractionError),
            _ => None,
        }
    }

    /// Phase name, or "unknown" for unmapped codes
    pub fn phase_name(&self) -> &'static str {
        self.phase().map_or("unknown", |p| p.as_str())
    }

    /// Polling stops once a terminal code is observed
    pub fn is_terminal(&self) -> bool {
        *self >= Self::READY
    }

    /// True only for [`StatusCode::READY`]
    pub fn is_success(&self) -> bool {
        *self == Self::READY
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.phase_name())
    }
}

impl std::str::FromStr for StatusCode {
    type Err = Error;

    /// Parse a status value; the first comma-separated field is the code
    fn from_str(s: &str) -> Result<Self> {
        let first = s.split(',').next().unwrap_or_default().trim();
        first.parse::<i32>().map(StatusCode).map_err(|_| {
            Error::InvalidResponse(format!("status value is not an integer: {:?}", s))
        })
    }
}

/// One asynchronous extraction job, owned by a single acquisition run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    /// When the job identifier was issued
    pub submitted_at: DateTime<Utc>,
    /// Last status code observed while polling
    pub last_status: Option<StatusCode>,
    artifact_url: Option<String>,
}

impl Job {
    /// Start tracking a freshly issued job
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            submitted_at: Utc::now(),
            last_status: None,
            artifact_url: None,
        }
    }

    /// Job identifier
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Final artifact URL, once the job reached the ready phase
    pub fn artifact_url(&self) -> Option<&str> {
        self.artifact_url.as_deref()
    }

    /// Record the artifact URL
    ///
    /// # Errors
    ///
    /// The URL is set once, and only after a successful terminal status.
    pub fn set_artifact_url(&mut self, url: impl Into<String>) -> Result<()> {
        if self.artifact_url.is_some() {
            return Err(Error::InvalidResponse(format!(
                "artifact URL for job {} already set",
                self.id
            )));
        }
        if !self.last_status.is_some_and(|s| s.is_success()) {
            return Err(Error::InvalidResponse(format!(
                "job {} is not ready (last status: {:?})",
                self.id, self.last_status
            )));
        }
        self.artifact_url = Some(url.into());
        Ok(())
    }
}

/// Result of a successful acquisition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquisitionReport {
    /// The job that produced the data
    pub job: Job,
    /// Product code that was requested
    pub product: String,
    /// EPSG code pinned on the output
    pub epsg: u32,
    /// Number of status queries issued
    pub attempts: u32,
    /// Files written beside the destination path
    pub files: Vec<PathBuf>,
    /// Scratch archive, when it was kept
    pub archive: Option<PathBuf>,
}

/// Progress events emitted during an acquisition
///
/// Subscribe via [`LandscapeClient::subscribe()`](crate::LandscapeClient::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The service confirmed data exists for the area
    Validated {
        /// Area that was validated
        area: AreaOfInterest,
        /// Product code
        product: String,
        /// Job artifact URL returned by validation
        url: String,
    },

    /// A job identifier was issued
    JobSubmitted {
        /// Job identifier
        job: JobId,
        /// EPSG code pinned on the output
        epsg: u32,
    },

    /// A status query returned
    StatusChanged {
        /// Job identifier
        job: JobId,
        /// Reported code
        status: StatusCode,
        /// 1-based attempt number
        attempt: u32,
        /// Attempt budget
        max_attempts: u32,
    },

    /// Artifact transfer progress
    Downloading {
        /// Job identifier
        job: JobId,
        /// Bytes written so far
        bytes: u64,
        /// Total size, when the server reported one
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },

    /// Archive entries were written to disk
    Extracted {
        /// Job identifier
        job: JobId,
        /// Output files
        files: Vec<PathBuf>,
    },

    /// Acquisition finished successfully
    Completed {
        /// Job identifier
        job: JobId,
        /// Destination path requested by the caller
        destination: PathBuf,
    },

    /// Acquisition failed
    Failed {
        /// Job identifier, if one had been issued
        #[serde(skip_serializing_if = "Option::is_none")]
        job: Option<JobId>,
        /// Error message
        error: String,
    },
}
