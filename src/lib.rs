//! # landscape-dl
//!
//! Async client for a LANDFIRE-style landscape raster extraction service.
//!
//! Given a bounding box and a destination path, the client asks the service
//! whether data exists for the area, submits an extraction job, polls it until
//! the service reports a terminal status, downloads the resulting ZIP and
//! writes each archive entry beside the destination, named after the
//! destination's stem with the entry's own extension.
//!
//! ## Quick Start
//!
//! ```no_run
//! use landscape_dl::{AreaOfInterest, Config, LandscapeClient};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LandscapeClient::new(Config::from_env()?)?;
//!
//!     // Subscribe to events
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         loop {
//!             match events.recv().await {
//!                 Ok(event) => println!("Event: {:?}", event),
//!                 Err(RecvError::Lagged(_)) => continue,
//!                 Err(RecvError::Closed) => break,
//!             }
//!         }
//!     });
//!
//!     let area = AreaOfInterest::new(-114.0, 45.0, -113.9, 45.1)?;
//!     let report = client.acquire(&area, "/data/site.lcp").await?;
//!     println!("wrote {:?}", report.files);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Acquisition orchestration
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Artifact download and archive fan-out
pub mod extraction;
/// Bounded job status polling
pub mod poller;
/// Product catalog and projection selection
pub mod product;
/// Extraction service endpoints
pub mod service;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use client::LandscapeClient;
pub use config::{Config, OutputConfig, PollConfig, ServiceConfig, ValidationConfig};
pub use error::{Error, Result};
pub use poller::{PollReport, StatusSource};
pub use product::{FuelModel, Product, Region};
pub use service::ServiceClient;
pub use types::{AcquisitionReport, AreaOfInterest, Event, Job, JobId, Phase, StatusCode};

use std::path::Path;

/// Acquire a landscape with configuration taken from the environment
///
/// Shorthand for [`Config::from_env`], [`LandscapeClient::new`] and
/// [`LandscapeClient::acquire`].
pub async fn acquire(
    area: &AreaOfInterest,
    destination: impl AsRef<Path>,
) -> Result<AcquisitionReport> {
    LandscapeClient::new(Config::from_env()?)?
        .acquire(area, destination)
        .await
}
