//! Fetch a landscape for a bounding box
//!
//! Usage:
//!
//! ```text
//! cargo run --example fetch_landscape -- WEST SOUTH EAST NORTH DESTINATION
//! cargo run --example fetch_landscape -- -114.0 45.0 -113.9 45.1 site.lcp
//! ```
//!
//! Honours `LCP_MAX_DOWNLOAD_TRIES`, `LCP_DOWNLOAD_WAIT`, `LCP_KEEP_ARCHIVE`
//! and `LANDFIRE_BASE_URL`. Ctrl+C cancels the acquisition.

use landscape_dl::{AreaOfInterest, Config, Event, LandscapeClient};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 5 {
        eprintln!("usage: fetch_landscape WEST SOUTH EAST NORTH DESTINATION");
        std::process::exit(2);
    }
    let edges: Vec<f64> = args[..4]
        .iter()
        .map(|a| a.parse::<f64>())
        .collect::<Result<_, _>>()?;
    let area = AreaOfInterest::new(edges[0], edges[1], edges[2], edges[3])?;
    let destination = &args[4];

    let client = LandscapeClient::new(Config::from_env()?)?;

    let mut events = client.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event {
                Event::Validated { product, .. } => {
                    println!("✓ Data available ({})", product);
                }
                Event::JobSubmitted { job, epsg } => {
                    println!("✓ Job {} submitted, output in EPSG:{}", job, epsg);
                }
                Event::StatusChanged {
                    status,
                    attempt,
                    max_attempts,
                    ..
                } => {
                    println!("… [{}/{}] status {}", attempt, max_attempts, status);
                }
                Event::Downloading { bytes, total, .. } => match total {
                    Some(total) => println!("⬇ {} / {} bytes", bytes, total),
                    None => println!("⬇ {} bytes", bytes),
                },
                Event::Extracted { files, .. } => {
                    for file in files {
                        println!("📦 {}", file.display());
                    }
                }
                Event::Completed { destination, .. } => {
                    println!("✓ Complete: {}", destination.display());
                }
                Event::Failed { error, .. } => {
                    eprintln!("✗ Failed: {}", error);
                }
            }
        }
    });

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let report = client.acquire_with_cancel(&area, destination, &cancel).await?;
    println!(
        "Job {} finished after {} status checks ({} files)",
        report.job.id(),
        report.attempts,
        report.files.len()
    );

    Ok(())
}
