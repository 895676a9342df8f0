//! Submits an archive, waits for the scan, and prints the summary.
//!
//! This example shows how to:
//! - Configure and build an `OsaClient`
//! - Run a full scan with Ctrl-C cancellation
//! - Inspect the returned summary and errors
//!
//! Run with:
//!
//! ```text
//! OSA_URL=https://cx.example.com OSA_USER=admin OSA_PASSWORD=secret \
//!     cargo run --example submit_scan -- 42 target/sources.zip
//! ```

use osabridge::prelude::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(project_id), Some(archive)) = (args.next(), args.next()) else {
        eprintln!("usage: submit_scan <project-id> <archive.zip>");
        std::process::exit(2);
    };

    let config = ClientConfig::new(std::env::var("OSA_URL")?)?
        .with_timeout(Duration::from_secs(120))
        .with_poll(PollConfig::new().with_max_attempts(720));
    let credentials = Credentials::new(std::env::var("OSA_USER")?, std::env::var("OSA_PASSWORD")?);
    let client = OsaClient::new(config, credentials)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let submission = ScanSubmission::new(project_id, archive);
    let result = client.scan_and_summarize(&submission, &cancel).await;
    client.close();

    match result {
        Ok(summary) => {
            println!("Total libraries:      {:?}", summary.total_libraries());
            println!("Vulnerable libraries: {}", summary.vulnerable_libraries());
            println!("Score:                {:?}", summary.vulnerability_score());
            if summary.has_high_severity() {
                println!("High severity vulnerabilities found");
            }
            Ok(())
        }
        Err(OsaError::Cancelled) => {
            println!("Cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
