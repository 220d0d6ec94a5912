//! PKKacquire - Inaportnet vessel-call acquisition system.
//!
//! Scrapes PKK (port clearance) documents from the Inaportnet monitoring
//! portal, normalizes them into flat records and loads them into a cloud
//! warehouse.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pkkacquire::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "pkkacquire=info"
    } else {
        "pkkacquire=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
