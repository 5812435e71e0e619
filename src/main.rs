//! pricecross - cross-retailer shelf price comparison scraper.
//!
//! Scrapes product prices for a fixed SKU list from The Reject Shop and
//! cross-references each product on Woolworths via full-text search and
//! fuzzy name matching.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if pricecross::cli::is_verbose() {
        "pricecross=debug"
    } else {
        "pricecross=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    pricecross::cli::run().await
}
