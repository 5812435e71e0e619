//! CLI parser and command dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::browser::{ChromiumClient, ChromiumOptions, RenderClient};
use crate::config::Settings;
use crate::output::append_records;
use crate::pipeline::ComparisonPipeline;
use crate::skus::{load_skus, SkuDirectory};

#[derive(Parser)]
#[command(name = "pricecross")]
#[command(about = "Cross-retailer shelf price comparison scraper")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./pricecross.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the SKU list and write both result files
    Run {
        /// SKU list file (newline-delimited, blank lines ignored)
        #[arg(short, long)]
        skus: Option<PathBuf>,

        /// Stop after this many SKUs (0 = all)
        #[arg(short, long, default_value = "0")]
        limit: usize,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// Minimum similarity score (0-100) to accept a match
        #[arg(long)]
        threshold: Option<f64>,

        /// Restart the browser after this many SKUs
        #[arg(long)]
        reset_every: Option<usize>,
    },

    /// Print the built-in SKU to product URL directory
    Skus,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            skus,
            limit,
            headed,
            threshold,
            reset_every,
        } => {
            run_comparison(
                cli.config.as_deref(),
                skus,
                limit,
                headed,
                threshold,
                reset_every,
            )
            .await
        }
        Commands::Skus => {
            for (sku, url) in SkuDirectory::builtin().entries() {
                println!("{sku}  {url}");
            }
            Ok(())
        }
    }
}

async fn run_comparison(
    config: Option<&std::path::Path>,
    skus_path: Option<PathBuf>,
    limit: usize,
    headed: bool,
    threshold: Option<f64>,
    reset_every: Option<usize>,
) -> anyhow::Result<()> {
    let mut settings = Settings::load(config)?;
    if headed {
        settings.browser.headless = false;
    }
    if let Some(threshold) = threshold {
        settings.matching.threshold = threshold;
    }
    if let Some(reset_every) = reset_every {
        settings.anti_bot.reset_every = reset_every;
    }

    let skus_file = skus_path.unwrap_or_else(|| settings.skus_path.clone());
    let Some(mut skus) = load_skus(&skus_file) else {
        anyhow::bail!("SKU list not found: {}", skus_file.display());
    };
    if skus.is_empty() {
        info!(path = %skus_file.display(), "no SKUs found; nothing to do");
        return Ok(());
    }
    if limit > 0 && skus.len() > limit {
        skus.truncate(limit);
    }

    let client: Arc<dyn RenderClient> = Arc::new(ChromiumClient::new(ChromiumOptions {
        headless: settings.browser.headless,
        chrome_args: settings.browser.chrome_args.clone(),
    }));
    let settings = Arc::new(settings);
    let pipeline = ComparisonPipeline::new(client, SkuDirectory::builtin(), settings.clone());

    let progress = ProgressBar::new(skus.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} [{bar:40}] {pos}/{len} SKUs")?
            .progress_chars("=> "),
    );

    let outcome = pipeline.run(&skus, Some(&progress)).await;
    progress.finish_and_clear();

    append_records(&outcome.products, &settings.output.products_path)?;
    append_records(&outcome.comparisons, &settings.output.comparisons_path)?;

    println!(
        "{} products scraped, {} comparisons written ({}, {})",
        outcome.products.len(),
        outcome.comparisons.len(),
        settings.output.products_path.display(),
        settings.output.comparisons_path.display(),
    );
    Ok(())
}
