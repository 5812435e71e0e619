//! The comparison orchestrator.
//!
//! Drives the SKU batch through both site scrapers, one SKU at a time:
//! scrape the source detail page, search the target site for the product
//! name, fold both into a comparison record. Periodically tears the
//! shared browser down and back up so per-process tracking state does
//! not accumulate across the batch.

use std::sync::Arc;

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::browser::RenderClient;
use crate::config::Settings;
use crate::model::{ComparisonRecord, ProductRecord, DELTA_UNAVAILABLE, TARGET_NOT_FOUND};
use crate::sites::{RejectShopScraper, WoolworthsScraper};
use crate::skus::SkuDirectory;

/// Everything a comparison run produced.
#[derive(Debug, Default)]
pub struct ComparisonOutcome {
    /// Every successfully scraped source-site product.
    pub products: Vec<ProductRecord>,
    /// One comparison per scraped product, including unmatched ones.
    pub comparisons: Vec<ComparisonRecord>,
}

/// Sequential comparison run over a SKU batch.
pub struct ComparisonPipeline {
    client: Arc<dyn RenderClient>,
    directory: SkuDirectory,
    settings: Arc<Settings>,
}

impl ComparisonPipeline {
    pub fn new(
        client: Arc<dyn RenderClient>,
        directory: SkuDirectory,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            client,
            directory,
            settings,
        }
    }

    /// Process the SKU batch.
    ///
    /// Per-SKU failures are logged and skipped; they never abort the
    /// batch. Both sessions and the shared browser are torn down on every
    /// exit path.
    pub async fn run(&self, skus: &[String], progress: Option<&ProgressBar>) -> ComparisonOutcome {
        let mut source = RejectShopScraper::new(
            self.client.clone(),
            self.directory.clone(),
            self.settings.clone(),
        );
        let mut target = WoolworthsScraper::new(self.client.clone(), self.settings.clone());

        let mut outcome = ComparisonOutcome::default();
        self.process_all(&mut source, &mut target, skus, progress, &mut outcome)
            .await;

        source.close().await;
        target.close().await;
        if let Err(e) = self.client.shutdown().await {
            warn!(error = %e, "error shutting down the shared browser");
        }

        info!(
            products = outcome.products.len(),
            comparisons = outcome.comparisons.len(),
            "comparison run finished"
        );
        outcome
    }

    async fn process_all(
        &self,
        source: &mut RejectShopScraper,
        target: &mut WoolworthsScraper,
        skus: &[String],
        progress: Option<&ProgressBar>,
        outcome: &mut ComparisonOutcome,
    ) {
        let reset_every = self.settings.anti_bot.reset_every.max(1);
        let mut since_reset = 0usize;

        for sku in skus {
            if since_reset >= reset_every {
                // Sessions must be gone before the process they point at.
                info!("restarting the shared browser to reset anti-bot tracking");
                source.close().await;
                target.close().await;
                if let Err(e) = self.client.shutdown().await {
                    warn!(error = %e, "browser restart did not shut down cleanly");
                }
                since_reset = 0;
            }

            if let Some(product) = source.scrape_by_sku(sku).await {
                let matched = target.search_and_match(&product.name).await;
                outcome
                    .comparisons
                    .push(build_comparison(sku, &product, matched));
                outcome.products.push(product);
            } else {
                info!(sku = %sku, "skipping SKU: no product data");
            }

            since_reset += 1;
            if let Some(bar) = progress {
                bar.inc(1);
            }
        }
    }
}

/// Fold a source product and an optional target match into one record.
fn build_comparison(
    sku: &str,
    product: &ProductRecord,
    matched: Option<(String, String)>,
) -> ComparisonRecord {
    let (target_name, target_price) = match matched {
        Some((name, price)) => (Some(name), price),
        None => (None, TARGET_NOT_FOUND.to_string()),
    };
    let price_delta = price_delta(&product.price, &target_price);

    ComparisonRecord {
        sku: sku.to_string(),
        source_name: product.name.clone(),
        source_price: product.price.clone(),
        target_name,
        target_price,
        price_delta,
        observed: product.observed.clone(),
    }
}

/// Absolute price difference as "$X.YZ", or "N/A" when either side has
/// no parseable currency value.
pub fn price_delta(a: &str, b: &str) -> String {
    match (parse_currency(a), parse_currency(b)) {
        (Some(x), Some(y)) => format!("${:.2}", (x - y).abs()),
        _ => DELTA_UNAVAILABLE.to_string(),
    }
}

/// A value counts as currency only when it carries a "$".
fn parse_currency(value: &str) -> Option<f64> {
    if !value.contains('$') {
        return None;
    }
    value.replace('$', "").trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_absolute_and_symmetric() {
        assert_eq!(price_delta("$3.45", "$4.00"), "$0.55");
        assert_eq!(price_delta("$4.00", "$3.45"), "$0.55");
        assert_eq!(price_delta("$2.50", "$2.50"), "$0.00");
    }

    #[test]
    fn delta_formats_two_decimals() {
        assert_eq!(price_delta("$1", "$3"), "$2.00");
        assert_eq!(price_delta("$1.5", "$1.25"), "$0.25");
    }

    #[test]
    fn missing_dollar_sign_is_not_currency() {
        assert_eq!(price_delta("3.45", "$4.00"), "N/A");
        assert_eq!(price_delta("$3.45", "4.00"), "N/A");
    }

    #[test]
    fn sentinels_and_garbage_yield_na() {
        assert_eq!(price_delta("Price Not Found", "$4.00"), "N/A");
        assert_eq!(price_delta("$3.45", "Not Found"), "N/A");
        assert_eq!(price_delta("$3.45 ea", "$4.00"), "N/A");
        assert_eq!(price_delta("", ""), "N/A");
    }

    #[test]
    fn unmatched_comparison_gets_sentinels() {
        let product = ProductRecord {
            sku: "30113527".to_string(),
            name: "Whiskas Jellymeat 400g".to_string(),
            price: "$2.50".to_string(),
            observed: "2026-08-07".to_string(),
        };
        let record = build_comparison("30113527", &product, None);
        assert_eq!(record.target_name, None);
        assert_eq!(record.target_price, TARGET_NOT_FOUND);
        assert_eq!(record.price_delta, DELTA_UNAVAILABLE);
        assert_eq!(record.source_price, "$2.50");
    }

    #[test]
    fn matched_comparison_computes_delta() {
        let product = ProductRecord {
            sku: "30061292".to_string(),
            name: "Palmolive Naturals Shampoo 350ml".to_string(),
            price: "$3.45".to_string(),
            observed: "2026-08-07".to_string(),
        };
        let record = build_comparison(
            "30061292",
            &product,
            Some((
                "Palmolive Naturals Shampoo 350mL".to_string(),
                "$4.00".to_string(),
            )),
        );
        assert_eq!(record.target_price, "$4.00");
        assert_eq!(record.price_delta, "$0.55");
        assert_eq!(
            record.target_name.as_deref(),
            Some("Palmolive Naturals Shampoo 350mL")
        );
    }
}
