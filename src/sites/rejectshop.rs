//! The Reject Shop detail-page scraper.
//!
//! Selectors were determined by inspecting the rendered product pages;
//! the jsx-* class hashes churn between deploys, so selectors key on the
//! stable class names only.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, warn};

use crate::browser::{
    fetch_rendered, random_user_agent, RenderClient, RenderError, RenderSession, WaitUntil,
};
use crate::config::Settings;
use crate::model::{ProductRecord, PRICE_NOT_FOUND, SKU_NOT_FOUND, UNKNOWN_PRODUCT};
use crate::skus::SkuDirectory;

/// Scrapes product detail pages from The Reject Shop.
pub struct RejectShopScraper {
    client: Arc<dyn RenderClient>,
    session: Option<Box<dyn RenderSession>>,
    directory: SkuDirectory,
    settings: Arc<Settings>,
}

impl RejectShopScraper {
    pub fn new(
        client: Arc<dyn RenderClient>,
        directory: SkuDirectory,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            client,
            session: None,
            directory,
            settings,
        }
    }

    async fn ensure_session(&mut self) -> Result<(), RenderError> {
        if self.session.is_none() {
            let user_agent = random_user_agent();
            let session = self
                .client
                .start_session(user_agent, self.settings.browser.viewport)
                .await?;
            debug!(user_agent, "opened source-site session");
            self.session = Some(session);
        }
        Ok(())
    }

    /// Scrape the detail page for one SKU.
    ///
    /// Returns `None` when the SKU is unmapped or the page cannot be
    /// fetched; each failure is logged and the caller moves on.
    pub async fn scrape_by_sku(&mut self, sku: &str) -> Option<ProductRecord> {
        let url = match self.directory.resolve(sku) {
            Some(url) => url.to_string(),
            None => {
                error!(sku, "SKU is not mapped to a product URL");
                return None;
            }
        };
        info!(sku, url = %url, "scraping product page");

        if let Err(e) = self.ensure_session().await {
            error!(sku, error = %e, "failed to open browser session");
            return None;
        }

        let pacing = self.settings.pacing;
        let timeout = Duration::from_secs(self.settings.browser.navigation_timeout_secs);
        let session = self.session.as_mut()?;

        let html = fetch_rendered(session.as_mut(), &url, WaitUntil::Load, timeout, &pacing).await?;
        let record = parse_detail_page(&html, sku);
        info!(sku, name = %record.name, price = %record.price, "scraped product");
        Some(record)
    }

    /// Close the current session. Failures are logged and swallowed so
    /// cleanup never aborts an in-progress batch.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!(error = %e, "error closing source-site session");
            }
        }
    }
}

/// Parse a product detail page into a record.
///
/// Missing nodes degrade to sentinel values rather than failing the
/// record. `expected_sku` is only cross-checked for logging; the
/// extracted SKU is what lands in the record.
pub fn parse_detail_page(html: &str, expected_sku: &str) -> ProductRecord {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse(r#"h1[data-testid="product-title"]"#).unwrap();
    let name = document
        .select(&title_selector)
        .next()
        .map(collapsed_text)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());
    debug!(name = %name, "extracted product name");

    let sku_selector = Selector::parse("p.pdp-sku.except-phone").unwrap();
    let sku = document
        .select(&sku_selector)
        .next()
        .map(|el| collapsed_text(el).replace("SKU:", "").trim().to_string())
        .filter(|sku| !sku.is_empty())
        .unwrap_or_else(|| SKU_NOT_FOUND.to_string());
    debug!(sku = %sku, "extracted SKU");

    // Price is rendered as separate spans ("$", "3", ".45"); concatenate
    // the stripped segments.
    let price_selector = Selector::parse("div.product-price").unwrap();
    let price = document
        .select(&price_selector)
        .next()
        .map(concatenated_text)
        .filter(|price| !price.is_empty())
        .unwrap_or_else(|| PRICE_NOT_FOUND.to_string());
    debug!(price = %price, "extracted product price");

    if sku != expected_sku {
        warn!(
            expected = expected_sku,
            extracted = %sku,
            "extracted SKU differs from the requested one"
        );
    }

    ProductRecord {
        sku,
        name,
        price,
        observed: Local::now().format("%Y-%m-%d").to_string(),
    }
}

/// Element text with whitespace runs collapsed to single spaces.
fn collapsed_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Element text with each segment stripped and joined without separators.
fn concatenated_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_PAGE: &str = r#"
        <html><body>
            <h1 data-testid="product-title">Palmolive Naturals Shampoo 350ml</h1>
            <p class="jsx-ac1f85233799a587 pdp-sku except-phone">SKU: 30061292</p>
            <div class="jsx-c5b8eb4ab4d5ad55 product-price">
                <span>$</span><span>3</span><span>.45</span>
            </div>
        </body></html>
    "#;

    #[test]
    fn parses_complete_detail_page() {
        let record = parse_detail_page(DETAIL_PAGE, "30061292");
        assert_eq!(record.name, "Palmolive Naturals Shampoo 350ml");
        assert_eq!(record.sku, "30061292");
        assert_eq!(record.price, "$3.45");
        // YYYY-MM-DD
        assert_eq!(record.observed.len(), 10);
        assert_eq!(record.observed.matches('-').count(), 2);
    }

    #[test]
    fn missing_title_yields_unknown_product() {
        let html = r#"<html><body>
            <p class="pdp-sku except-phone">SKU: 30061292</p>
            <div class="product-price"><span>$1.00</span></div>
        </body></html>"#;
        let record = parse_detail_page(html, "30061292");
        assert_eq!(record.name, UNKNOWN_PRODUCT);
        assert_eq!(record.price, "$1.00");
    }

    #[test]
    fn missing_sku_and_price_yield_sentinels() {
        let html = r#"<html><body>
            <h1 data-testid="product-title">Whiskas Jellymeat 400g</h1>
        </body></html>"#;
        let record = parse_detail_page(html, "30113527");
        assert_eq!(record.sku, SKU_NOT_FOUND);
        assert_eq!(record.price, PRICE_NOT_FOUND);
    }

    #[test]
    fn empty_markup_yields_all_sentinels() {
        for html in ["", "<html></html>", "not html at all <<<"] {
            let record = parse_detail_page(html, "30061292");
            assert_eq!(record.name, UNKNOWN_PRODUCT);
            assert_eq!(record.sku, SKU_NOT_FOUND);
            assert_eq!(record.price, PRICE_NOT_FOUND);
        }
    }

    #[test]
    fn extracted_sku_is_kept_over_expected() {
        let html = r#"<html><body>
            <p class="pdp-sku except-phone">SKU: 11111111</p>
        </body></html>"#;
        let record = parse_detail_page(html, "30061292");
        assert_eq!(record.sku, "11111111");
    }
}
