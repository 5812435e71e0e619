//! Woolworths search scraper.
//!
//! Searches the site for a product name and fuzzy-matches the result
//! tiles. Woolworths tracks sessions aggressively, so every search runs
//! as a brand-new anonymous visitor: fresh session, rotated user-agent,
//! cleared cookies. Result tiles populate lazily while the page scrolls,
//! which is why the scroll dance below happens before extraction.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser::{
    fetch_rendered, random_user_agent, RenderClient, RenderError, RenderSession, WaitUntil,
};
use crate::config::Settings;
use crate::matching::select_best;
use crate::model::Candidate;

const SEARCH_PATH: &str = "/shop/search/products";

/// Scrapes Woolworths search results for price comparison.
pub struct WoolworthsScraper {
    client: Arc<dyn RenderClient>,
    session: Option<Box<dyn RenderSession>>,
    settings: Arc<Settings>,
}

impl WoolworthsScraper {
    pub fn new(client: Arc<dyn RenderClient>, settings: Arc<Settings>) -> Self {
        Self {
            client,
            session: None,
            settings,
        }
    }

    /// Drop the current session and open a fresh one with a new random
    /// user-agent and no cookies.
    async fn reset_session(&mut self) -> Result<(), RenderError> {
        if let Some(mut old) = self.session.take() {
            if let Err(e) = old.close().await {
                warn!(error = %e, "error closing previous search session");
            }
        }

        let user_agent = random_user_agent();
        let mut session = self
            .client
            .start_session(user_agent, self.settings.browser.viewport)
            .await?;
        session.clear_cookies().await?;
        debug!(user_agent, "opened fresh search session");
        self.session = Some(session);
        Ok(())
    }

    /// Search for a product and return the best-matching `(name, price)`.
    ///
    /// Any stage failure, and a below-threshold best candidate, yield
    /// `None`; the caller records the target side as not found.
    pub async fn search_and_match(&mut self, product_name: &str) -> Option<(String, String)> {
        let base_url = self.settings.sites.woolworths_base_url.clone();
        let threshold = self.settings.matching.threshold;
        let pacing = self.settings.pacing;
        let timeout = Duration::from_secs(self.settings.browser.navigation_timeout_secs);
        let search_url = build_search_url(&base_url, product_name);

        // A new search is a new anonymous visitor.
        if let Err(e) = self.reset_session().await {
            error!(error = %e, "failed to open search session");
            return None;
        }
        let session = self.session.as_mut()?;

        info!(query = product_name, "searching woolworths");
        if fetch_rendered(session.as_mut(), &search_url, WaitUntil::Load, timeout, &pacing)
            .await
            .is_none()
        {
            warn!(query = product_name, url = %search_url, "failed to load search results page");
            return None;
        }

        // Scroll down and back up so lazy-loaded tiles render.
        if let Err(e) = session
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
        {
            warn!(error = %e, "scroll to bottom failed");
        }
        tokio::time::sleep(Duration::from_secs(pacing.scroll_bottom_wait_secs)).await;
        if let Err(e) = session.evaluate("window.scrollTo(0, 0)").await {
            warn!(error = %e, "scroll to top failed");
        }
        tokio::time::sleep(Duration::from_secs(pacing.scroll_top_wait_secs)).await;

        // One randomized mouse move inside the viewport.
        let viewport = session.viewport();
        let (x, y) = {
            let mut rng = rand::rng();
            (
                rng.random_range(0.0..f64::from(viewport.width.max(1))),
                rng.random_range(0.0..f64::from(viewport.height.max(1))),
            )
        };
        if let Err(e) = session.move_mouse(x, y).await {
            warn!(error = %e, "mouse move failed");
        }

        let html = match session.content().await {
            Ok(html) => html,
            Err(e) => {
                error!(query = product_name, error = %e, "failed to read search results");
                return None;
            }
        };

        let candidates = extract_candidates(&html, &base_url);
        info!(query = product_name, count = candidates.len(), "extracted search candidates");

        match select_best(product_name, &candidates, threshold) {
            Some(best) => {
                info!(query = product_name, matched = %best.name, price = %best.price, "best match selected");
                Some((best.name.clone(), best.price.clone()))
            }
            None => {
                warn!(query = product_name, "no exact nor similar match on woolworths");
                None
            }
        }
    }

    /// Close the current session. Failures are logged and swallowed.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!(error = %e, "error closing search session");
            }
        }
    }
}

/// Build the full-text search URL for a product name.
pub fn build_search_url(base_url: &str, query: &str) -> String {
    format!(
        "{}{}?searchTerm={}",
        base_url.trim_end_matches('/'),
        SEARCH_PATH,
        quote_plus(query)
    )
}

/// Percent-encode a query, with spaces as `+`.
fn quote_plus(query: &str) -> String {
    urlencoding::encode(query).replace("%20", "+")
}

/// Extract product candidates from a rendered search-results page.
///
/// A tile missing any of name, price, or URL is dropped entirely rather
/// than emitted as a partial candidate, and one bad tile never stops the
/// rest from being read.
pub fn extract_candidates(html: &str, base_url: &str) -> Vec<Candidate> {
    let tile_selector = Selector::parse("wc-product-tile").unwrap();
    let link_selector = Selector::parse("a").unwrap();
    let image_selector = Selector::parse("img").unwrap();
    let price_selector = Selector::parse(".product-tile-price .primary").unwrap();

    let base = match Url::parse(base_url) {
        Ok(base) => base,
        Err(e) => {
            error!(base_url, error = %e, "invalid base URL for candidate extraction");
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let mut candidates = Vec::new();

    for (index, tile) in document.select(&tile_selector).enumerate() {
        let link = tile.select(&link_selector).next();

        let (name, href) = match link {
            Some(anchor) => {
                // Prefer the visible link text; fall back to the image
                // title when the tile renders the name as alt content.
                let mut name = collapsed_text(anchor);
                if name.is_empty() {
                    name = anchor
                        .select(&image_selector)
                        .next()
                        .and_then(|img| img.value().attr("title"))
                        .map(|title| title.trim().to_string())
                        .unwrap_or_default();
                }
                let href = anchor.value().attr("href").map(str::to_string);
                (name, href)
            }
            None => (String::new(), None),
        };

        let price = tile
            .select(&price_selector)
            .next()
            .map(collapsed_text)
            .filter(|price| !price.is_empty());

        match (name.is_empty(), href, price) {
            (false, Some(href), Some(price)) => match base.join(&href) {
                Ok(resolved) => candidates.push(Candidate {
                    name,
                    price,
                    url: resolved.to_string(),
                }),
                Err(e) => {
                    warn!(tile = index, href = %href, error = %e, "dropping tile with unresolvable URL");
                }
            },
            _ => {
                warn!(tile = index, "dropping tile with missing name, URL, or price");
            }
        }
    }

    candidates
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

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.woolworths.com.au";

    #[test]
    fn search_url_is_quote_plus_encoded() {
        let url = build_search_url(BASE, "Palmolive Naturals Shampoo 350ml");
        assert_eq!(
            url,
            "https://www.woolworths.com.au/shop/search/products?searchTerm=Palmolive+Naturals+Shampoo+350ml"
        );
    }

    #[test]
    fn search_url_escapes_reserved_characters() {
        let url = build_search_url(BASE, "Cadbury Dairy Milk & Oreo 180g");
        assert!(url.ends_with("searchTerm=Cadbury+Dairy+Milk+%26+Oreo+180g"));
    }

    #[test]
    fn extracts_complete_tiles() {
        let html = r#"
            <wc-product-tile>
                <a href="/shop/productdetails/123/palmolive-naturals-shampoo">
                    Palmolive Naturals Shampoo 350mL
                </a>
                <div class="product-tile-price"><span class="primary">$4.00</span></div>
            </wc-product-tile>
            <wc-product-tile>
                <a href="/shop/productdetails/456/palmolive-conditioner">
                    Palmolive Naturals Conditioner 350mL
                </a>
                <div class="product-tile-price"><span class="primary">$4.50</span></div>
            </wc-product-tile>
        "#;
        let candidates = extract_candidates(html, BASE);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Palmolive Naturals Shampoo 350mL");
        assert_eq!(candidates[0].price, "$4.00");
        assert_eq!(
            candidates[0].url,
            "https://www.woolworths.com.au/shop/productdetails/123/palmolive-naturals-shampoo"
        );
    }

    #[test]
    fn tile_missing_price_is_dropped() {
        let html = r#"
            <wc-product-tile>
                <a href="/shop/productdetails/123/a">Product A</a>
            </wc-product-tile>
            <wc-product-tile>
                <a href="/shop/productdetails/456/b">Product B</a>
                <div class="product-tile-price"><span class="primary">$2.00</span></div>
            </wc-product-tile>
        "#;
        let candidates = extract_candidates(html, BASE);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Product B");
    }

    #[test]
    fn tile_without_link_is_dropped() {
        let html = r#"
            <wc-product-tile>
                <div class="product-tile-price"><span class="primary">$2.00</span></div>
            </wc-product-tile>
        "#;
        assert!(extract_candidates(html, BASE).is_empty());
    }

    #[test]
    fn empty_link_text_falls_back_to_image_title() {
        let html = r#"
            <wc-product-tile>
                <a href="/shop/productdetails/789/c">
                    <img src="/images/c.jpg" title="  Twisties Party Bag Cheese 270g  ">
                </a>
                <div class="product-tile-price"><span class="primary">$3.00</span></div>
            </wc-product-tile>
        "#;
        let candidates = extract_candidates(html, BASE);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Twisties Party Bag Cheese 270g");
    }

    #[test]
    fn absolute_hrefs_pass_through_join() {
        let html = r#"
            <wc-product-tile>
                <a href="https://cdn.woolworths.com.au/p/1">Product</a>
                <div class="product-tile-price"><span class="primary">$1.00</span></div>
            </wc-product-tile>
        "#;
        let candidates = extract_candidates(html, BASE);
        assert_eq!(candidates[0].url, "https://cdn.woolworths.com.au/p/1");
    }

    #[test]
    fn no_tiles_means_no_candidates() {
        assert!(extract_candidates("<html><body></body></html>", BASE).is_empty());
    }
}
