//! Data model for scraped products and price comparisons.
//!
//! The serde field names match the report format consumed downstream,
//! so renames here are breaking changes.

use serde::{Deserialize, Serialize};

/// Placeholder when a detail page has no product title node.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Placeholder when a detail page has no SKU node.
pub const SKU_NOT_FOUND: &str = "SKU Not Found";

/// Placeholder when a detail page has no price node.
pub const PRICE_NOT_FOUND: &str = "Price Not Found";

/// Placeholder for the target price when no search candidate matched.
pub const TARGET_NOT_FOUND: &str = "Not Found";

/// Placeholder for the delta when either price has no parseable value.
pub const DELTA_UNAVAILABLE: &str = "N/A";

/// One product scraped from a source-site detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// SKU as extracted from the page (may be a sentinel).
    #[serde(rename = "SKU")]
    pub sku: String,

    #[serde(rename = "Product Name")]
    pub name: String,

    /// Currency-formatted display price, e.g. "$3.45".
    #[serde(rename = "Price")]
    pub price: String,

    /// Observation date, YYYY-MM-DD.
    #[serde(rename = "Date")]
    pub observed: String,
}

/// One product tile extracted from a search-results page.
///
/// Ephemeral: produced per search in page render order and discarded
/// after matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub price: String,
    /// Absolute product URL.
    pub url: String,
}

/// Source product folded together with its best target-site match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// The requested SKU (not the one extracted from the page).
    #[serde(rename = "SKU")]
    pub sku: String,

    #[serde(rename = "Product Name The Reject Shop")]
    pub source_name: String,

    #[serde(rename = "Price_RejectShop")]
    pub source_price: String,

    /// Matched candidate name, or null when nothing cleared the threshold.
    #[serde(rename = "Product Name Woolworths")]
    pub target_name: Option<String>,

    /// Matched candidate price, or the "Not Found" sentinel.
    #[serde(rename = "Price_Woolworths")]
    pub target_price: String,

    /// "$X.YZ" absolute difference, or "N/A" when either price is
    /// unparseable.
    #[serde(rename = "Price Difference")]
    pub price_delta: String,

    #[serde(rename = "Date")]
    pub observed: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_record_uses_report_field_names() {
        let record = ProductRecord {
            sku: "30061292".to_string(),
            name: "Palmolive Naturals Shampoo 350ml".to_string(),
            price: "$3.45".to_string(),
            observed: "2026-08-07".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["SKU"], "30061292");
        assert_eq!(value["Product Name"], "Palmolive Naturals Shampoo 350ml");
        assert_eq!(value["Price"], "$3.45");
        assert_eq!(value["Date"], "2026-08-07");
    }

    #[test]
    fn unmatched_comparison_serializes_null_name() {
        let record = ComparisonRecord {
            sku: "30113527".to_string(),
            source_name: "Whiskas Jellymeat 400g".to_string(),
            source_price: "$2.50".to_string(),
            target_name: None,
            target_price: TARGET_NOT_FOUND.to_string(),
            price_delta: DELTA_UNAVAILABLE.to_string(),
            observed: "2026-08-07".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["Product Name Woolworths"].is_null());
        assert_eq!(value["Price_Woolworths"], "Not Found");
        assert_eq!(value["Price Difference"], "N/A");
    }
}
