//! pricecross - cross-retailer shelf price comparison scraper.
//!
//! Scrapes product pages for a fixed set of SKUs from The Reject Shop,
//! searches Woolworths for each product by name, fuzzy-matches the search
//! results, and writes a price-comparison report.

pub mod browser;
pub mod cli;
pub mod config;
pub mod matching;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod sites;
pub mod skus;
