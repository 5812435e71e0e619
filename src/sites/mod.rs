//! Site-specific scraping strategies.
//!
//! One module per retailer, each built on the shared render-session
//! capability: the source site yields product detail records by SKU, the
//! target site yields best-match prices by product name.

pub mod rejectshop;
pub mod woolworths;

pub use rejectshop::RejectShopScraper;
pub use woolworths::WoolworthsScraper;
