//! SKU list loading and the SKU to product-URL directory.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::error;

/// Read SKUs from a newline-delimited text file, ignoring blank lines
/// and surrounding whitespace. Returns `None` if the file cannot be read;
/// a missing SKU list stops the whole run.
pub fn load_skus(path: &Path) -> Option<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Some(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read SKU list");
            None
        }
    }
}

/// Static SKU to product-URL directory for the source site.
///
/// A lookup miss means the SKU is skipped, not that the run fails. The
/// static table could later be replaced by a dynamic product search; the
/// `resolve` interface stays the same either way.
#[derive(Debug, Clone, Default)]
pub struct SkuDirectory {
    entries: BTreeMap<String, String>,
}

impl SkuDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The known Reject Shop product mappings.
    pub fn builtin() -> Self {
        let mut directory = Self::new();
        for (sku, url) in [
            (
                "30061292",
                "https://www.rejectshop.com.au/p/palmolive-naturals-shampoo-coconut-cream-350ml",
            ),
            (
                "30113527",
                "https://www.rejectshop.com.au/p/whiskas-jellymeat-400g",
            ),
            (
                "30115549",
                "https://www.rejectshop.com.au/p/twisties-party-bag-cheese-270g",
            ),
            (
                "30043588",
                "https://www.rejectshop.com.au/p/quilton-aloe-vera-tissue-3ply-95pk",
            ),
            (
                "30087959",
                "https://www.rejectshop.com.au/p/jif-surface-cleaner-lemon-scent-500ml",
            ),
        ] {
            directory.insert(sku, url);
        }
        directory
    }

    pub fn insert(&mut self, sku: impl Into<String>, url: impl Into<String>) {
        self.entries.insert(sku.into(), url.into());
    }

    /// Product URL for a SKU, or `None` when unmapped.
    pub fn resolve(&self, sku: &str) -> Option<&str> {
        self.entries.get(sku).map(String::as_str)
    }

    /// All known mappings in SKU order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
