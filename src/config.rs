//! Runtime settings, loaded from an optional TOML file with CLI overrides.
//!
//! The anti-bot knobs (reset interval, similarity threshold, sleep
//! durations) are untuned heuristics, so all of them live here rather
//! than as hardcoded constants.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::browser::Viewport;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pricecross.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub pacing: PacingSettings,

    #[serde(default)]
    pub matching: MatchSettings,

    #[serde(default)]
    pub anti_bot: AntiBotSettings,

    #[serde(default)]
    pub sites: SiteSettings,

    #[serde(default)]
    pub output: OutputSettings,

    /// SKU list file (newline-delimited).
    #[serde(default = "default_skus_path")]
    pub skus_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            browser: BrowserSettings::default(),
            pacing: PacingSettings::default(),
            matching: MatchSettings::default(),
            anti_bot: AntiBotSettings::default(),
            sites: SiteSettings::default(),
            output: OutputSettings::default(),
            skus_path: default_skus_path(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, the default config file, or
    /// built-in defaults (in that order of preference).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Settings> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Settings::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> anyhow::Result<Settings> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Shared browser process and session options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run headless (default). Headed mode helps when debugging
    /// headless detection.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Navigation timeout in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Session viewport.
    #[serde(default)]
    pub viewport: Viewport,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            navigation_timeout_secs: default_navigation_timeout(),
            chrome_args: Vec::new(),
            viewport: Viewport::default(),
        }
    }
}

/// Deliberate sleeps that keep request timing from looking automated.
/// These bound throughput by design.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PacingSettings {
    /// Lower bound of the randomized post-fetch delay, in seconds.
    #[serde(default = "default_post_fetch_min")]
    pub post_fetch_min_secs: f64,

    /// Upper bound of the randomized post-fetch delay, in seconds.
    #[serde(default = "default_post_fetch_max")]
    pub post_fetch_max_secs: f64,

    /// Wait after scrolling to the bottom of a search page, in seconds.
    #[serde(default = "default_scroll_bottom_wait")]
    pub scroll_bottom_wait_secs: u64,

    /// Wait after scrolling back to the top, in seconds.
    #[serde(default = "default_scroll_top_wait")]
    pub scroll_top_wait_secs: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            post_fetch_min_secs: default_post_fetch_min(),
            post_fetch_max_secs: default_post_fetch_max(),
            scroll_bottom_wait_secs: default_scroll_bottom_wait(),
            scroll_top_wait_secs: default_scroll_top_wait(),
        }
    }
}

impl PacingSettings {
    /// Sample the uniform post-fetch delay.
    pub fn sample_post_fetch_delay(&self) -> Duration {
        let (min, max) = (self.post_fetch_min_secs, self.post_fetch_max_secs);
        let secs = if max > min {
            rand::rng().random_range(min..max)
        } else {
            min
        };
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Fuzzy matching options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchSettings {
    /// Minimum composite similarity score (0-100) to accept a match.
    #[serde(default = "default_match_threshold")]
    pub threshold: f64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            threshold: default_match_threshold(),
        }
    }
}

/// Anti-tracking session lifecycle options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AntiBotSettings {
    /// Tear down and relaunch the shared browser after this many SKUs.
    /// The right value is empirical and site-dependent.
    #[serde(default = "default_reset_every")]
    pub reset_every: usize,
}

impl Default for AntiBotSettings {
    fn default() -> Self {
        Self {
            reset_every: default_reset_every(),
        }
    }
}

/// Retailer endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default = "default_rejectshop_base_url")]
    pub rejectshop_base_url: String,

    #[serde(default = "default_woolworths_base_url")]
    pub woolworths_base_url: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            rejectshop_base_url: default_rejectshop_base_url(),
            woolworths_base_url: default_woolworths_base_url(),
        }
    }
}

/// Result file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Every successfully scraped source-site product.
    #[serde(default = "default_products_path")]
    pub products_path: PathBuf,

    /// Every comparison record, including "Not Found" target sides.
    #[serde(default = "default_comparisons_path")]
    pub comparisons_path: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            products_path: default_products_path(),
            comparisons_path: default_comparisons_path(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_post_fetch_min() -> f64 {
    2.0
}

fn default_post_fetch_max() -> f64 {
    8.0
}

fn default_scroll_bottom_wait() -> u64 {
    3
}

fn default_scroll_top_wait() -> u64 {
    4
}

fn default_match_threshold() -> f64 {
    70.0
}

fn default_reset_every() -> usize {
    3
}

fn default_rejectshop_base_url() -> String {
    "https://www.rejectshop.com.au".to_string()
}

fn default_woolworths_base_url() -> String {
    "https://www.woolworths.com.au".to_string()
}

fn default_products_path() -> PathBuf {
    PathBuf::from("phase1_results.json")
}

fn default_comparisons_path() -> PathBuf {
    PathBuf::from("phase2_results.json")
}

fn default_skus_path() -> PathBuf {
    PathBuf::from("skus.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_heuristics() {
        let settings = Settings::default();
        assert!(settings.browser.headless);
        assert_eq!(settings.browser.navigation_timeout_secs, 30);
        assert_eq!(settings.pacing.post_fetch_min_secs, 2.0);
        assert_eq!(settings.pacing.post_fetch_max_secs, 8.0);
        assert_eq!(settings.matching.threshold, 70.0);
        assert_eq!(settings.anti_bot.reset_every, 3);
        assert_eq!(settings.browser.viewport.width, 1920);
        assert_eq!(settings.browser.viewport.height, 1080);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let settings: Settings = toml::from_str(
            r#"
            [matching]
            threshold = 85.0

            [anti_bot]
            reset_every = 5
            "#,
        )
        .unwrap();
        assert_eq!(settings.matching.threshold, 85.0);
        assert_eq!(settings.anti_bot.reset_every, 5);
        assert_eq!(settings.pacing.post_fetch_max_secs, 8.0);
        assert!(settings.browser.headless);
    }

    #[test]
    fn post_fetch_delay_stays_within_bounds() {
        let pacing = PacingSettings::default();
        for _ in 0..50 {
            let delay = pacing.sample_post_fetch_delay();
            assert!(delay.as_secs_f64() >= 2.0);
            assert!(delay.as_secs_f64() < 8.0);
        }
    }

    #[test]
    fn degenerate_delay_range_is_allowed() {
        let pacing = PacingSettings {
            post_fetch_min_secs: 0.0,
            post_fetch_max_secs: 0.0,
            ..PacingSettings::default()
        };
        assert_eq!(pacing.sample_post_fetch_delay(), Duration::ZERO);
    }
}
