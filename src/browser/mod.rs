//! Browser rendering layer.
//!
//! Defines the `RenderClient` / `RenderSession` traits that abstract over
//! the browser engine, plus the chromiumoxide-backed implementation. Both
//! retailers render their product data client-side, so every fetch goes
//! through a real browser session.

mod chromium;
mod fetch;
mod user_agent;

pub use chromium::{ChromiumClient, ChromiumOptions};
pub use fetch::fetch_rendered;
pub use user_agent::{random_user_agent, USER_AGENTS};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the rendering layer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("browser session already closed")]
    SessionClosed,

    #[error("browser command failed: {0}")]
    Command(String),
}

/// Browser viewport dimensions for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Navigation wait condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait for the load lifecycle event (default).
    #[default]
    Load,
    /// Return as soon as navigation commits.
    DomContentLoaded,
}

/// A browser engine that can open isolated sessions.
///
/// Only one shared browser process may exist; `start_session` launches it
/// lazily if absent, and `shutdown` is idempotent.
#[async_trait]
pub trait RenderClient: Send + Sync {
    /// Open an isolated session (own cookies, user-agent, viewport).
    async fn start_session(
        &self,
        user_agent: &str,
        viewport: Viewport,
    ) -> Result<Box<dyn RenderSession>, RenderError>;

    /// Stop the shared browser process, invalidating all sessions.
    async fn shutdown(&self) -> Result<(), RenderError>;
}

/// A single isolated browser session (context + page).
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate to a URL, waiting per `wait` and bounded by `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<(), RenderError>;

    /// Full rendered markup of the current page.
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Run a script in the page, discarding its result.
    async fn evaluate(&mut self, script: &str) -> Result<(), RenderError>;

    /// Move the mouse cursor to viewport coordinates.
    async fn move_mouse(&mut self, x: f64, y: f64) -> Result<(), RenderError>;

    /// Clear all cookies held by this session.
    async fn clear_cookies(&mut self) -> Result<(), RenderError>;

    /// Viewport this session was opened with.
    fn viewport(&self) -> Viewport;

    /// Close the session. Safe to call more than once.
    async fn close(&mut self) -> Result<(), RenderError>;
}
