//! Rendered-page fetching with human-like pacing.

use std::time::Duration;

use tracing::{debug, error};

use crate::config::PacingSettings;

use super::{RenderSession, WaitUntil};

/// Navigate the session to `url` and return the rendered markup.
///
/// Navigation failures and timeouts are logged and reported as `None`;
/// callers skip the unit of work rather than aborting the batch. On
/// success a randomized delay (sampled from the pacing settings) runs
/// before the content is read, so request timing does not follow an
/// automated pattern.
pub async fn fetch_rendered(
    session: &mut dyn RenderSession,
    url: &str,
    wait: WaitUntil,
    timeout: Duration,
    pacing: &PacingSettings,
) -> Option<String> {
    if let Err(e) = session.navigate(url, wait, timeout).await {
        error!(url, error = %e, "failed to fetch page");
        return None;
    }

    let delay = pacing.sample_post_fetch_delay();
    debug!(url, delay_secs = delay.as_secs_f64(), "pausing before reading rendered content");
    tokio::time::sleep(delay).await;

    match session.content().await {
        Ok(html) => Some(html),
        Err(e) => {
            error!(url, error = %e, "failed to read rendered content");
            None
        }
    }
}
