//! Chromium-backed render client (CDP via chromiumoxide).

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{RenderClient, RenderError, RenderSession, Viewport, WaitUntil};

/// Launch options for the shared Chromium process.
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    /// Run without a visible window (default). Headed mode helps when
    /// debugging headless detection.
    pub headless: bool,
    /// Extra Chrome arguments appended after the stealth set.
    pub chrome_args: Vec<String>,
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_args: Vec::new(),
        }
    }
}

/// Render client owning the single shared Chromium process.
///
/// The process is launched lazily by the first `start_session` call and
/// torn down by `shutdown`; a later `start_session` relaunches it.
pub struct ChromiumClient {
    options: ChromiumOptions,
    process: Mutex<Option<BrowserProcess>>,
}

struct BrowserProcess {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumClient {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(options: ChromiumOptions) -> Self {
        Self {
            options,
            process: Mutex::new(None),
        }
    }

    /// Find a Chrome/Chromium executable on this machine.
    fn find_chrome() -> Result<PathBuf, RenderError> {
        for path in Self::CHROME_PATHS {
            let p = Path::new(path);
            if p.exists() {
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(RenderError::Launch(
            "Chrome/Chromium not found; install chromium or google-chrome".to_string(),
        ))
    }

    async fn launch(&self) -> Result<BrowserProcess, RenderError> {
        let chrome_path = Self::find_chrome()?;
        info!(
            path = %chrome_path.display(),
            headless = self.options.headless,
            "launching shared browser"
        );

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless, confusingly
        if !self.options.headless {
            builder = builder.with_head();
        }

        // Stealth-related Chrome args
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .arg("--no-sandbox") // Often needed for headless in containers
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer");

        for arg in &self.options.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // Drive the CDP message loop until the browser goes away
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(BrowserProcess { browser, handler })
    }
}

#[async_trait]
impl RenderClient for ChromiumClient {
    async fn start_session(
        &self,
        user_agent: &str,
        viewport: Viewport,
    ) -> Result<Box<dyn RenderSession>, RenderError> {
        let mut guard = self.process.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let process = match guard.as_ref() {
            Some(p) => p,
            None => return Err(RenderError::Launch("browser process unavailable".into())),
        };

        let page = process
            .browser
            .new_page("about:blank")
            .await
            .map_err(command_error)?;
        drop(guard);

        // Isolate the session: own UA, own viewport, no inherited cookies
        let ua = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .build()
            .map_err(RenderError::Command)?;
        page.execute(ua).await.map_err(command_error)?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(RenderError::Command)?;
        page.execute(metrics).await.map_err(command_error)?;

        page.execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(command_error)?;

        debug!(user_agent, "opened isolated browser session");
        Ok(Box::new(ChromiumSession {
            page: Some(page),
            viewport,
        }))
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        let mut guard = self.process.lock().await;
        let Some(mut process) = guard.take() else {
            return Ok(());
        };

        info!("shutting down shared browser");
        if let Err(e) = process.browser.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }
        let _ = process.browser.wait().await;
        process.handler.abort();
        Ok(())
    }
}

/// One isolated page bound to the shared browser process.
pub struct ChromiumSession {
    page: Option<Page>,
    viewport: Viewport,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page.as_ref().ok_or(RenderError::SessionClosed)
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let page = self.page()?;
        let navigation = async {
            page.goto(url).await?;
            if wait == WaitUntil::Load {
                page.wait_for_navigation().await?;
            }
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                secs: timeout.as_secs(),
            }),
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Ok(Ok(())) => Ok(()),
        }
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.page()?.content().await.map_err(command_error)
    }

    async fn evaluate(&mut self, script: &str) -> Result<(), RenderError> {
        self.page()?
            .evaluate(script.to_string())
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn move_mouse(&mut self, x: f64, y: f64) -> Result<(), RenderError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(x)
            .y(y)
            .build()
            .map_err(RenderError::Command)?;
        self.page()?.execute(params).await.map_err(command_error)?;
        Ok(())
    }

    async fn clear_cookies(&mut self) -> Result<(), RenderError> {
        self.page()?
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(command_error)?;
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        page.close().await.map_err(command_error)
    }
}

fn command_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Command(e.to_string())
}
