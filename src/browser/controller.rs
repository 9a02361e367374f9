//! Browser session lifecycle
//!
//! One long-lived chromiumoxide browser with a single page. The session
//! is launched lazily by the first navigation and shared by every tool
//! until `close_browser` tears it down.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetScriptExecutionDisabledParams, SetUserAgentOverrideParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::browser::navigation::{self, NavigationOutcome, NAVIGATION_TIMEOUT_MS};
use crate::browser::network::{NetworkLog, NetworkMonitor};
use crate::error::{BrowserError, Error, Result};

/// Upper bound on the post-load settle wait, in seconds.
const MAX_WAIT_SECS: f64 = 60.0;

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width (default: 1920)
    pub width: u32,
    /// Browser window height (default: 1080)
    pub height: u32,
    /// Enable sandbox (default: true)
    pub sandbox: bool,
    /// User agent string (None = use default)
    pub user_agent: Option<String>,
    /// Navigation timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1920,
            height: 1080,
            sandbox: true,
            user_agent: None,
            timeout_ms: NAVIGATION_TIMEOUT_MS,
            chrome_path: None,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set user agent
    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    /// Set navigation timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// The long-lived browser session behind the tool surface
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    log: NetworkLog,
    monitor: NetworkMonitor,
    config: BrowserConfig,
    navigated: bool,
}

impl BrowserSession {
    /// Launch the browser, open the capture page and start observing its
    /// network events.
    #[instrument(skip(config))]
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        info!(headless = config.headless, "launching browser");

        let mut builder = CdpBrowserConfig::builder().viewport(Viewport {
            width: config.width,
            height: config.height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.arg("--no-sandbox");
        }
        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        for arg in &config.extra_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(BrowserError::ConfigError)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("browser handler event error");
                    break;
                }
            }
            debug!("browser handler finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        if let Some(ref ua) = config.user_agent {
            page.execute(SetUserAgentOverrideParams::new(ua.clone()))
                .await?;
        }

        let log = NetworkLog::new();
        let monitor = NetworkMonitor::attach(&page, log.clone()).await?;

        info!("browser session ready");

        Ok(Self {
            browser,
            handler: handler_task,
            page,
            log,
            monitor,
            config,
            navigated: false,
        })
    }

    /// Navigate the capture page to `url`.
    ///
    /// Clears the network log first, then waits `wait_time` seconds after
    /// the load settles so late subresource requests land in the capture.
    #[instrument(skip(self))]
    pub async fn navigate(&mut self, url: &str, wait_time: f64) -> Result<NavigationOutcome> {
        self.log.clear();

        navigation::goto(&self.page, url, self.config.timeout_ms).await?;

        let wait = wait_time.clamp(0.0, MAX_WAIT_SECS);
        if wait > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
        }
        self.navigated = true;

        let final_url = self
            .page
            .url()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .unwrap_or_else(|| url.to_string());
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .unwrap_or_default();

        Ok(NavigationOutcome {
            url: final_url,
            title,
        })
    }

    /// Serialized DOM of the current page, re-fetched with script
    /// execution disabled so the markup is the server's, not the
    /// scripts' rewrite of it.
    #[instrument(skip(self))]
    pub async fn page_html(&self) -> Result<(String, String)> {
        if !self.navigated {
            return Err(Error::SessionNotReady);
        }

        let current_url = self
            .page
            .url()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .ok_or(Error::SessionNotReady)?;

        let scratch = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        let fetched = fetch_static_html(&scratch, &current_url, self.config.timeout_ms).await;
        if let Err(e) = scratch.close().await {
            warn!("failed to close scratch page: {e}");
        }

        Ok((current_url, fetched?))
    }

    /// The shared capture log
    pub fn network_log(&self) -> &NetworkLog {
        &self.log
    }

    /// The launch configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// True once a navigation has completed
    pub fn has_navigated(&self) -> bool {
        self.navigated
    }

    /// Close the browser and release every resource it holds.
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        info!("closing browser session");
        self.monitor.detach();

        self.browser
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        let _ = tokio::time::timeout(Duration::from_secs(5), self.handler).await;

        info!("browser closed");
        Ok(())
    }
}

async fn fetch_static_html(page: &Page, url: &str, timeout_ms: u64) -> Result<String> {
    page.execute(SetScriptExecutionDisabledParams::new(true))
        .await?;

    navigation::goto(page, url, timeout_ms).await?;

    page.content().await.map_err(|e| Error::cdp(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_config_default() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert!(config.sandbox);
        assert_eq!(config.timeout_ms, 30000);
        assert!(config.user_agent.is_none());
        assert!(config.chrome_path.is_none());
        assert!(config.extra_args.is_empty());
    }

    #[test]
    fn test_browser_config_builder() {
        let config = BrowserConfig::builder()
            .headless(false)
            .viewport(1280, 720)
            .sandbox(false)
            .user_agent("SitelensBot/1.0")
            .timeout_ms(60000)
            .chrome_path("/usr/bin/chromium")
            .arg("--disable-gpu")
            .build();

        assert!(!config.headless);
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert!(!config.sandbox);
        assert_eq!(config.user_agent, Some("SitelensBot/1.0".to_string()));
        assert_eq!(config.timeout_ms, 60000);
        assert_eq!(config.chrome_path, Some("/usr/bin/chromium".to_string()));
        assert_eq!(config.extra_args, vec!["--disable-gpu"]);
    }
}
