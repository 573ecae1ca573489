//! Headless-browser document fetcher for pages whose images are inserted by client-side script.
//!
//! Each render launches its own browser and tears it down when the session guard drops,
//! whether the wait succeeded or not.

use crate::scraper::error::ScraperError;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 10;
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 10;

/// Rendered document source: navigate to `url`, wait until `wait_for` (a CSS selector)
/// matches at least one element, return the materialized HTML.
pub trait Render {
    fn render(&mut self, url: &str, wait_for: &str) -> Result<String, ScraperError>;
}

/// Configuration for the headless browser.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub user_agent: Option<String>,
    /// Ceiling for the initial navigation.
    pub page_load_timeout: Duration,
    /// Ceiling for the dynamic content to appear after navigation.
    pub wait_timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            user_agent: None,
            page_load_timeout: Duration::from_secs(DEFAULT_PAGE_LOAD_TIMEOUT_SECS),
            wait_timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

/// Chrome-backed renderer. Holds only configuration; browsers are per call.
#[derive(Debug, Clone, Default)]
pub struct ChromeRenderer {
    config: RenderConfig,
}

impl ChromeRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// `--user-agent=...` flag for the configured agent, if any.
    fn user_agent_arg(&self) -> Option<String> {
        self.config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua))
    }

    /// Launch options borrowing `user_agent_arg`, which must outlive the launch.
    fn launch_options<'a>(
        &self,
        user_agent_arg: Option<&'a str>,
    ) -> Result<LaunchOptions<'a>, ScraperError> {
        let mut args: Vec<&'a OsStr> = vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
        ];
        if let Some(flag) = user_agent_arg {
            args.push(OsStr::new(flag));
        }
        LaunchOptions::default_builder()
            .headless(self.config.headless)
            .window_size(Some(self.config.window_size))
            .args(args)
            .build()
            .map_err(|e| ScraperError::Browser {
                stage: "configuration",
                message: e.to_string(),
            })
    }
}

/// One browser with one tab, open for the duration of a single render.
struct RenderSession {
    // Tab is closed in Drop; the browser process exits when `_browser` drops after it.
    tab: Arc<Tab>,
    _browser: Browser,
}

impl RenderSession {
    fn open(options: LaunchOptions<'_>) -> Result<Self, ScraperError> {
        let browser = Browser::new(options).map_err(|e| ScraperError::Browser {
            stage: "launch",
            message: e.to_string(),
        })?;
        let tab = browser.new_tab().map_err(|e| ScraperError::Browser {
            stage: "tab creation",
            message: e.to_string(),
        })?;
        Ok(Self {
            tab,
            _browser: browser,
        })
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            log::debug!("render session tab close failed: {}", e);
        }
        log::debug!("render session released");
    }
}

impl Render for ChromeRenderer {
    fn render(&mut self, url: &str, wait_for: &str) -> Result<String, ScraperError> {
        log::debug!("render {} (waiting for {})", url, wait_for);
        let user_agent_arg = self.user_agent_arg();
        let session = RenderSession::open(self.launch_options(user_agent_arg.as_deref())?)?;
        let tab = &session.tab;

        tab.set_default_timeout(self.config.page_load_timeout);
        tab.navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| ScraperError::Browser {
                stage: "navigation",
                message: format!("{}: {}", url, e),
            })?;

        tab.wait_for_element_with_custom_timeout(wait_for, self.config.wait_timeout)
            .map_err(|_| ScraperError::RenderTimeout {
                selector: wait_for.to_string(),
                url: url.to_string(),
            })?;

        let html = tab.get_content().map_err(|e| ScraperError::Browser {
            stage: "content capture",
            message: e.to_string(),
        })?;
        Ok(html)
    }
}
