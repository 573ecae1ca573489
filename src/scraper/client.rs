//! Blocking HTTP document fetcher. One GET per call, fixed timeout, no retries.

use crate::scraper::error::ScraperError;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; katanascrape/0.1; +https://github.com/katanascrape)";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_REDIRECTS: usize = 10;

/// Static document source: fetch a URL (with optional query parameters) and return the body.
///
/// Any non-success status is an error for that call.
pub trait Fetch {
    fn fetch(&mut self, url: &str, params: &[(&str, &str)]) -> Result<String, ScraperError>;
}

/// Blocking HTTP client used for listing, detail and chapter-list pages.
#[derive(Debug)]
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    /// Build a client with default User-Agent and timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    /// Builder for custom User-Agent and/or timeout.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }
}

/// Check response status and read body as text.
fn check_response(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<String, ScraperError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    response.text().map_err(|e| ScraperError::BodyRead {
        url: url.to_string(),
        source: e,
    })
}

impl Fetch for HttpClient {
    fn fetch(&mut self, url: &str, params: &[(&str, &str)]) -> Result<String, ScraperError> {
        log::debug!("GET {} {:?}", url, params);
        let response = self
            .inner
            .get(url)
            .query(params)
            .send()
            .map_err(|e| ScraperError::Network {
                url: url.to_string(),
                source: e,
            })?;
        check_response(response, url)
    }
}

/// Builder for HttpClient with optional User-Agent and timeout.
#[derive(Debug)]
pub struct HttpClientBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpClientBuilder {
    /// Set a custom User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 10.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(HttpClient { inner })
    }
}
