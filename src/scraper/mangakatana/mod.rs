//! MangaKatana adapter. Static fetches for search listings, detail pages and chapter lists;
//! a rendered fetch for chapter pages, whose images are inserted by client-side script.
//!
//! Each public operation is fail-open: any failure is logged and turned into an empty result.
//! The `try_*` twins expose the underlying error.

pub mod extract;

use crate::model::{Arguments, ChapterRecord, MangaRecord, PageRecord, SearchResult, LANGUAGE};
use crate::scraper::browser::Render;
use crate::scraper::client::Fetch;
use crate::scraper::error::ScraperError;
use crate::scraper::{normalize_query, MangaSource};
use extract::{
    extract_chapters, extract_listing, extract_manga, extract_page_count, extract_pages,
    PAGE_IMAGES,
};
use reqwest::Url;
use std::time::Duration;

pub const MANGAKATANA_BASE: &str = "https://mangakatana.com";
/// Pause between successive search result pages.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(2500);
const SEARCH_BY: &str = "book_name";

/// MangaKatana source over a static fetcher `F` and a rendering fetcher `R`.
pub struct MangaKatana<F, R> {
    fetcher: F,
    renderer: R,
    base_url: String,
    page_delay: Duration,
}

fn parse_url(input: &str) -> Result<Url, ScraperError> {
    Url::parse(input).map_err(|e| ScraperError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

fn require_url(arguments: &Arguments) -> Result<&str, ScraperError> {
    arguments
        .url()
        .ok_or(ScraperError::MissingArgument { name: "url" })
}

/// Log a failed operation and swallow the error.
fn logged<T>(operation: &str, result: Result<T, ScraperError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("{} failed: {}", operation, e);
            None
        }
    }
}

impl<F: Fetch, R: Render> MangaKatana<F, R> {
    pub fn new(fetcher: F, renderer: R) -> Self {
        Self {
            fetcher,
            renderer,
            base_url: MANGAKATANA_BASE.to_string(),
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Point the adapter at a mirror or a local test server. The base path is kept as a
    /// directory, so result pages land under it (`<base>/page/<n>`).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ScraperError> {
        let mut url = parse_url(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url.into();
        Ok(self)
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn search_page_url(base: &Url, page: u32) -> Result<String, ScraperError> {
        let path = format!("page/{}", page);
        base.join(&path)
            .map(String::from)
            .map_err(|e| ScraperError::InvalidUrl {
                input: path,
                reason: e.to_string(),
            })
    }

    /// Search across every result page. The page count is read from the first page only.
    pub fn try_search(&mut self, query: &str) -> Result<Vec<SearchResult>, ScraperError> {
        self.try_search_with_progress(query, None)
    }

    /// Like [`try_search`](Self::try_search), calling `progress(page, total)` after each page.
    pub fn try_search_with_progress(
        &mut self,
        query: &str,
        progress: Option<&dyn Fn(u32, u32)>,
    ) -> Result<Vec<SearchResult>, ScraperError> {
        let normalized = normalize_query(query);
        log::debug!("searching for {:?} (normalized {:?})", query, normalized);
        let params = [("search", normalized.as_str()), ("search_by", SEARCH_BY)];
        let base = parse_url(&self.base_url)?;

        let mut found = Vec::new();
        let mut total = 1;
        let mut page = 1;
        while page <= total {
            let url = Self::search_page_url(&base, page)?;
            let html = self.fetcher.fetch(&url, &params)?;
            if page == 1 {
                total = extract_page_count(&html)?;
            }
            found.extend(extract_listing(&html, &base)?);
            if let Some(p) = progress {
                p(page, total);
            }

            page += 1;
            if page <= total {
                std::thread::sleep(self.page_delay);
            }
        }

        log::info!(
            "search {:?}: {} result(s) across {} page(s)",
            normalized,
            found.len(),
            total
        );
        Ok(found)
    }

    /// Fail-open search with page progress.
    pub fn search_with_progress(
        &mut self,
        query: &str,
        progress: Option<&dyn Fn(u32, u32)>,
    ) -> Vec<SearchResult> {
        logged("search", self.try_search_with_progress(query, progress)).unwrap_or_default()
    }

    pub fn try_get_manga(&mut self, arguments: &Arguments) -> Result<MangaRecord, ScraperError> {
        let url = require_url(arguments)?;
        let html = self.fetcher.fetch(url, &[])?;
        extract_manga(&html, url, arguments)
    }

    pub fn try_get_chapters(
        &mut self,
        arguments: &Arguments,
    ) -> Result<Vec<ChapterRecord>, ScraperError> {
        let url = require_url(arguments)?;
        let base = parse_url(url)?;
        let html = self.fetcher.fetch(url, &[])?;
        extract_chapters(&html, &base, arguments)
    }

    pub fn try_get_pages(&mut self, arguments: &Arguments) -> Result<Vec<PageRecord>, ScraperError> {
        let url = require_url(arguments)?;
        let html = self.renderer.render(url, PAGE_IMAGES)?;
        extract_pages(&html)
    }
}

impl<F: Fetch, R: Render> MangaSource for MangaKatana<F, R> {
    fn languages(&self) -> &[&'static str] {
        &[LANGUAGE]
    }

    fn search(&mut self, query: &str) -> Vec<SearchResult> {
        self.search_with_progress(query, None)
    }

    fn get_manga(&mut self, arguments: &Arguments) -> Option<MangaRecord> {
        logged("get_manga", self.try_get_manga(arguments))
    }

    fn get_chapters(&mut self, arguments: &Arguments) -> Vec<ChapterRecord> {
        logged("get_chapters", self.try_get_chapters(arguments)).unwrap_or_default()
    }

    fn get_pages(&mut self, arguments: &Arguments) -> Vec<PageRecord> {
        logged("get_pages", self.try_get_pages(arguments)).unwrap_or_default()
    }
}
