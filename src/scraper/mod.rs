//! Source adapters. Shared fetchers, the source trait, and the MangaKatana adapter.

mod browser;
mod client;
mod error;

pub mod mangakatana;

pub use browser::{ChromeRenderer, Render, RenderConfig};
pub use client::{Fetch, HttpClient, HttpClientBuilder};
pub use error::ScraperError;

use crate::model::{Arguments, ChapterRecord, MangaRecord, PageRecord, SearchResult};

/// Reduce a free-text query to lower-case ASCII letter runs joined by single spaces.
///
/// The remote search endpoint chokes on punctuation and diacritics, so anything that is
/// not an ASCII letter is a separator ("Re:Zero – Kara" becomes "re zero kara").
pub fn normalize_query(query: &str) -> String {
    query
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The four operations a host aggregator calls on a source.
///
/// Every operation is fail-open: failures are logged and come back as an empty sequence,
/// or `None` for the single-record [`get_manga`](MangaSource::get_manga). Callers cannot
/// tell a failure from a genuinely empty result.
pub trait MangaSource {
    /// Language tags this source publishes in.
    fn languages(&self) -> &[&'static str];

    fn search(&mut self, query: &str) -> Vec<SearchResult>;

    /// Requires `url` in `arguments`; `complete` is copied into the record.
    fn get_manga(&mut self, arguments: &Arguments) -> Option<MangaRecord>;

    /// Requires `url` in `arguments`; the whole bag is attached to every chapter.
    fn get_chapters(&mut self, arguments: &Arguments) -> Vec<ChapterRecord>;

    /// Requires `url` (a chapter URL) in `arguments`. Order is reading order.
    fn get_pages(&mut self, arguments: &Arguments) -> Vec<PageRecord>;
}
