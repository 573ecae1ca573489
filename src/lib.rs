//! katanascrape: MangaKatana source adapter producing search results, manga metadata,
//! chapter lists and page-image URLs.

pub mod cli;
pub mod config;
pub mod model;
pub mod scraper;

// Re-exports for the CLI and host aggregators.
pub use model::{
    Arguments, ChapterRecord, MangaRecord, PageRecord, SearchResult, Status, LANGUAGE,
    NO_THUMBNAIL_URL,
};
pub use scraper::mangakatana::MangaKatana;
pub use scraper::{
    normalize_query, ChromeRenderer, Fetch, HttpClient, HttpClientBuilder, MangaSource, Render,
    RenderConfig, ScraperError,
};
