//! CLI parsing and orchestration. Parses args, runs one adapter operation, writes the records
//! as JSON. Maps errors to exit codes.

use crate::config;
use crate::model::Arguments;
use crate::scraper::mangakatana::{MangaKatana, DEFAULT_PAGE_DELAY};
use crate::scraper::{ChromeRenderer, HttpClient, RenderConfig, ScraperError};
use clap::{ArgAction, Parser, Subcommand};
use reqwest::Url;
use serde::Serialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Output(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Output(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "katanascrape")]
#[command(about = "Search MangaKatana and fetch manga metadata, chapter lists and page images as JSON")]
#[command(
    after_help = "Config file keys (base_url, user_agent, timeout_secs, page_delay_ms, headless, render_timeout_secs) are read from ./katanascrape.toml or the user config dir. CLI flags override config. RUST_LOG overrides -v."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Write JSON here instead of stdout.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Site root (overrides config; default https://mangakatana.com).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// HTTP and browser User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 10).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// More log output: -v info, -vv debug.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Errors only; no progress output.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Search by title across all result pages.
    Search {
        /// Title words; punctuation and digits are dropped before searching.
        #[arg(required = true)]
        query: Vec<String>,

        /// Pause between result pages in milliseconds (overrides config; default 2500).
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Fetch metadata from a manga page.
    Manga {
        url: String,
        /// Mark the manga as complete (the detail page does not say).
        #[arg(long)]
        complete: bool,
    },
    /// List chapters from a manga page.
    Chapters {
        url: String,
        #[arg(long)]
        complete: bool,
    },
    /// List page images of a chapter (launches Chrome).
    Pages {
        url: String,
        /// Show the browser window.
        #[arg(long)]
        headed: bool,
    },
}

/// Log level for the given flags. `-q` wins over `-v`.
pub fn level_for(verbose: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

/// Install the env_logger backend. RUST_LOG, when set, overrides the flag-derived level.
pub fn init_logging(args: &Args) {
    env_logger::Builder::new()
        .filter_level(level_for(args.verbose, args.quiet))
        .parse_default_env()
        .init();
}

/// Require an absolute http(s) URL for page-level commands.
fn validate_url(input: &str) -> Result<(), CliRunError> {
    let url = Url::parse(input).map_err(|e| {
        CliRunError::InvalidInput(format!(
            "Expected a MangaKatana URL. Example: https://mangakatana.com/manga/solo-leveling.21708 Invalid: {}: {}",
            input, e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CliRunError::InvalidInput(format!(
            "Expected an http(s) URL, got scheme '{}' in {}",
            url.scheme(),
            input
        )));
    }
    Ok(())
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Pretty JSON to `output` or stdout.
fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), CliRunError> {
    let write_err = |e: serde_json::Error| CliRunError::Output(format!("Failed to write JSON: {}", e));
    match output {
        Some(path) => {
            let f = std::fs::File::create(path).map_err(|e| {
                CliRunError::Output(format!("Cannot create {}: {}", path.display(), e))
            })?;
            serde_json::to_writer_pretty(f, value).map_err(write_err)
        }
        None => {
            let stdout = std::io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), value).map_err(write_err)?;
            println!();
            Ok(())
        }
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    match &args.command {
        Command::Manga { url, .. } | Command::Chapters { url, .. } | Command::Pages { url, .. } => {
            validate_url(url)?
        }
        Command::Search { .. } => {}
    }
    if let Some(ref path) = args.output {
        validate_output_path(path)?;
    }

    let config = config::load_config()
        .map_err(CliRunError::InvalidInput)?
        .unwrap_or_default();

    let timeout_secs = args
        .timeout
        .or(config.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let user_agent = args.user_agent.clone().or(config.user_agent.clone());
    let base_url = args.base_url.clone().or(config.base_url.clone());
    let render_timeout = Duration::from_secs(
        config
            .render_timeout_secs
            .unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS),
    );

    let mut builder = HttpClient::builder().timeout_secs(timeout_secs);
    if let Some(ref ua) = user_agent {
        builder = builder.user_agent(ua.clone());
    }
    let client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let headed = matches!(args.command, Command::Pages { headed: true, .. });
    let renderer = ChromeRenderer::new(RenderConfig {
        headless: !headed && config.headless.unwrap_or(true),
        user_agent,
        page_load_timeout: render_timeout,
        wait_timeout: render_timeout,
        ..RenderConfig::default()
    });

    let mut katana = MangaKatana::new(client, renderer);
    if let Some(ref base) = base_url {
        katana = katana.with_base_url(base).map_err(|e| {
            CliRunError::InvalidInput(format!("Invalid base URL {}: {}", base, e))
        })?;
    }

    let output = args.output.as_deref();
    match &args.command {
        Command::Search { query, delay_ms } => {
            let delay = delay_ms
                .or(config.page_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PAGE_DELAY);
            let mut katana = katana.with_page_delay(delay);

            let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
            let progress_cb = |page: u32, total: u32| {
                let mut state = progress_state.borrow_mut();
                let pb = state.get_or_insert_with(|| {
                    let bar = indicatif::ProgressBar::new(total as u64);
                    if let Ok(style) = indicatif::ProgressStyle::default_bar()
                        .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
                    {
                        bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
                    }
                    bar
                });
                pb.set_length(total as u64);
                pb.set_position(page as u64);
                pb.set_message(format!("Result page {}/{}", page, total));
            };
            let progress: Option<&dyn Fn(u32, u32)> =
                if args.quiet { None } else { Some(&progress_cb) };

            let results = katana.try_search_with_progress(&query.join(" "), progress)?;
            if let Some(pb) = progress_state.borrow_mut().take() {
                pb.finish_and_clear();
            }
            write_json(&results, output)?;
        }
        Command::Manga { url, complete } => {
            let arguments = Arguments::for_url(url.as_str()).with("complete", *complete);
            write_json(&katana.try_get_manga(&arguments)?, output)?;
        }
        Command::Chapters { url, complete } => {
            let arguments = Arguments::for_url(url.as_str()).with("complete", *complete);
            write_json(&katana.try_get_chapters(&arguments)?, output)?;
        }
        Command::Pages { url, .. } => {
            let arguments = Arguments::for_url(url.as_str());
            write_json(&katana.try_get_pages(&arguments)?, output)?;
        }
    }

    if let (Some(path), false) = (output, args.quiet) {
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}
