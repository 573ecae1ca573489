//! Pure HTML extractors for MangaKatana pages. Each takes the raw document text and
//! returns records or the first structural failure; a bad entry fails the whole document.

use crate::model::{
    Arguments, ChapterRecord, MangaRecord, PageRecord, SearchResult, Status, LANGUAGE,
    NO_THUMBNAIL_URL,
};
use crate::scraper::error::ScraperError;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Listing cards on a search page.
const LISTING_ENTRIES: &str = "#book_list > div";
/// Pagination control under the listing.
const PAGINATION_ENTRIES: &str = "#book_list > ul > li";
const ENTRY_LINK: &str = r#"a[target="_blank"]"#;
const ENTRY_COVER: &str = "img";
const ENTRY_STATUS: &str = r#"div[class*="status"]"#;

const INFO_BLOCK: &str = r#"[class="info"]"#;
const HEADING: &str = r#"[class="heading"]"#;
const SUMMARY: &str = r#"[class="summary"] > p"#;
const GENRES: &str = r#"[class="genres"] > *"#;
const AUTHORS: &str = r#"[class="author"]"#;

const CHAPTER_ROWS: &str = r#"[class="chapters"] table tr"#;
const CHAPTER_TITLE: &str = r#"div[class="chapter"] > *"#;
const CHAPTER_DATE: &str = r#"div[class="update_time"]"#;

/// Page images on a rendered chapter; also the selector the renderer waits on.
pub const PAGE_IMAGES: &str = r#"#imgs [id*="page"] > img"#;
const PAGE_IMAGE_SOURCE: &str = "data-src";

/// "Chapter <digits>" not followed by further digits or a fractional part. A bare trailing
/// period ("Chapter 12. Dawn") still counts as a whole number.
const CHAPTER_NUMBER_PATTERN: &str = r"Chapter\s+(\d+)(?:$|[^\d.]|\.(?:$|\D))";
const RELEASE_DATE_FORMAT: &str = "%b-%d-%Y";

fn parse_selector(sel: &str) -> Result<Selector, ScraperError> {
    Selector::parse(sel).map_err(|e| ScraperError::InvalidSelector {
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

/// First descendant of `scope` matching `sel`, or `MissingNode`.
fn first<'a>(scope: ElementRef<'a>, sel: &str) -> Result<ElementRef<'a>, ScraperError> {
    let selector = parse_selector(sel)?;
    scope
        .select(&selector)
        .next()
        .ok_or_else(|| ScraperError::MissingNode {
            selector: sel.to_string(),
        })
}

/// All descendants of `scope` matching `sel`, in document order.
fn all<'a>(scope: ElementRef<'a>, sel: &str) -> Result<Vec<ElementRef<'a>>, ScraperError> {
    let selector = parse_selector(sel)?;
    Ok(scope.select(&selector).collect())
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn attr_of(el: ElementRef<'_>, sel: &str, attribute: &'static str) -> Result<String, ScraperError> {
    el.value()
        .attr(attribute)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| ScraperError::MissingAttribute {
            selector: sel.to_string(),
            attribute,
        })
}

fn resolve(base: &Url, href: &str) -> Result<String, ScraperError> {
    base.join(href)
        .map(String::from)
        .map_err(|e| ScraperError::InvalidUrl {
            input: href.to_string(),
            reason: e.to_string(),
        })
}

/// Total number of result pages. The second-to-last pagination entry holds the last page
/// number; fewer than two entries means a single page.
pub fn extract_page_count(html: &str) -> Result<u32, ScraperError> {
    let doc = Html::parse_document(html);
    let entries = all(doc.root_element(), PAGINATION_ENTRIES)?;
    if entries.len() < 2 {
        return Ok(1);
    }
    let text = text_of(entries[entries.len() - 2]);
    let count: u32 = text
        .parse()
        .map_err(|_| ScraperError::PageCount { text: text.clone() })?;
    Ok(count.max(1))
}

/// Search-result cards of one listing page, in page order.
pub fn extract_listing(html: &str, base: &Url) -> Result<Vec<SearchResult>, ScraperError> {
    let doc = Html::parse_document(html);
    let mut results = Vec::new();
    for entry in all(doc.root_element(), LISTING_ENTRIES)? {
        let link = first(entry, ENTRY_LINK)?;
        let cover = first(entry, ENTRY_COVER)?;
        let status = first(entry, ENTRY_STATUS)?;

        let href = attr_of(link, ENTRY_LINK, "href")?;
        let name = text_of(link);
        if name.is_empty() {
            return Err(ScraperError::EmptyText {
                selector: ENTRY_LINK.to_string(),
            });
        }
        let cover = match cover.value().attr("src").map(str::trim) {
            Some(src) if !src.is_empty() => resolve(base, src)?,
            _ => NO_THUMBNAIL_URL.to_string(),
        };
        results.push(SearchResult {
            name,
            url: resolve(base, &href)?,
            cover,
            complete: Status::from_label(&text_of(status)) == Status::Completed,
        });
    }
    Ok(results)
}

/// Manga metadata from a detail page. `complete` is taken from the caller's arguments.
pub fn extract_manga(
    html: &str,
    url: &str,
    arguments: &Arguments,
) -> Result<MangaRecord, ScraperError> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let info = first(root, INFO_BLOCK)?;
    let heading = first(info, HEADING)?;
    let summary = first(root, SUMMARY)?;

    let description = summary
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    let genres = all(info, GENRES)?.into_iter().map(text_of).collect();

    Ok(MangaRecord {
        name: text_of(heading),
        description,
        original_language: LANGUAGE.to_string(),
        genres,
        complete: arguments.complete(),
        url: url.to_string(),
    })
}

/// Chapter label from a title such as "Chapter 12: The Return". Only whole numbers are
/// recognised; "Chapter 12.5" and "Extra" are errors.
pub fn chapter_label(pattern: &Regex, title: &str) -> Result<String, ScraperError> {
    pattern
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ScraperError::ChapterTitle {
            text: title.to_string(),
        })
}

fn chapter_pattern() -> Result<&'static Regex, ScraperError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(CHAPTER_NUMBER_PATTERN))
        .as_ref()
        .map_err(|e| ScraperError::InvalidPattern {
            pattern: CHAPTER_NUMBER_PATTERN,
            reason: e.to_string(),
        })
}

/// Parse "Jan-05-2023" as midnight of that day, tagged UTC. The site's wall-clock date is
/// taken as-is; no zone conversion happens.
pub fn parse_release_date(text: &str) -> Result<DateTime<Utc>, ScraperError> {
    let text = text.trim();
    let date = NaiveDate::parse_from_str(text, RELEASE_DATE_FORMAT).map_err(|e| {
        ScraperError::ReleaseDate {
            text: text.to_string(),
            source: e,
        }
    })?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Chapter rows of a detail page, in document order. Every row carries the same author
/// list in all contributor roles and a copy of the caller's arguments.
pub fn extract_chapters(
    html: &str,
    base: &Url,
    arguments: &Arguments,
) -> Result<Vec<ChapterRecord>, ScraperError> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let info = first(root, INFO_BLOCK)?;
    let authors: Vec<String> = all(info, AUTHORS)?.into_iter().map(text_of).collect();
    let pattern = chapter_pattern()?;

    let mut chapters = Vec::new();
    for row in all(root, CHAPTER_ROWS)? {
        let title = first(row, CHAPTER_TITLE)?;
        let date = first(row, CHAPTER_DATE)?;

        let name = chapter_label(pattern, &text_of(title))?;
        let chapter_number: f64 = name.parse().map_err(|_| ScraperError::ChapterTitle {
            text: name.clone(),
        })?;
        let url = resolve(base, &attr_of(title, CHAPTER_TITLE, "href")?)?;

        chapters.push(ChapterRecord {
            name,
            chapter_number,
            localization: LANGUAGE.to_string(),
            release_date: parse_release_date(&text_of(date))?,
            source_url: url.clone(),
            url,
            writer: authors.clone(),
            penciller: authors.clone(),
            inker: authors.clone(),
            colorist: authors.clone(),
            letterer: authors.clone(),
            cover_artist: authors.clone(),
            arguments: arguments.clone(),
        });
    }
    Ok(chapters)
}

/// Page images of a rendered chapter, in reading (document) order.
pub fn extract_pages(html: &str) -> Result<Vec<PageRecord>, ScraperError> {
    let doc = Html::parse_document(html);
    all(doc.root_element(), PAGE_IMAGES)?
        .into_iter()
        .map(|img| attr_of(img, PAGE_IMAGES, PAGE_IMAGE_SOURCE).map(|url| PageRecord { url }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://mangakatana.com";

    fn base() -> Url {
        Url::parse(BASE).expect("static base url")
    }

    fn listing_entry(name: &str, href: &str, img: &str, status: &str) -> String {
        format!(
            r#"<div class="item">
  <div class="media"><div class="wrap_img">{img}</div></div>
  <div class="text">
    <h3 class="title"><a href="{href}" target="_blank">{name}</a></h3>
    <div class="status {status_class}">{status}</div>
  </div>
</div>"#,
            img = img,
            href = href,
            name = name,
            status = status,
            status_class = status.trim().to_lowercase(),
        )
    }

    fn listing_page(entries: &[String], pagination: &[&str]) -> String {
        let pages = pagination
            .iter()
            .map(|p| format!("<li><a>{}</a></li>", p))
            .collect::<String>();
        format!(
            r#"<html><body><div id="book_list">{}<ul class="uk-pagination">{}</ul></div></body></html>"#,
            entries.concat(),
            pages
        )
    }

    const DETAIL: &str = r#"<html><body>
<div class="info">
  <h1 class="heading">Solo Leveling</h1>
  <ul class="meta">
    <li><div class="authors"><a class="author" href="/author/a">Chugong </a><a class="author" href="/author/b"> Jang Sung-Lak</a></div></li>
    <li><div class="genres"><a href="/genre/action">Action</a><a href="/genre/fantasy"> Fantasy </a><a href="/genre/shounen">Shounen</a></div></li>
  </ul>
</div>
<div class="summary"><p>Ten years ago,
   "the Gate" appeared <b>and</b>
connected the real world.</p></div>
<div class="chapters"><table class="uk-table">
  <tr><td><div class="chapter"><a href="https://mangakatana.com/manga/solo-leveling.21708/c201">Chapter 201: Epilogue</a></div></td><td><div class="update_time">Jan-05-2023</div></td></tr>
  <tr><td><div class="chapter"><a href="/manga/solo-leveling.21708/c200">Chapter 200</a></div></td><td><div class="update_time"> Dec-31-2022 </div></td></tr>
</table></div>
</body></html>"#;

    #[test]
    fn page_count_from_second_to_last_entry() -> Result<(), ScraperError> {
        let html = listing_page(&[], &["1", "2", "3", "12", "Next"]);
        assert_eq!(extract_page_count(&html)?, 12);
        Ok(())
    }

    #[test]
    fn page_count_defaults_to_one_without_pagination() -> Result<(), ScraperError> {
        assert_eq!(extract_page_count(&listing_page(&[], &[]))?, 1);
        assert_eq!(extract_page_count(&listing_page(&[], &["1"]))?, 1);
        Ok(())
    }

    #[test]
    fn page_count_non_numeric_is_error() {
        let html = listing_page(&[], &["1", "…", "Next"]);
        assert!(matches!(
            extract_page_count(&html),
            Err(ScraperError::PageCount { .. })
        ));
    }

    #[test]
    fn listing_entries_in_order_with_status_mapping() -> Result<(), ScraperError> {
        let html = listing_page(
            &[
                listing_entry(
                    "Solo Leveling",
                    "https://mangakatana.com/manga/solo-leveling.21708",
                    r#"<img src="https://i.mangakatana.com/solo.jpg">"#,
                    " Completed ",
                ),
                listing_entry(
                    "Solo Max-Level Newbie",
                    "/manga/solo-max-level-newbie.25111",
                    r#"<img src="https://i.mangakatana.com/newbie.jpg">"#,
                    "Ongoing",
                ),
                listing_entry("Solo Bug Player", "/manga/solo-bug-player.1", "<img>", "Licensed"),
            ],
            &[],
        );
        let results = extract_listing(&html, &base())?;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name, "Solo Leveling");
        assert_eq!(results[0].url, "https://mangakatana.com/manga/solo-leveling.21708");
        assert_eq!(results[0].cover, "https://i.mangakatana.com/solo.jpg");
        assert!(results[0].complete);
        assert_eq!(
            results[1].url,
            "https://mangakatana.com/manga/solo-max-level-newbie.25111"
        );
        assert!(!results[1].complete);
        assert_eq!(results[2].cover, NO_THUMBNAIL_URL);
        assert!(!results[2].complete);
        Ok(())
    }

    #[test]
    fn listing_empty_cover_src_falls_back() -> Result<(), ScraperError> {
        let html = listing_page(
            &[listing_entry("X", "/manga/x", r#"<img src="">"#, "hiatus")],
            &[],
        );
        let results = extract_listing(&html, &base())?;
        assert_eq!(results[0].cover, NO_THUMBNAIL_URL);
        Ok(())
    }

    #[test]
    fn listing_relative_cover_is_resolved() -> Result<(), ScraperError> {
        let html = listing_page(
            &[listing_entry("X", "/manga/x", r#"<img src="/covers/x.jpg">"#, "Ongoing")],
            &[],
        );
        let results = extract_listing(&html, &base())?;
        assert_eq!(results[0].cover, "https://mangakatana.com/covers/x.jpg");
        Ok(())
    }

    #[test]
    fn listing_blank_title_fails_whole_page() {
        let html = listing_page(
            &[
                listing_entry("A", "/manga/a", r#"<img src="a.jpg">"#, "Ongoing"),
                listing_entry("  ", "/manga/x", r#"<img src="x.jpg">"#, "Ongoing"),
            ],
            &[],
        );
        match extract_listing(&html, &base()) {
            Err(ScraperError::EmptyText { selector }) => assert_eq!(selector, ENTRY_LINK),
            other => panic!("expected EmptyText, got {:?}", other),
        }
    }

    #[test]
    fn listing_entry_missing_status_fails_whole_page() {
        let html = r#"<div id="book_list">
<div><a href="/manga/a" target="_blank">A</a><img src="a.jpg"><div class="status">Ongoing</div></div>
<div><a href="/manga/b" target="_blank">B</a><img src="b.jpg"></div>
</div>"#;
        match extract_listing(html, &base()) {
            Err(ScraperError::MissingNode { selector }) => assert_eq!(selector, ENTRY_STATUS),
            other => panic!("expected MissingNode, got {:?}", other),
        }
    }

    #[test]
    fn listing_without_entries_is_empty() -> Result<(), ScraperError> {
        let html = listing_page(&[], &[]);
        assert!(extract_listing(&html, &base())?.is_empty());
        Ok(())
    }

    #[test]
    fn manga_detail_fields() -> Result<(), ScraperError> {
        let url = "https://mangakatana.com/manga/solo-leveling.21708";
        let args = Arguments::for_url(url).with("complete", true);
        let manga = extract_manga(DETAIL, url, &args)?;
        assert_eq!(manga.name, "Solo Leveling");
        assert_eq!(
            manga.description,
            r#"Ten years ago, "the Gate" appeared and connected the real world."#
        );
        assert_eq!(manga.genres, vec!["Action", "Fantasy", "Shounen"]);
        assert_eq!(manga.original_language, "en");
        assert!(manga.complete);
        assert_eq!(manga.url, url);
        Ok(())
    }

    #[test]
    fn manga_detail_trusts_caller_completeness() -> Result<(), ScraperError> {
        let url = "https://mangakatana.com/manga/solo-leveling.21708";
        let manga = extract_manga(DETAIL, url, &Arguments::for_url(url))?;
        assert!(!manga.complete);
        Ok(())
    }

    #[test]
    fn manga_detail_without_summary_fails() {
        let html = r#"<div class="info"><h1 class="heading">X</h1></div>"#;
        assert!(matches!(
            extract_manga(html, "u", &Arguments::for_url("u")),
            Err(ScraperError::MissingNode { .. })
        ));
    }

    #[test]
    fn chapter_rows_in_document_order() -> Result<(), ScraperError> {
        let args = Arguments::for_url("https://mangakatana.com/manga/solo-leveling.21708")
            .with("complete", true);
        let chapters = extract_chapters(DETAIL, &base(), &args)?;
        assert_eq!(chapters.len(), 2);

        let newest = &chapters[0];
        assert_eq!(newest.name, "201");
        assert_eq!(newest.chapter_number, 201.0);
        assert_eq!(newest.localization, "en");
        assert_eq!(newest.release_date.to_rfc3339(), "2023-01-05T00:00:00+00:00");
        assert_eq!(
            newest.url,
            "https://mangakatana.com/manga/solo-leveling.21708/c201"
        );
        assert_eq!(newest.source_url, newest.url);
        assert_eq!(newest.writer, vec!["Chugong", "Jang Sung-Lak"]);
        for role in [
            &newest.penciller,
            &newest.inker,
            &newest.colorist,
            &newest.letterer,
            &newest.cover_artist,
        ] {
            assert_eq!(role, &newest.writer);
        }
        assert_eq!(newest.arguments, args);

        assert_eq!(chapters[1].name, "200");
        assert_eq!(
            chapters[1].url,
            "https://mangakatana.com/manga/solo-leveling.21708/c200"
        );
        assert_eq!(chapters[1].release_date.to_rfc3339(), "2022-12-31T00:00:00+00:00");
        Ok(())
    }

    #[test]
    fn fractional_chapter_fails_whole_list() {
        let html = DETAIL.replace("Chapter 200</a>", "Chapter 199.5</a>");
        assert!(matches!(
            extract_chapters(&html, &base(), &Arguments::for_url(BASE)),
            Err(ScraperError::ChapterTitle { .. })
        ));
    }

    #[test]
    fn malformed_date_fails_whole_list() {
        let html = DETAIL.replace("Dec-31-2022", "yesterday");
        assert!(matches!(
            extract_chapters(&html, &base(), &Arguments::for_url(BASE)),
            Err(ScraperError::ReleaseDate { .. })
        ));
    }

    #[test]
    fn chapter_label_pattern() -> Result<(), ScraperError> {
        let pattern = chapter_pattern()?;
        assert_eq!(chapter_label(pattern, "Chapter 12")?, "12");
        assert_eq!(chapter_label(pattern, "Vol.2 Chapter  7: Dawn")?, "7");
        assert_eq!(chapter_label(pattern, "Chapter 12. Dawn")?, "12");
        assert_eq!(chapter_label(pattern, "Chapter 12.")?, "12");
        assert!(chapter_label(pattern, "Chapter 12.5").is_err());
        assert!(chapter_label(pattern, "Extra").is_err());
        Ok(())
    }

    #[test]
    fn chapter_pattern_is_compiled_once() -> Result<(), ScraperError> {
        assert!(std::ptr::eq(chapter_pattern()?, chapter_pattern()?));
        Ok(())
    }

    #[test]
    fn chapter_title_with_trailing_period_is_whole_number() -> Result<(), ScraperError> {
        let html = DETAIL.replace("Chapter 200<", "Chapter 200. Finale<");
        let chapters = extract_chapters(&html, &base(), &Arguments::for_url(BASE))?;
        assert_eq!(chapters[1].name, "200");
        assert_eq!(chapters[1].chapter_number, 200.0);
        Ok(())
    }

    #[test]
    fn release_date_is_utc_midnight() -> Result<(), ScraperError> {
        let dt = parse_release_date("Jan-05-2023")?;
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 1, 5, 0, 0, 0).unwrap());
        Ok(())
    }

    #[test]
    fn pages_preserve_document_order() -> Result<(), ScraperError> {
        let html = r#"<html><body><div id="imgs">
<div id="page0"><img data-src="https://cdn/a.jpg" src="loading.gif"></div>
<div class="wrap_img" id="page1"><img data-src="https://cdn/b.jpg"></div>
<div id="ad"><img data-src="https://cdn/ad.jpg"></div>
<div id="page2"><img data-src="https://cdn/c.jpg"></div>
</div></body></html>"#;
        let pages = extract_pages(html)?;
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://cdn/a.jpg", "https://cdn/b.jpg", "https://cdn/c.jpg"]);
        Ok(())
    }

    #[test]
    fn page_without_lazy_source_fails() {
        let html = r#"<div id="imgs"><div id="page0"><img src="x.jpg"></div></div>"#;
        assert!(matches!(
            extract_pages(html),
            Err(ScraperError::MissingAttribute { attribute: "data-src", .. })
        ));
    }

    #[test]
    fn extractors_are_deterministic() -> Result<(), ScraperError> {
        let args = Arguments::for_url(BASE);
        assert_eq!(
            extract_chapters(DETAIL, &base(), &args)?,
            extract_chapters(DETAIL, &base(), &args)?
        );
        assert_eq!(
            extract_manga(DETAIL, BASE, &args)?,
            extract_manga(DETAIL, BASE, &args)?
        );
        Ok(())
    }
}
