//! Shared error type for the adapter. Every variant is absorbed at the operation boundary
//! by the fail-open facade; the fallible `try_*` operations expose it directly.

use thiserror::Error;

/// Failure of a single adapter call: missing input, transport, structure, or rendering.
#[derive(Debug, Error)]
pub enum ScraperError {
    // Input
    #[error("There is no {name} in arguments")]
    MissingArgument { name: &'static str },

    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    // HTTP and network
    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parsing
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Expected node not found: {selector}")]
    MissingNode { selector: String },

    #[error("Node {selector} has no text")]
    EmptyText { selector: String },

    #[error("Node {selector} has no {attribute} attribute")]
    MissingAttribute {
        selector: String,
        attribute: &'static str,
    },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        pattern: &'static str,
        reason: String,
    },

    #[error("Could not read page count from pagination entry {text:?}")]
    PageCount { text: String },

    #[error("Chapter title {text:?} does not carry a chapter number")]
    ChapterTitle { text: String },

    #[error("Could not parse release date {text:?}: {source}")]
    ReleaseDate {
        text: String,
        #[source]
        source: chrono::ParseError,
    },

    // Rendering
    #[error("Browser {stage} failed: {message}")]
    Browser {
        stage: &'static str,
        message: String,
    },

    #[error("Timed out waiting for {selector} at {url}")]
    RenderTimeout { selector: String, url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_argument_message_names_the_key() {
        let e = ScraperError::MissingArgument { name: "url" };
        assert_eq!(e.to_string(), "There is no url in arguments");
    }

    #[test]
    fn http_status_message() {
        let e = ScraperError::HttpStatus {
            status: 503,
            url: "https://mangakatana.com/page/1".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "HTTP 503 when fetching: https://mangakatana.com/page/1"
        );
    }

    #[test]
    fn pattern_error_names_the_pattern() {
        let e = ScraperError::InvalidPattern {
            pattern: "(",
            reason: "unclosed group".to_string(),
        };
        assert_eq!(e.to_string(), "invalid pattern \"(\": unclosed group");
    }

    #[test]
    fn release_date_keeps_parse_error_as_source() {
        use std::error::Error as _;
        let source = chrono::NaiveDate::parse_from_str("soon", "%b-%d-%Y").unwrap_err();
        let e = ScraperError::ReleaseDate {
            text: "soon".to_string(),
            source,
        };
        assert!(e.to_string().starts_with("Could not parse release date \"soon\""));
        assert!(e.source().is_some());
    }
}
