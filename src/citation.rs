use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::types::{Citation, LineRef};

/// Page every parsed reference is attributed to. Citations may mention a
/// page, but only single-page documents are cited, so it is discarded.
pub const CITED_PAGE: u32 = 1;

/// Widest `Lines A-B` range that is expanded. Wider ranges are treated as
/// malformed, the same as `A > B`.
pub const MAX_RANGE_WIDTH: u32 = 10_000;

/// Upper bound on the references collected from one response.
pub const MAX_REFERENCES: usize = 100_000;

static DOCUMENT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^,]+\.pdf), Lines \d+-\d+\)").unwrap());

static LINE_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Lines (\d+)-(\d+)").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CitationError {
    #[error("No document name found in the response.")]
    MissingDocumentName,
    #[error("No lines to highlight.")]
    NoLines,
}

/// Name of the first document cited as `(NAME.pdf, Lines A-B)`.
pub fn parse_document_name(text: &str) -> Option<String> {
    DOCUMENT_NAME_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Every `Lines A-B` range in `text`, expanded to one reference per line.
///
/// Ranges with `A > B`, with numbers too large for a line index, or
/// spanning more than [`MAX_RANGE_WIDTH`] lines expand to nothing. At most
/// [`MAX_REFERENCES`] references are returned.
pub fn parse_references(text: &str) -> Vec<LineRef> {
    LINE_RANGE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let start: u32 = caps[1].parse().ok()?;
            let end: u32 = caps[2].parse().ok()?;
            if end.checked_sub(start)? >= MAX_RANGE_WIDTH {
                return None;
            }
            Some(start..=end)
        })
        .flatten()
        .take(MAX_REFERENCES)
        .map(|line| LineRef { page: CITED_PAGE, line })
        .collect()
}

pub fn parse_citation(text: &str) -> Result<Citation, CitationError> {
    let document_name = parse_document_name(text).ok_or(CitationError::MissingDocumentName)?;
    let references = parse_references(text);
    if references.is_empty() {
        return Err(CitationError::NoLines);
    }
    Ok(Citation { document_name, references })
}
