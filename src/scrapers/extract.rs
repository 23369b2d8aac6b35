//! Gospel extraction from liturgy pages.
//!
//! Liturgy sites change their markup often, so extraction is a chain of
//! best-effort heuristics, first match wins:
//!
//! 1. a dedicated gospel container found by CSS selector
//! 2. the passage citation (`Lc 5,33-39` and similar) anywhere in the page,
//!    expanded to `Evangelho segundo São Lucas (Lc 5,33-39)`
//! 3. body-text patterns anchored on the usual opening phrases
//!    ("Naquele tempo", "Jesus disse", "Em verdade") or a generic
//!    "Evangelho" heading
//!
//! The chosen body is stripped of liturgical boilerplate, its whitespace is
//! normalized, and the standard closing formula is appended exactly once.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, instrument};

use crate::error::ExtractionError;
use crate::models::{DEFAULT_REFERENCE, GospelRecord, MIN_TEXT_CHARS};
use crate::utils::{char_len, normalize_whitespace, truncate_for_log};

/// A body candidate must be longer than this, after cleanup, to be accepted.
const MIN_BODY_CHARS: usize = 100;

/// Closing formula every displayed reading ends with.
pub const CLOSING_FORMULA: &str = "— Palavra da Salvação.\n— Glória a vós, Senhor.";

const CONTAINER_SELECTORS: &[&str] = &[
    "[data-liturgia=\"evangelho\"]",
    "#evangelho",
    ".evangelho",
    ".liturgia-evangelho",
    "section.gospel",
];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "blockquote", "header", "footer", "tr", "table",
];

static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTAINER_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(mt|mc|lc|jo)\s+(\d+[,:.]\d+[-–]\d+)").unwrap());

static GOSPEL_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bEvangelho\b").unwrap());

/// Ordered body patterns; capture group 1 is the candidate text.
static BODY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    const END: &str = r"(?:Palavra da Salvação|[—–-]\s*Palavra|[—–-]\s*Glória|Conferência Nacional|\z)";
    [
        r"(?is)Glória a vós,?\s*Senhor[.!]?(.*?Naquele tempo.*?)Palavra da Salvação".to_string(),
        format!(r"(?is)(Naquele tempo.*?){END}"),
        format!(r"(?is)(Jesus disse.*?){END}"),
        format!(r"(?is)(Em verdade.*?){END}"),
        format!(r"(?is)\bEvangelho\b[^\n]*\n(.+?){END}"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FORMULA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*[—–-][ \t]*(?:Palavra|Glória)[^\n]*$").unwrap());
static GLORIA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Glória a vós,?\s*Senhor[.!]?").unwrap());
static PALAVRA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Palavra da Salvação[.!]?").unwrap());

/// Extract the gospel of the day from a liturgy page.
///
/// # Errors
///
/// [`ExtractionError::NotFound`] when no heuristic yields a body, and
/// [`ExtractionError::TooShort`] when the only candidate was a gospel
/// container with less than [`MIN_TEXT_CHARS`] usable characters.
#[instrument(level = "debug", skip_all, fields(html_bytes = html.len()))]
pub fn extract(html: &str) -> Result<GospelRecord, ExtractionError> {
    let document = Html::parse_document(html);
    let page = page_text(&document);
    let container = container_text(&document);

    let reference = container
        .as_deref()
        .and_then(find_reference)
        .or_else(|| find_reference_after_heading(&page))
        .unwrap_or_else(|| DEFAULT_REFERENCE.to_string());

    let body = match container {
        Some(text) if char_len(&text) >= MIN_TEXT_CHARS => Some(text),
        Some(text) => match find_body(&page) {
            Some(body) => Some(body),
            None => {
                return Err(ExtractionError::TooShort {
                    chars: char_len(&text),
                });
            }
        },
        None => find_body(&page),
    }
    .ok_or(ExtractionError::NotFound)?;

    debug!(%reference, body = %truncate_for_log(&body, 80), "Extracted gospel");
    GospelRecord::new(reference, with_closing(body))
}

/// Text of the first non-empty gospel container, cleaned.
fn container_text(document: &Html) -> Option<String> {
    CONTAINERS.iter().find_map(|selector| {
        document
            .select(selector)
            .map(|el| clean_body(&visible_text(el)))
            .find(|text| !text.is_empty())
    })
}

/// Visible text of the page body, one block element per line.
fn page_text(document: &Html) -> String {
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());
    visible_text(root)
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(element, &mut out);
    normalize_whitespace(&out)
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }
    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.push('\n');
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_text(child, out);
                }
            }
            _ => {}
        }
    }
    if block {
        out.push('\n');
    }
}

/// Expand the first citation in `text` into a full reference.
fn find_reference(text: &str) -> Option<String> {
    let caps = REFERENCE.captures(text)?;
    let (abbrev, book) = book_name(&caps[1])?;
    Some(format!("Evangelho segundo São {book} ({abbrev} {})", &caps[2]))
}

/// Prefer citations that follow an "Evangelho" heading, since liturgy pages
/// cite the other readings first.
fn find_reference_after_heading(page: &str) -> Option<String> {
    GOSPEL_HEADING
        .find_iter(page)
        .find_map(|m| find_reference(&page[m.start()..]))
        .or_else(|| find_reference(page))
}

fn book_name(abbrev: &str) -> Option<(&'static str, &'static str)> {
    match abbrev.to_lowercase().as_str() {
        "mt" => Some(("Mt", "Mateus")),
        "mc" => Some(("Mc", "Marcos")),
        "lc" => Some(("Lc", "Lucas")),
        "jo" => Some(("Jo", "João")),
        _ => None,
    }
}

fn find_body(page: &str) -> Option<String> {
    BODY_PATTERNS.iter().enumerate().find_map(|(index, pattern)| {
        let body = pattern
            .captures_iter(page)
            .filter_map(|caps| caps.get(1))
            .map(|m| clean_body(m.as_str()))
            .find(|body| char_len(body) > MIN_BODY_CHARS)?;
        debug!(pattern = index, "Body pattern matched");
        Some(body)
    })
}

/// Strip liturgical boilerplate and normalize whitespace.
fn clean_body(raw: &str) -> String {
    let text = FORMULA_LINE.replace_all(raw, "");
    let text = GLORIA.replace_all(&text, "");
    let text = PALAVRA.replace_all(&text, "");
    normalize_whitespace(&text)
}

fn with_closing(body: String) -> String {
    if body.contains(CLOSING_FORMULA) {
        body
    } else {
        format!("{body}\n\n{CLOSING_FORMULA}")
    }
}
