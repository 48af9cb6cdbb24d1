// src/page/parse.rs
// =============================================================================
// Extracts item records from the listing page.
//
// Every item on the page is an <audio> element marked with a `source-type`
// attribute:
//
//   <audio source-type="" in_favorite="" title="Episode 1" src="/a/1.mp3"
//          preload="none"></audio>
//
// We parse the document with `scraper` and read the attributes off each
// element. An item must carry a non-empty title and src; anything else is a
// malformed page and the run stops before downloading.
//
// Rust concepts:
// - Iterators with enumerate(): numbering items for error messages
// - collect::<Result<Vec<_>, _>>(): stop at the first bad item
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ParseError;

/// One downloadable audio item. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDescriptor {
    /// Used as the file name stem
    pub title: String,
    /// Absolute http(s) URL of the audio file
    pub source_url: String,
}

impl ItemDescriptor {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
        }
    }
}

// Parses all item records out of the page, in document order.
//
// Parameters:
//   html: the page body
//   page_url: where the page came from, for resolving relative sources
//
// A page without any item elements gives an empty Vec, not an error.
pub fn parse_items(html: &str, page_url: &str) -> Result<Vec<ItemDescriptor>, ParseError> {
    let base = Url::parse(page_url).map_err(|source| ParseError::PageUrl {
        url: page_url.to_string(),
        source,
    })?;

    let document = Html::parse_document(html);

    // Constant selector, known to be valid
    let selector = Selector::parse("audio[source-type]").unwrap();

    document
        .select(&selector)
        .enumerate()
        .map(|(index, element)| parse_item(index, element, &base))
        .collect()
}

fn parse_item(index: usize, element: ElementRef<'_>, base: &Url) -> Result<ItemDescriptor, ParseError> {
    let title = required_attr(index, element, "title")?;
    let src = required_attr(index, element, "src")?;

    let source_url = match base.join(src) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url.to_string(),
        _ => {
            return Err(ParseError::InvalidSource {
                title: title.to_string(),
                src: src.to_string(),
            })
        }
    };

    Ok(ItemDescriptor::new(title, source_url))
}

fn required_attr<'a>(
    index: usize,
    element: ElementRef<'a>,
    attribute: &'static str,
) -> Result<&'a str, ParseError> {
    element
        .value()
        .attr(attribute)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ParseError::MissingAttribute { index, attribute })
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does "audio[source-type]" select?
//    - Every <audio> element that has a source-type attribute, whatever
//      its value (the page uses an empty string)
//
// 2. Why Url::join for the src?
//    - An absolute src replaces the base entirely
//    - A relative one ("/media/1.mp3") is resolved like a browser would
//
// 3. How does collect() stop at the first error?
//    - Collecting an iterator of Result<T, E> into Result<Vec<T>, E>
//      short-circuits on the first Err
// -----------------------------------------------------------------------------
