//! Anchor extraction for HTML directory listings.
//!
//! Listings are scanned with static regexes rather than a DOM: only `<a>`
//! start tags and their `href` attribute matter. Comments are stripped
//! first so commented-out links do not count as anchors.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;
use url::Url;

use super::ListingEntry;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?s)<!--.*?-->"));

/// Any start/end tag, doctype or comment opener. Used to tell HTML from plain bytes.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"<[A-Za-z!/]"));

/// `<a ...>` start tags. Group 1 holds the attribute text; quoted values may contain `>`.
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?i)<a((?:\s(?:[^>"']|"[^"]*"|'[^']*')*)?)/?>"#)
});

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?i)(?:^|\s)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|amp|lt|gt|quot|apos);")
});

/// Why a listing body was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParseFailure {
    NotUtf8,
    NotHtml,
}

impl ParseFailure {
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Self::NotUtf8 => "body is not valid UTF-8",
            Self::NotHtml => "body contains no HTML markup",
        }
    }
}

/// Parses a listing body into entries, dropping the first anchor.
///
/// The first anchor is the parent-directory link by convention; it is
/// skipped by position, never by content.
pub(crate) fn parse_listing(base: &Url, body: &[u8]) -> Result<Vec<ListingEntry>, ParseFailure> {
    let html = std::str::from_utf8(body).map_err(|_| ParseFailure::NotUtf8)?;
    if !TAG_RE.is_match(html) {
        return Err(ParseFailure::NotHtml);
    }

    Ok(extract_hrefs(html)
        .into_iter()
        .skip(1)
        .filter_map(|href| to_entry(base, href))
        .collect())
}

/// Returns one item per anchor in document order; `None` when the anchor has no `href`.
pub(crate) fn extract_hrefs(html: &str) -> Vec<Option<String>> {
    let without_comments = COMMENT_RE.replace_all(html, "");
    ANCHOR_RE
        .captures_iter(&without_comments)
        .map(|anchor| {
            let attributes = anchor.get(1).map_or("", |m| m.as_str());
            HREF_RE.captures(attributes).map(|href| {
                let raw = href
                    .get(1)
                    .or_else(|| href.get(2))
                    .or_else(|| href.get(3))
                    .map_or("", |m| m.as_str());
                decode_entities(raw.trim())
            })
        })
        .collect()
}

fn to_entry(base: &Url, href: Option<String>) -> Option<ListingEntry> {
    let Some(href) = href else {
        return Some(ListingEntry {
            name: String::new(),
            is_directory: false,
            resolved_url: base.clone(),
        });
    };

    match base.join(&href) {
        Ok(resolved_url) => Some(ListingEntry {
            is_directory: href.ends_with('/'),
            name: href,
            resolved_url,
        }),
        Err(error) => {
            warn!(base = %base, href = %href, %error, "dropping anchor with unresolvable href");
            None
        }
    }
}

fn decode_entities(raw: &str) -> String {
    ENTITY_RE
        .replace_all(raw, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map_or_else(
                        || entity[1..].parse::<u32>().ok(),
                        |hex| u32::from_str_radix(hex, 16).ok(),
                    )
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://archive.example/north/daily/geotiff/").unwrap()
    }

    fn names(entries: &[ListingEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_first_anchor_is_skipped_regardless_of_content() {
        let html = r#"<html><body>
            <a href="2021/">A</a>
            <a href="2022/">B</a>
            <a href="file_20220101_extent_v4.0.tif">C</a>
        </body></html>"#;

        let entries = parse_listing(&base(), html.as_bytes()).unwrap();
        assert_eq!(names(&entries), ["2022/", "file_20220101_extent_v4.0.tif"]);
    }

    #[test]
    fn test_directory_classification_uses_trailing_slash_only() {
        let html = r#"<a href="../">Parent</a>
            <a href="2021/">2021/</a>
            <a href="readme.txt">readme</a>
            <a href="odd.tif/">odd</a>"#;

        let entries = parse_listing(&base(), html.as_bytes()).unwrap();
        let dirs: Vec<bool> = entries.iter().map(|e| e.is_directory).collect();
        assert_eq!(dirs, [true, false, true]);
    }

    #[test]
    fn test_hrefs_resolve_to_absolute_urls() {
        let html = r#"<a href="../">Parent</a>
            <a href="2021/">2021/</a>
            <a href="/other/root.tif">abs path</a>
            <a href="https://mirror.example/x.tif">abs url</a>"#;

        let entries = parse_listing(&base(), html.as_bytes()).unwrap();
        let urls: Vec<&str> = entries.iter().map(|e| e.resolved_url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://archive.example/north/daily/geotiff/2021/",
                "https://archive.example/other/root.tif",
                "https://mirror.example/x.tif",
            ]
        );
    }

    #[test]
    fn test_anchor_without_href_passes_through() {
        let html = r#"<a href="../">Parent</a><a name="top">anchor</a><a href="b.tif">b</a>"#;

        let entries = parse_listing(&base(), html.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "");
        assert!(!entries[0].is_directory);
        assert_eq!(entries[0].resolved_url, base());
        assert_eq!(entries[1].name, "b.tif");
    }

    #[test]
    fn test_quote_styles_and_case() {
        let html = r#"<A HREF="../">Parent</A>
            <a class="x" href='single.tif'>s</a>
            <a href=bare.tif>b</a>
            <a title="a > b" href="after_gt.tif">g</a>"#;

        let entries = parse_listing(&base(), html.as_bytes()).unwrap();
        assert_eq!(names(&entries), ["single.tif", "bare.tif", "after_gt.tif"]);
    }

    #[test]
    fn test_non_anchor_tags_and_data_attributes_ignored() {
        let html = r#"<a href="../">Parent</a>
            <abbr title="x">abbr</abbr>
            <area href="map.tif">
            <a data-href="wrong.tif" href="right.tif">r</a>
            <!-- <a href="commented.tif">c</a> -->"#;

        let entries = parse_listing(&base(), html.as_bytes()).unwrap();
        assert_eq!(names(&entries), ["right.tif"]);
    }

    #[test]
    fn test_entities_are_decoded() {
        let html = r#"<a href="../">P</a><a href="a&amp;b_&#x41;&#66;.tif">e</a>"#;

        let entries = parse_listing(&base(), html.as_bytes()).unwrap();
        assert_eq!(entries[0].name, "a&b_AB.tif");
    }

    #[test]
    fn test_unknown_entity_left_verbatim() {
        assert_eq!(decode_entities("a&nbsp;b"), "a&nbsp;b");
        assert_eq!(decode_entities("&#1114112;"), "&#1114112;");
    }

    #[test]
    fn test_listing_with_only_parent_link_is_empty() {
        let html = r#"<html><a href="../">Parent Directory</a></html>"#;
        assert!(parse_listing(&base(), html.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_non_utf8_body_rejected() {
        let body = [0x3c, 0x61, 0xff, 0xfe, 0x3e];
        assert_eq!(
            parse_listing(&base(), &body).unwrap_err(),
            ParseFailure::NotUtf8
        );
    }

    #[test]
    fn test_plain_text_body_rejected() {
        assert_eq!(
            parse_listing(&base(), b"II*\0 raster bytes").unwrap_err(),
            ParseFailure::NotHtml
        );
        assert_eq!(
            parse_listing(&base(), b"").unwrap_err(),
            ParseFailure::NotHtml
        );
    }

    #[test]
    fn test_extract_hrefs_keeps_document_order_and_missing_hrefs() {
        let hrefs = extract_hrefs(r#"<a href="x/">x</a><a>none</a><a href="y">y</a>"#);
        assert_eq!(
            hrefs,
            [Some("x/".to_string()), None, Some("y".to_string())]
        );
    }
}
