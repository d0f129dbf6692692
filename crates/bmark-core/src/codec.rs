//! Interchange codecs for URL→tags mappings
//!
//! Three symmetric formats (text, JSON, CBOR) plus write-only HTML
//! rendering. The text format is tab-separated — URL first, then tags —
//! instead of the space-split format this tool historically used, which
//! silently mis-parsed URLs containing spaces. The constraint is that
//! URLs and tags must not contain tabs or newlines; `encode` rejects
//! values that do rather than producing unparseable lines.
//!
//! Listings come in two shapes, mirrored in every format: a bare URL
//! list when no tag detail was requested, and a URL→tags mapping when
//! it was.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::models::{Listing, TagSummary};
use crate::storage::error::{StoreError, StoreResult};

/// A decoded URL→tags mapping, as consumed by `Store::import`
pub type Mapping = BTreeMap<String, Vec<String>>;

/// Interchange formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Tab-separated lines: URL first, then tags
    Text,
    /// JSON object `{url: [tags]}`, or array of URLs without detail
    Json,
    /// CBOR with the same two shapes as JSON
    Binary,
    /// Static HTML page (write-only)
    Html,
}

impl Format {
    /// All accepted format names, for usage errors
    pub const NAMES: &'static [&'static str] = &["text", "json", "binary", "html"];
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Text => "text",
            Format::Json => "json",
            Format::Binary => "binary",
            Format::Html => "html",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "binary" => Ok(Format::Binary),
            "html" => Ok(Format::Html),
            other => Err(format!(
                "unknown format '{}' (expected one of: {})",
                other,
                Format::NAMES.join(", ")
            )),
        }
    }
}

// ==================== Encoding ====================

/// Encode a `list` result for output
///
/// `title` is only used by the HTML renderer.
pub fn encode_listing(listing: &Listing, format: Format, title: &str) -> StoreResult<Vec<u8>> {
    // Matches the historical convention: the listing is bare as soon as
    // any entry lacks detail.
    let bare = listing.values().any(|tags| tags.is_none());

    match format {
        Format::Text => {
            let mut out = String::new();
            for (url, tags) in listing {
                out.push_str(check_field(url)?);
                if let Some(tags) = tags {
                    for tag in tags {
                        out.push('\t');
                        out.push_str(check_field(tag)?);
                    }
                }
                out.push('\n');
            }
            Ok(out.into_bytes())
        }
        Format::Json => {
            let mut bytes = if bare {
                let urls: Vec<&String> = listing.keys().collect();
                serde_json::to_vec(&urls).map_err(|e| json_decode_err(e.to_string()))?
            } else {
                let map: BTreeMap<&String, &Vec<String>> = listing
                    .iter()
                    .filter_map(|(url, tags)| tags.as_ref().map(|t| (url, t)))
                    .collect();
                serde_json::to_vec(&map).map_err(|e| json_decode_err(e.to_string()))?
            };
            bytes.push(b'\n');
            Ok(bytes)
        }
        Format::Binary => {
            if bare {
                let urls: Vec<&String> = listing.keys().collect();
                cbor_encode(&urls)
            } else {
                let map: BTreeMap<&String, &Vec<String>> = listing
                    .iter()
                    .filter_map(|(url, tags)| tags.as_ref().map(|t| (url, t)))
                    .collect();
                cbor_encode(&map)
            }
        }
        Format::Html => {
            let items = listing
                .iter()
                .map(|(url, tags)| (url.as_str(), tags.as_ref().map(|t| t.join(", "))));
            Ok(render_page(title, items).into_bytes())
        }
    }
}

/// Encode a `tags` result for output
///
/// The vector's ordering (ascending count for statistics, alphabetical
/// for unions) is preserved by the text and HTML formats.
pub fn encode_tags(tags: &TagSummary, format: Format, title: &str) -> StoreResult<Vec<u8>> {
    let bare = tags.iter().any(|(_, count)| count.is_none());

    match format {
        Format::Text => {
            let mut out = String::new();
            for (name, count) in tags {
                out.push_str(check_field(name)?);
                if let Some(count) = count {
                    out.push('\t');
                    out.push_str(&count.to_string());
                }
                out.push('\n');
            }
            Ok(out.into_bytes())
        }
        Format::Json => {
            let mut bytes = if bare {
                let names: Vec<&String> = tags.iter().map(|(name, _)| name).collect();
                serde_json::to_vec(&names).map_err(|e| json_decode_err(e.to_string()))?
            } else {
                let map: BTreeMap<&String, i64> = tags
                    .iter()
                    .filter_map(|(name, count)| count.map(|c| (name, c)))
                    .collect();
                serde_json::to_vec(&map).map_err(|e| json_decode_err(e.to_string()))?
            };
            bytes.push(b'\n');
            Ok(bytes)
        }
        Format::Binary => {
            if bare {
                let names: Vec<&String> = tags.iter().map(|(name, _)| name).collect();
                cbor_encode(&names)
            } else {
                let map: BTreeMap<&String, i64> = tags
                    .iter()
                    .filter_map(|(name, count)| count.map(|c| (name, c)))
                    .collect();
                cbor_encode(&map)
            }
        }
        Format::Html => {
            let items = tags
                .iter()
                .map(|(name, count)| (name.as_str(), count.map(|c| c.to_string())));
            Ok(render_page(title, items).into_bytes())
        }
    }
}

// ==================== Decoding ====================

/// Decode a serialized URL→tags mapping for import
///
/// Bare URL lists decode to entries with empty tag lists. Tag lists are
/// normalized to sorted, deduplicated order. HTML is rendering-only and
/// rejected here.
pub fn decode_listing(data: &[u8], format: Format) -> StoreResult<Mapping> {
    let mapping = match format {
        Format::Html => {
            return Err(StoreError::UnsupportedImport {
                format: Format::Html,
            })
        }
        Format::Text => decode_text(data)?,
        Format::Json => decode_json(data)?,
        Format::Binary => decode_binary(data)?,
    };

    Ok(mapping
        .into_iter()
        .map(|(url, tags)| {
            let tags: BTreeSet<String> = tags.into_iter().collect();
            (url, tags.into_iter().collect())
        })
        .collect())
}

fn decode_text(data: &[u8]) -> StoreResult<Mapping> {
    let text = std::str::from_utf8(data).map_err(|e| StoreError::Decode {
        format: Format::Text,
        details: format!("invalid UTF-8: {}", e),
    })?;

    let mut mapping = Mapping::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let url = fields.next().unwrap_or("");
        if url.is_empty() {
            return Err(StoreError::Decode {
                format: Format::Text,
                details: format!("line has no URL field: {:?}", line),
            });
        }
        let tags: Vec<String> = fields
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        mapping.entry(url.to_string()).or_default().extend(tags);
    }
    Ok(mapping)
}

fn decode_json(data: &[u8]) -> StoreResult<Mapping> {
    let value: serde_json::Value =
        serde_json::from_slice(data).map_err(|e| json_decode_err(e.to_string()))?;

    match value {
        serde_json::Value::Object(_) => {
            serde_json::from_value(value).map_err(|e| json_decode_err(e.to_string()))
        }
        serde_json::Value::Array(_) => {
            let urls: Vec<String> =
                serde_json::from_value(value).map_err(|e| json_decode_err(e.to_string()))?;
            Ok(urls.into_iter().map(|url| (url, Vec::new())).collect())
        }
        _ => Err(json_decode_err(
            "expected an object or an array".to_string(),
        )),
    }
}

fn decode_binary(data: &[u8]) -> StoreResult<Mapping> {
    if let Ok(mapping) = ciborium::de::from_reader::<Mapping, _>(data) {
        return Ok(mapping);
    }
    let urls: Vec<String> =
        ciborium::de::from_reader(data).map_err(|e| StoreError::Decode {
            format: Format::Binary,
            details: e.to_string(),
        })?;
    Ok(urls.into_iter().map(|url| (url, Vec::new())).collect())
}

// ==================== Helpers ====================

/// Reject values the tab-separated text format cannot represent
fn check_field(value: &str) -> StoreResult<&str> {
    if value.contains('\t') || value.contains('\n') {
        return Err(StoreError::Unencodable {
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn json_decode_err(details: String) -> StoreError {
    StoreError::Decode {
        format: Format::Json,
        details,
    }
}

fn cbor_encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| match e {
        ciborium::ser::Error::Io(e) => StoreError::Io(e),
        ciborium::ser::Error::Value(details) => StoreError::Unencodable { value: details },
    })?;
    Ok(buf)
}

/// Render a static HTML page listing entries with optional detail
fn render_page<'a>(
    title: &str,
    items: impl Iterator<Item = (&'a str, Option<String>)>,
) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str(&format!("<title>{}</title>\n", escape(title)));
    page.push_str("</head>\n<body>\n");
    page.push_str(&format!("<h1>{}</h1>\n", escape(title)));
    page.push_str("<ul>\n");
    for (name, detail) in items {
        match detail {
            Some(detail) if !detail.is_empty() => page.push_str(&format!(
                "<li>{} <em>{}</em></li>\n",
                escape(name),
                escape(&detail)
            )),
            _ => page.push_str(&format!("<li>{}</li>\n", escape(name))),
        }
    }
    page.push_str("</ul>\n</body>\n</html>\n");
    page
}

/// Minimal HTML entity escaping
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detailed_listing() -> Listing {
        let mut listing = Listing::new();
        listing.insert(
            "http://a".to_string(),
            Some(vec!["x".to_string(), "y".to_string()]),
        );
        listing.insert("http://b".to_string(), Some(vec!["x".to_string()]));
        listing
    }

    fn bare_listing() -> Listing {
        let mut listing = Listing::new();
        listing.insert("http://a".to_string(), None);
        listing.insert("http://b".to_string(), None);
        listing
    }

    fn as_mapping(listing: &Listing) -> Mapping {
        listing
            .iter()
            .map(|(url, tags)| (url.clone(), tags.clone().unwrap_or_default()))
            .collect()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("text".parse::<Format>().unwrap(), Format::Text);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("binary".parse::<Format>().unwrap(), Format::Binary);
        assert_eq!("html".parse::<Format>().unwrap(), Format::Html);
        assert!("yaml".parse::<Format>().is_err());
    }

    #[test]
    fn test_text_round_trip_detailed() {
        let listing = detailed_listing();
        let bytes = encode_listing(&listing, Format::Text, "").unwrap();
        let decoded = decode_listing(&bytes, Format::Text).unwrap();
        assert_eq!(decoded, as_mapping(&listing));
    }

    #[test]
    fn test_text_round_trip_bare() {
        let listing = bare_listing();
        let bytes = encode_listing(&listing, Format::Text, "").unwrap();
        assert_eq!(bytes, b"http://a\nhttp://b\n");
        let decoded = decode_listing(&bytes, Format::Text).unwrap();
        assert_eq!(decoded, as_mapping(&listing));
    }

    #[test]
    fn test_json_round_trip_detailed() {
        let listing = detailed_listing();
        let bytes = encode_listing(&listing, Format::Json, "").unwrap();
        let decoded = decode_listing(&bytes, Format::Json).unwrap();
        assert_eq!(decoded, as_mapping(&listing));
    }

    #[test]
    fn test_json_bare_is_array() {
        let bytes = encode_listing(&bare_listing(), Format::Json, "").unwrap();
        assert_eq!(bytes, b"[\"http://a\",\"http://b\"]\n");
        let decoded = decode_listing(&bytes, Format::Json).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded["http://a"].is_empty());
    }

    #[test]
    fn test_binary_round_trip_detailed() {
        let listing = detailed_listing();
        let bytes = encode_listing(&listing, Format::Binary, "").unwrap();
        let decoded = decode_listing(&bytes, Format::Binary).unwrap();
        assert_eq!(decoded, as_mapping(&listing));
    }

    #[test]
    fn test_binary_round_trip_bare() {
        let listing = bare_listing();
        let bytes = encode_listing(&listing, Format::Binary, "").unwrap();
        let decoded = decode_listing(&bytes, Format::Binary).unwrap();
        assert_eq!(decoded, as_mapping(&listing));
    }

    #[test]
    fn test_decode_normalizes_tag_order() {
        let data = b"http://a\tz\ty\tz\n";
        let decoded = decode_listing(data, Format::Text).unwrap();
        assert_eq!(decoded["http://a"], vec!["y", "z"]);
    }

    #[test]
    fn test_text_rejects_embedded_tab() {
        let mut listing = Listing::new();
        listing.insert("http://a".to_string(), Some(vec!["has\ttab".to_string()]));
        let err = encode_listing(&listing, Format::Text, "").unwrap_err();
        assert!(matches!(err, StoreError::Unencodable { .. }));
    }

    #[test]
    fn test_text_decode_rejects_missing_url() {
        let err = decode_listing(b"\torphan-tag\n", Format::Text).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_html_import_rejected() {
        let err = decode_listing(b"<html></html>", Format::Html).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedImport { .. }));
    }

    #[test]
    fn test_html_render() {
        let bytes = encode_listing(&detailed_listing(), Format::Html, "x y").unwrap();
        let page = String::from_utf8(bytes).unwrap();
        assert!(page.contains("<title>x y</title>"));
        assert!(page.contains("<li>http://a <em>x, y</em></li>"));
        assert!(page.contains("<li>http://b <em>x</em></li>"));
    }

    #[test]
    fn test_html_escapes_entities() {
        let mut listing = Listing::new();
        listing.insert("http://a?q=1&r=<2>".to_string(), None);
        let bytes = encode_listing(&listing, Format::Html, "All urls").unwrap();
        let page = String::from_utf8(bytes).unwrap();
        assert!(page.contains("http://a?q=1&amp;r=&lt;2&gt;"));
    }

    #[test]
    fn test_encode_tags_with_counts() {
        let tags = vec![
            ("y".to_string(), Some(1)),
            ("x".to_string(), Some(2)),
        ];
        let bytes = encode_tags(&tags, Format::Text, "").unwrap();
        assert_eq!(bytes, b"y\t1\nx\t2\n");
    }

    #[test]
    fn test_encode_tags_bare() {
        let tags = vec![("x".to_string(), None), ("y".to_string(), None)];
        let bytes = encode_tags(&tags, Format::Text, "").unwrap();
        assert_eq!(bytes, b"x\ny\n");

        let bytes = encode_tags(&tags, Format::Json, "").unwrap();
        assert_eq!(bytes, b"[\"x\",\"y\"]\n");
    }

    #[test]
    fn test_decode_json_rejects_scalar() {
        let err = decode_listing(b"42", Format::Json).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}
