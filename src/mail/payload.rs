//! Message payload tree and plain-text body recovery
//!
//! A payload is either a leaf part carrying encoded bytes with a content
//! type, or a composite part holding child parts (multipart/*). Extraction
//! is a structural recursion over that shape: plain-text leaves are decoded
//! verbatim, markup leaves are decoded then stripped, everything else is
//! ignored. The result is a single whitespace-normalized string; an empty
//! result is detectable but never an error.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;

/// One node of a message payload tree.
#[derive(Debug, Clone)]
pub enum MessagePayload {
    Leaf {
        content_type: String,
        /// Declared size of the part; zero-size parts are phantom and skipped
        size: u64,
        /// URL-safe base64 body data, as delivered by the provider
        data: Option<String>,
    },
    Composite {
        children: Vec<MessagePayload>,
    },
}

/// Wire shape of a payload part as stored in mailbox JSON files
/// (mirrors the Gmail API part structure).
#[derive(Debug, Clone, Deserialize)]
pub struct RawPart {
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,

    #[serde(default)]
    pub body: Option<RawBody>,

    #[serde(default)]
    pub parts: Vec<RawPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBody {
    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub data: Option<String>,
}

impl From<RawPart> for MessagePayload {
    fn from(part: RawPart) -> Self {
        if !part.parts.is_empty() {
            MessagePayload::Composite {
                children: part.parts.into_iter().map(Into::into).collect(),
            }
        } else {
            let (size, data) = part
                .body
                .map(|b| (b.size, b.data))
                .unwrap_or((0, None));
            MessagePayload::Leaf {
                content_type: part.mime_type,
                size,
                data,
            }
        }
    }
}

/// Recover a clean plain-text body from a payload tree.
///
/// Pure function of the payload. Returns an empty string when no part
/// yields text; the caller decides whether that matters.
pub fn extract_text(payload: &MessagePayload) -> String {
    let raw = extract_node(payload);
    collapse_whitespace(&raw)
}

fn extract_node(payload: &MessagePayload) -> String {
    match payload {
        MessagePayload::Leaf {
            content_type,
            size,
            data,
        } => {
            // Providers emit empty placeholder parts with a data field
            // still present; the declared size is the reliable signal.
            if *size == 0 {
                return String::new();
            }
            let Some(encoded) = data else {
                return String::new();
            };
            let decoded = decode_part(encoded);
            let ct = content_type.to_ascii_lowercase();
            if ct.starts_with("text/plain") {
                decoded
            } else if ct.starts_with("text/html") {
                strip_markup(&decoded)
            } else {
                // Unknown or binary content types are ignored, not errors
                String::new()
            }
        }
        MessagePayload::Composite { children } => {
            let fragments: Vec<String> = children
                .iter()
                .map(extract_node)
                .filter(|s| !s.trim().is_empty())
                .collect();
            fragments.join("\n")
        }
    }
}

/// Decode URL-safe base64 part data, tolerating missing padding.
fn decode_part(encoded: &str) -> String {
    let trimmed = encoded.trim();
    let padded;
    let input = match trimmed.len() % 4 {
        0 => trimmed,
        rem => {
            padded = format!("{}{}", trimmed, "=".repeat(4 - rem));
            &padded
        }
    };
    match URL_SAFE.decode(input) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// Strip markup down to its text content.
///
/// Removes style/script blocks, link and meta tags, comments, media-query
/// and leftover brace-delimited CSS fragments, then all remaining tags,
/// and finally decodes the common entities.
fn strip_markup(html: &str) -> String {
    let style_pattern = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let script_pattern = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let head_pattern = Regex::new(r"(?is)<head[^>]*>.*?</head>").unwrap();
    let comment_pattern = Regex::new(r"(?s)<!--.*?-->").unwrap();
    let link_pattern = Regex::new(r"(?i)<(?:link|meta)[^>]*>").unwrap();
    let media_pattern = Regex::new(r"(?s)@media[^{]*\{(?:[^{}]*\{[^{}]*\})*[^{}]*\}").unwrap();
    let css_rule_pattern = Regex::new(r"(?s)[.#@]?[\w\s,.:\-]*\{[^{}]*\}").unwrap();
    let tag_pattern = Regex::new(r"(?s)<[^>]+>").unwrap();

    let mut text = html.to_string();
    text = style_pattern.replace_all(&text, " ").to_string();
    text = script_pattern.replace_all(&text, " ").to_string();
    text = head_pattern.replace_all(&text, " ").to_string();
    text = comment_pattern.replace_all(&text, " ").to_string();
    text = link_pattern.replace_all(&text, " ").to_string();
    text = media_pattern.replace_all(&text, " ").to_string();
    text = tag_pattern.replace_all(&text, " ").to_string();
    // CSS fragments that leaked outside a <style> block
    text = css_rule_pattern.replace_all(&text, " ").to_string();

    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Collapse all runs of whitespace to a single space and trim.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
