//! HTML allow-list filter.
//!
//! A single-pass tag-stream filter: the input is tokenized into tags,
//! comments, and text; allow-listed tags are re-emitted in normalized
//! form, everything else is unwrapped so its inner text survives.
//! Script and style containers are dropped together with their content.
//!
//! The filter is idempotent: normalized output re-tokenizes to the same
//! token stream and escapes to itself.

use once_cell::sync::Lazy;
use regex::Regex;

/// Returned when sanitization collapses the whole output to nothing.
pub const FALLBACK_MESSAGE: &str = "the model could not produce a valid response for this query";

/// Inline formatting tags the chat surface accepts.
const ALLOWED_TAGS: &[&str] = &[
    "b",
    "strong",
    "i",
    "em",
    "u",
    "ins",
    "s",
    "strike",
    "del",
    "tg-spoiler",
    "a",
    "code",
    "pre",
];

/// Containers whose content is never user text.
const DROP_CONTENT_TAGS: &[&str] = &["script", "style"];

/// Matches a comment or a tag token. Text lives between matches.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)<!--.*?-->|<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:[\s/][^<>]*)?)>")
        .expect("token pattern compiles")
});

/// Extracts an href attribute value from a raw attribute string.
static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'<>]+))"#)
        .expect("href pattern compiles")
});

/// Recognizes a supported entity at the start of a string. Named
/// entities beyond these four are not understood by the chat surface
/// and get their ampersand escaped instead.
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^&(?:amp|lt|gt|quot|#[0-9]{1,7}|#x[0-9a-fA-F]{1,6});")
        .expect("entity pattern compiles")
});

/// Cleans model-generated markup down to the allowed tag vocabulary.
///
/// - Allow-listed tags are re-emitted with attributes stripped
///   (hyperlinks keep a normalized `href`).
/// - Disallowed tags are unwrapped, preserving their inner text;
///   `script`/`style` lose their content as well.
/// - Comments are stripped, stray close tags dropped, unclosed tags
///   closed at end of output.
/// - Text is entity-escaped so a literal `<` or `&` can never confuse
///   the chat surface's parser.
/// - Output that trims to empty collapses to [`FALLBACK_MESSAGE`].
#[must_use]
pub fn clean_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut open_stack: Vec<String> = Vec::new();
    let mut dropping_until: Option<String> = None;
    let mut cursor = 0;

    for token in TOKEN_RE.find_iter(raw) {
        let text = &raw[cursor..token.start()];
        cursor = token.end();
        if dropping_until.is_none() {
            escape_text(&mut out, text);
        }

        let tag = token.as_str();
        if tag.starts_with("<!--") {
            continue;
        }

        let Some(caps) = TOKEN_RE.captures(tag) else {
            continue;
        };
        let is_close = caps.get(1).is_some_and(|m| m.as_str() == "/");
        let name = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();

        if let Some(ref waiting) = dropping_until {
            if is_close && name == *waiting {
                dropping_until = None;
            }
            continue;
        }

        if DROP_CONTENT_TAGS.contains(&name.as_str()) {
            if !is_close {
                dropping_until = Some(name);
            }
            continue;
        }

        if !ALLOWED_TAGS.contains(&name.as_str()) {
            // Unwrapped: the tag disappears, its inner text already flows.
            continue;
        }

        if is_close {
            close_tag(&mut out, &mut open_stack, &name);
        } else {
            let attrs = caps.get(3).map_or("", |m| m.as_str());
            open_tag(&mut out, &mut open_stack, &name, attrs);
        }
    }

    if dropping_until.is_none() {
        escape_text(&mut out, &raw[cursor..]);
    }

    // Repair unclosed markup so the parser downstream never sees an
    // unbalanced stream.
    while let Some(name) = open_stack.pop() {
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Removes every tag and comment, decoding basic entities.
///
/// Used by the render-degrade ladder when the chat surface rejects even
/// sanitized markup and the reply is resent as plain text.
#[must_use]
pub fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut dropping_until: Option<String> = None;
    let mut cursor = 0;

    for token in TOKEN_RE.find_iter(raw) {
        if dropping_until.is_none() {
            out.push_str(&raw[cursor..token.start()]);
        }
        cursor = token.end();

        let tag = token.as_str();
        if tag.starts_with("<!--") {
            continue;
        }
        let Some(caps) = TOKEN_RE.captures(tag) else {
            continue;
        };
        let is_close = caps.get(1).is_some_and(|m| m.as_str() == "/");
        let name = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();

        match dropping_until {
            Some(ref waiting) => {
                if is_close && name == *waiting {
                    dropping_until = None;
                }
            },
            None => {
                if !is_close && DROP_CONTENT_TAGS.contains(&name.as_str()) {
                    dropping_until = Some(name);
                }
            },
        }
    }

    if dropping_until.is_none() {
        out.push_str(&raw[cursor..]);
    }

    decode_entities(&out).trim().to_string()
}

/// Emits a normalized open tag and records it on the stack.
///
/// Hyperlinks keep a normalized `href`; an `<a>` without one is
/// unwrapped since it cannot render.
fn open_tag(out: &mut String, open_stack: &mut Vec<String>, name: &str, attrs: &str) {
    if name == "a" {
        let href = HREF_RE.captures(attrs).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
        });
        let Some(href) = href else {
            return;
        };
        out.push_str("<a href=\"");
        escape_attr(out, &href);
        out.push_str("\">");
    } else {
        out.push('<');
        out.push_str(name);
        out.push('>');
    }
    open_stack.push(name.to_string());
}

/// Emits a close tag, auto-closing any inner unclosed tags first.
/// A close with no matching open is dropped.
fn close_tag(out: &mut String, open_stack: &mut Vec<String>, name: &str) {
    if !open_stack.iter().any(|open| open == name) {
        return;
    }
    while let Some(open) = open_stack.pop() {
        out.push_str("</");
        out.push_str(&open);
        out.push('>');
        if open == name {
            break;
        }
    }
}

/// Entity-escapes a text segment.
///
/// A `&` that already begins a well-formed entity is copied verbatim,
/// which is what makes repeated cleaning a fixed point.
fn escape_text(out: &mut String, text: &str) {
    let mut rest = text;
    while let Some(pos) = rest.find(['<', '>', '&']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with('<') {
            out.push_str("&lt;");
            rest = &tail[1..];
        } else if tail.starts_with('>') {
            out.push_str("&gt;");
            rest = &tail[1..];
        } else if let Some(entity) = ENTITY_RE.find(tail) {
            out.push_str(entity.as_str());
            rest = &tail[entity.end()..];
        } else {
            out.push_str("&amp;");
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
}

/// Entity-escapes an attribute value (quotes must not terminate it).
fn escape_attr(out: &mut String, value: &str) {
    let mut buf = String::with_capacity(value.len());
    escape_text(&mut buf, value);
    out.push_str(&buf.replace('"', "&quot;"));
}

/// Decodes the entities [`escape_text`] can produce, for plain-text sends.
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
