//! Property-based tests for output sanitization.
//!
//! Verifies the two load-bearing invariants across random inputs:
//! - cleaning is idempotent: `clean(clean(s)) == clean(s)`
//! - the allow-list is closed: no tag outside the fixed vocabulary
//!   survives cleaning
#![allow(clippy::expect_used, clippy::unwrap_used)]

use once_cell::sync::Lazy;
use proptest::prelude::*;
use regex::Regex;

use toolscout::sanitize::{FALLBACK_MESSAGE, clean_html, escape_markdown_v2, strip_tags};

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

static TAG_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?([a-zA-Z][a-zA-Z0-9-]*)").expect("pattern compiles"));

/// A fragment mixing text, markup, and near-markup noise.
fn markup_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 .,:!?'\u{103}\u{1ec7}-]{0,20}",
        prop::sample::select(vec![
            "<b>", "</b>", "<i>", "</i>", "<code>", "</code>", "<pre>", "</pre>", "<div>",
            "</div>", "<p>", "</p>", "<br>", "<br/>", "<ul>", "<li>", "<script>", "</script>",
            "<style>", "</style>", "<span class=\"x\">", "</span>", "<a href=\"https://x.y\">",
            "<a>", "</a>", "<!-- comment -->", "&amp;", "&lt;", "&nbsp;", "&", "<", ">",
            "<b", "b>", "<B>", "</B>", "<tg-spoiler>", "</tg-spoiler>", "<unknown-tag>",
        ])
        .prop_map(str::to_string),
    ]
}

fn markup_soup() -> impl Strategy<Value = String> {
    prop::collection::vec(markup_fragment(), 0..12).prop_map(|parts| parts.concat())
}

proptest! {
    /// Property: cleaning is a fixed point after one application.
    #[test]
    fn prop_clean_is_idempotent(input in markup_soup()) {
        let once = clean_html(&input);
        let twice = clean_html(&once);
        prop_assert_eq!(once, twice);
    }

    /// Property: cleaning arbitrary unicode text is also idempotent.
    #[test]
    fn prop_clean_is_idempotent_on_arbitrary_strings(input in ".{0,80}") {
        let once = clean_html(&input);
        let twice = clean_html(&once);
        prop_assert_eq!(once, twice);
    }

    /// Property: no tag outside the allow-list survives.
    #[test]
    fn prop_allow_list_is_closed(input in markup_soup()) {
        let cleaned = clean_html(&input);
        for caps in TAG_NAME_RE.captures_iter(&cleaned) {
            let name = caps[1].to_ascii_lowercase();
            prop_assert!(
                ALLOWED_TAGS.contains(&name.as_str()),
                "disallowed tag <{}> in {:?}",
                name,
                cleaned
            );
        }
    }

    /// Property: output is never empty; the fallback covers collapse.
    #[test]
    fn prop_output_never_empty(input in markup_soup()) {
        let cleaned = clean_html(&input);
        prop_assert!(!cleaned.trim().is_empty());
        if cleaned != FALLBACK_MESSAGE {
            prop_assert!(!cleaned.is_empty());
        }
    }

    /// Property: stripping tags leaves no tag tokens behind.
    ///
    /// Entity-free inputs only: decoding `&lt;b&gt;` legitimately
    /// produces literal angle brackets in plain text.
    #[test]
    fn prop_strip_tags_removes_all_allowed_tags(
        input in markup_soup().prop_filter("entity-free", |s| !s.contains('&'))
    ) {
        let stripped = strip_tags(&input);
        for tag in ALLOWED_TAGS {
            let open = format!("<{tag}>");
            let close = format!("</{tag}>");
            prop_assert!(!stripped.contains(&open));
            prop_assert!(!stripped.contains(&close));
        }
    }

    /// Property: markdown escaping doubles nothing outside code spans.
    #[test]
    fn prop_markdown_escape_has_no_unescaped_specials(input in "[a-zA-Z0-9_*\\[\\]().!#+ -]{0,40}") {
        let escaped = escape_markdown_v2(&input);
        let mut chars = escaped.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                // The escaped character follows; skip it.
                chars.next();
            } else {
                prop_assert!(
                    !"_*[]()~`>#+-=|{}.!".contains(ch),
                    "unescaped special {:?} in {:?}",
                    ch,
                    escaped
                );
            }
        }
    }
}
