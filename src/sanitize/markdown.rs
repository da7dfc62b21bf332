//! MarkdownV2 escaping for plain-text service messages.
//!
//! The MarkdownV2 dialect treats a fixed set of punctuation as markup.
//! Code spans are located first and restored verbatim; every special
//! character outside them is backslash-escaped.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters the MarkdownV2 dialect reserves outside code spans.
const SPECIAL_CHARS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Fenced blocks and inline backtick spans, matched before escaping.
static CODE_SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)```.*?```|`[^`\n]*`").expect("code span pattern compiles")
});

/// Escapes text for the MarkdownV2 dialect.
///
/// Code spans (fenced or inline) are excluded from escaping and restored
/// verbatim; all other occurrences of the special character set get a
/// leading backslash.
#[must_use]
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut cursor = 0;

    for span in CODE_SPAN_RE.find_iter(text) {
        escape_segment(&mut out, &text[cursor..span.start()]);
        out.push_str(span.as_str());
        cursor = span.end();
    }
    escape_segment(&mut out, &text[cursor..]);

    out
}

/// Escapes one non-code segment.
fn escape_segment(out: &mut String, segment: &str) {
    for ch in segment.chars() {
        if SPECIAL_CHARS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_plain_specials() {
        assert_eq!(escape_markdown_v2("hello_world"), "hello\\_world");
        assert_eq!(escape_markdown_v2("a.b.c"), "a\\.b\\.c");
        assert_eq!(escape_markdown_v2("test (value)"), "test \\(value\\)");
        assert_eq!(escape_markdown_v2("no special"), "no special");
    }

    #[test]
    fn test_inline_code_is_preserved_verbatim() {
        assert_eq!(
            escape_markdown_v2("run `nmap -sV target.com` now."),
            "run `nmap -sV target.com` now\\."
        );
    }

    #[test]
    fn test_fenced_block_is_preserved_verbatim() {
        let text = "before.\n```bash\nnmap -sV -p 80,443 example.com\n```\nafter!";
        let escaped = escape_markdown_v2(text);
        assert!(escaped.contains("```bash\nnmap -sV -p 80,443 example.com\n```"));
        assert!(escaped.starts_with("before\\."));
        assert!(escaped.ends_with("after\\!"));
    }

    #[test]
    fn test_unterminated_backtick_is_escaped() {
        assert_eq!(escape_markdown_v2("oops ` dangling"), "oops \\` dangling");
    }

    #[test]
    fn test_all_specials_escape() {
        let input: String = SPECIAL_CHARS.iter().collect();
        let escaped = escape_markdown_v2(&input);
        // A backtick pair would form a code span; a single one escapes.
        for ch in SPECIAL_CHARS {
            assert!(escaped.contains(&format!("\\{ch}")));
        }
    }
}
