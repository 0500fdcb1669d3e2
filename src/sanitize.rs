// Source preprocessing and output sanitization.
//
// These are pure string utilities: the newline/tab normalizer applied to
// every parse input, the URL scheme filter and entity escaper used by the
// HTML outputs, and the backslash unescaper for link targets.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;

/// Normalize a source string before parsing: `\r\n` and lone `\r` become
/// `\n`, form-feeds are stripped, and each tab expands to four spaces.
pub fn preprocess(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\u{0c}' => {}
            '\t' => out.push_str("    "),
            _ => out.push(ch),
        }
    }
    out
}

/// Filter a URL down to a safe subset of schemes.
///
/// The URL is percent-decoded, stripped to `[A-Za-z0-9/:]`, and lowercased;
/// if that prefix spells `javascript:`, `vbscript:`, or `data:` (or the
/// decode fails), the URL is rejected. Otherwise the *original* string is
/// returned unmodified.
pub fn sanitize_url(url: &str) -> Option<&str> {
    let decoded = percent_decode_str(url).decode_utf8().ok()?;
    let mut prot: String = decoded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':'))
        .collect();
    prot.make_ascii_lowercase();
    if prot.starts_with("javascript:")
        || prot.starts_with("vbscript:")
        || prot.starts_with("data:")
    {
        return None;
    }
    Some(url)
}

/// Escape text for inclusion in HTML content or attribute values.
///
/// Replaces each of `` < > & " ' / ` `` with its fixed entity. Everything
/// else passes through untouched.
pub fn sanitize_text(text: &str) -> Cow<'_, str> {
    // Fast path: nothing to escape, return the borrowed input.
    if !text
        .bytes()
        .any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\'' | b'/' | b'`'))
    {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Remove backslash escapes from a link target: each `\X` where X is
/// neither alphanumeric nor whitespace collapses to `X`.
pub fn unescape_url(raw: &str) -> String {
    static UNESCAPE_URL_R: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\\([^0-9A-Za-z\s])").unwrap());
    UNESCAPE_URL_R.replace_all(raw, "$1").into_owned()
}
