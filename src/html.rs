// HTML tag emission for the built-in `html` output property.

use std::borrow::Cow;

/// Escape an attribute name or value. Slash and backtick are inert inside a
/// quoted attribute and stay as-is, so URLs survive verbatim.
fn sanitize_attr(text: &str) -> Cow<'_, str> {
    if !text
        .bytes()
        .any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\''))
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
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Build an HTML tag with escaped attributes.
///
/// Attributes with a `None` value are omitted. With `is_closed` false only
/// the opening tag is produced, for void elements such as `<hr>`, `<br>`,
/// and `<img>`.
pub fn html_tag(
    tag_name: &str,
    content: &str,
    attributes: &[(&str, Option<&str>)],
    is_closed: bool,
) -> String {
    let mut attribute_string = String::new();
    for (name, value) in attributes {
        if let Some(value) = value {
            attribute_string.push(' ');
            attribute_string.push_str(&sanitize_attr(name));
            attribute_string.push_str("=\"");
            attribute_string.push_str(&sanitize_attr(value));
            attribute_string.push('"');
        }
    }

    if is_closed {
        format!("<{tag_name}{attribute_string}>{content}</{tag_name}>")
    } else {
        format!("<{tag_name}{attribute_string}>")
    }
}
