// Inline rules: escapes, links and images (direct and by reference),
// emphasis, strikethrough, inline code, hard breaks, and the text
// fallback.
//
// em, strong, and u share one precedence slot and compete on quality:
// match length plus a fixed bias (em 0.2, strong 0.1, u 0.0), so the
// longer capture wins and ties resolve em over strong over u.

use std::sync::LazyLock;

use fancy_regex::Regex;

use crate::error::MarkdownError;
use crate::html::html_tag;
use crate::node::{Del, Em, Image, InlineCode, Link, Node, Strong, Underline};
use crate::output::{Artifact, OutputContext};
use crate::parser::{parse_capture_inline, ref_key};
use crate::rule::{any_scope_regex, inline_regex, Capture, Rule, State};
use crate::rules::order;
use crate::sanitize::{sanitize_text, sanitize_url, unescape_url};

/// Bracket-balanced link text: allows one level of nested `[…]` and a
/// stray `]` that still has a closing bracket ahead.
const LINK_INSIDE: &str = r"(?:\[[^\]]*\]|[^\[\]]|\](?=[^\[]*\]))*";
/// Href (optionally `<…>`-wrapped, parens balanced one level) plus an
/// optional quoted title.
const LINK_HREF_AND_TITLE: &str =
    r#"\s*<?((?:\([^)]*\)|[^\s\\]|\\.)*?)>?(?:\s+['"]([\s\S]*?)['"])?\s*"#;

static ESCAPE_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\([^0-9A-Za-z\s])").unwrap());
static AUTOLINK_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([^: >]+:/[^ >]+)>").unwrap());
static MAILTO_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([^ >]+@[^ >]+)>").unwrap());
static MAILTO_CHECK_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?i)mailto:").unwrap());
static URL_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(https?://[^\s<]+[^<.,:;"')\]\s])"#).unwrap());
static LINK_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\[({LINK_INSIDE})\]\({LINK_HREF_AND_TITLE}\)")).unwrap()
});
static IMAGE_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^!\[({LINK_INSIDE})\]\({LINK_HREF_AND_TITLE}\)")).unwrap()
});
static REFLINK_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\[({LINK_INSIDE})\]\s*\[([^\]]*)\]")).unwrap()
});
static REFIMAGE_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^!\[({LINK_INSIDE})\]\s*\[([^\]]*)\]")).unwrap()
});
static EM_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        // _emphasis_ with word boundaries
        r"^\b_((?:__|\\[\s\S]|[^\\_])+?)_\b",
        // *emphasis*: no leading space, no `**` run, star not followed by
        // another star
        r"|^\*(?=\S)((?:\*\*|\\[\s\S]|\s+(?:\\[\s\S]|[^\s\*\\]|\*\*)|[^\s\*\\])+?)\*(?!\*)",
    ))
    .unwrap()
});
static STRONG_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*((?:\\[\s\S]|[^\\])+?)\*\*(?!\*)").unwrap());
static U_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^__((?:\\[\s\S]|[^\\])+?)__(?!_)").unwrap());
static DEL_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^~~(?=\S)((?:\\[\s\S]|~(?!~)|[^\s~\\]|\s(?!~~))+?)~~").unwrap()
});
static INLINE_CODE_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(`+)([\s\S]*?[^`])\1(?!`)").unwrap());
/// One space adjacent to each backtick fence, protecting embedded
/// backticks (`` ` `code` ` `` → `` `code` ``).
static INLINE_CODE_SPACE_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ (?= *`)|(` *) $").unwrap());
static BR_R: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {2,}\n").unwrap());
static TEXT_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s\S]+?(?=[^0-9A-Za-z\s\x{00c0}-\x{ffff}]|\n\n| {2,}\n|\w+:\S|$)").unwrap()
});

/// Canonicalize `capture[2] || capture[1]` and look it up in the known
/// definitions. Returns `(key, target, title)` with `None`s when the
/// definition has not been seen yet.
fn resolve_ref(capture: &Capture, state: &State) -> (String, Option<String>, Option<String>) {
    let raw = match capture.get(2) {
        Some(explicit) if !explicit.is_empty() => explicit,
        _ => capture.group(1),
    };
    let key = ref_key(raw);
    let (target, title) = match state.defs.get(&key) {
        Some(def) => (Some(def.target.clone()), def.title.clone()),
        None => (None, None),
    };
    (key, target, title)
}

fn link_html(
    node: &Link,
    ctx: &OutputContext<'_>,
    state: &mut State,
) -> Result<Artifact, MarkdownError> {
    let content = ctx.output(&node.content, state)?.into_html();
    // An unresolved or rejected target renders as an empty href.
    let href = node.target.as_deref().and_then(sanitize_url).unwrap_or("");
    let title = node.title.as_deref().filter(|t| !t.is_empty());
    Ok(Artifact::Html(html_tag(
        "a",
        &content,
        &[("href", Some(href)), ("title", title)],
        true,
    )))
}

pub(crate) fn escape() -> Rule {
    Rule::new(order::ESCAPE)
        .with_match(inline_regex(ESCAPE_R.clone()))
        .with_parse(|capture, _ctx, _state| Ok(Node::text(capture.group(1)).into()))
}

pub(crate) fn autolink() -> Rule {
    Rule::new(order::AUTOLINK)
        .with_match(inline_regex(AUTOLINK_R.clone()))
        .with_parse(|capture, _ctx, _state| {
            let target = capture.group(1).to_owned();
            Ok(Node::Link(Link {
                content: vec![Node::text(target.clone())],
                target: Some(target),
                title: None,
                reference: None,
            })
            .into())
        })
}

pub(crate) fn mailto() -> Rule {
    Rule::new(order::MAILTO)
        .with_match(inline_regex(MAILTO_R.clone()))
        .with_parse(|capture, _ctx, _state| {
            let address = capture.group(1).to_owned();
            let target = if MAILTO_CHECK_R.is_match(&address) {
                address.clone()
            } else {
                format!("mailto:{address}")
            };
            Ok(Node::Link(Link {
                content: vec![Node::text(address)],
                target: Some(target),
                title: None,
                reference: None,
            })
            .into())
        })
}

pub(crate) fn url() -> Rule {
    Rule::new(order::URL)
        .with_match(inline_regex(URL_R.clone()))
        .with_parse(|capture, _ctx, _state| {
            let target = capture.group(1).to_owned();
            Ok(Node::Link(Link {
                content: vec![Node::text(target.clone())],
                target: Some(target),
                title: None,
                reference: None,
            })
            .into())
        })
}

pub(crate) fn link() -> Rule {
    Rule::new(order::LINK)
        .with_match(inline_regex(LINK_R.clone()))
        .with_parse(|capture, ctx, state| {
            let content = ctx.parse(capture.group(1), state)?;
            Ok(Node::Link(Link {
                content,
                target: Some(unescape_url(capture.group(2))),
                title: capture.get(3).map(str::to_owned),
                reference: None,
            })
            .into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::Link(link) = node else {
                return Ok(Artifact::Empty);
            };
            link_html(link, ctx, state)
        })
}

pub(crate) fn image() -> Rule {
    Rule::new(order::IMAGE)
        .with_match(inline_regex(IMAGE_R.clone()))
        .with_parse(|capture, _ctx, _state| {
            Ok(Node::Image(Image {
                alt: capture.group(1).to_owned(),
                target: Some(unescape_url(capture.group(2))),
                title: capture.get(3).map(str::to_owned),
                reference: None,
            })
            .into())
        })
        .with_output("html", |node, _ctx, _state| {
            let Node::Image(image) = node else {
                return Ok(Artifact::Empty);
            };
            let src = image.target.as_deref().and_then(sanitize_url).unwrap_or("");
            let alt = (!image.alt.is_empty()).then_some(image.alt.as_str());
            let title = image.title.as_deref().filter(|t| !t.is_empty());
            Ok(Artifact::Html(html_tag(
                "img",
                "",
                &[("src", Some(src)), ("alt", alt), ("title", title)],
                false,
            )))
        })
}

/// `[text][key]`. Re-tags to `link`; the definition may arrive later.
pub(crate) fn reflink() -> Rule {
    Rule::new(order::REFLINK)
        .with_match(inline_regex(REFLINK_R.clone()))
        .with_parse(|capture, ctx, state| {
            let content = ctx.parse(capture.group(1), state)?;
            let (key, target, title) = resolve_ref(capture, state);
            Ok(Node::Link(Link {
                content,
                target,
                title,
                reference: Some(key),
            })
            .into())
        })
}

/// `![alt][key]`. Re-tags to `image`.
pub(crate) fn refimage() -> Rule {
    Rule::new(order::REFIMAGE)
        .with_match(inline_regex(REFIMAGE_R.clone()))
        .with_parse(|capture, _ctx, state| {
            let (key, target, title) = resolve_ref(capture, state);
            Ok(Node::Image(Image {
                alt: capture.group(1).to_owned(),
                target,
                title,
                reference: Some(key),
            })
            .into())
        })
}

pub(crate) fn em() -> Rule {
    Rule::new(order::EMPHASIS)
        .with_match(inline_regex(EM_R.clone()))
        .with_quality(|capture, _state, _prev| capture.full().len() as f64 + 0.2)
        .with_parse(|capture, ctx, state| {
            let inner = match capture.get(2) {
                Some(starred) if !starred.is_empty() => starred,
                _ => capture.group(1),
            };
            Ok(Node::Em(Em {
                content: ctx.parse(inner, state)?,
            })
            .into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::Em(em) = node else {
                return Ok(Artifact::Empty);
            };
            let content = ctx.output(&em.content, state)?.into_html();
            Ok(Artifact::Html(html_tag("em", &content, &[], true)))
        })
}

pub(crate) fn strong() -> Rule {
    Rule::new(order::EMPHASIS)
        .with_match(inline_regex(STRONG_R.clone()))
        .with_quality(|capture, _state, _prev| capture.full().len() as f64 + 0.1)
        .with_parse(|capture, ctx, state| {
            Ok(Node::Strong(Strong {
                content: parse_capture_inline(capture, ctx, state)?,
            })
            .into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::Strong(strong) = node else {
                return Ok(Artifact::Empty);
            };
            let content = ctx.output(&strong.content, state)?.into_html();
            Ok(Artifact::Html(html_tag("strong", &content, &[], true)))
        })
}

pub(crate) fn u() -> Rule {
    Rule::new(order::EMPHASIS)
        .with_match(inline_regex(U_R.clone()))
        .with_quality(|capture, _state, _prev| capture.full().len() as f64)
        .with_parse(|capture, ctx, state| {
            Ok(Node::Underline(Underline {
                content: parse_capture_inline(capture, ctx, state)?,
            })
            .into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::Underline(underline) = node else {
                return Ok(Artifact::Empty);
            };
            let content = ctx.output(&underline.content, state)?.into_html();
            Ok(Artifact::Html(html_tag("u", &content, &[], true)))
        })
}

pub(crate) fn del() -> Rule {
    Rule::new(order::DEL)
        .with_match(inline_regex(DEL_R.clone()))
        .with_parse(|capture, ctx, state| {
            Ok(Node::Del(Del {
                content: parse_capture_inline(capture, ctx, state)?,
            })
            .into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::Del(del) = node else {
                return Ok(Artifact::Empty);
            };
            let content = ctx.output(&del.content, state)?.into_html();
            Ok(Artifact::Html(html_tag("del", &content, &[], true)))
        })
}

pub(crate) fn inline_code() -> Rule {
    Rule::new(order::INLINE_CODE)
        .with_match(inline_regex(INLINE_CODE_R.clone()))
        .with_parse(|capture, _ctx, _state| {
            let content = INLINE_CODE_SPACE_R
                .replace_all(capture.group(2), "$1")
                .into_owned();
            Ok(Node::InlineCode(InlineCode { content }).into())
        })
        .with_output("html", |node, _ctx, _state| {
            let Node::InlineCode(code) = node else {
                return Ok(Artifact::Empty);
            };
            Ok(Artifact::Html(html_tag(
                "code",
                &sanitize_text(&code.content),
                &[],
                true,
            )))
        })
}

pub(crate) fn br() -> Rule {
    Rule::new(order::BR)
        .with_match(any_scope_regex(BR_R.clone()))
        .with_parse(|_capture, _ctx, _state| Ok(Node::Br.into()))
        .with_output("html", |_node, _ctx, _state| {
            Ok(Artifact::Html("<br>".into()))
        })
}

/// Universal fallback: consumes up to the next symbol, blank line, hard
/// break, or `word:` prefix. Must match any non-empty source.
pub(crate) fn text() -> Rule {
    Rule::new(order::TEXT)
        .with_match(any_scope_regex(TEXT_R.clone()))
        .with_parse(|capture, _ctx, _state| Ok(Node::text(capture.full()).into()))
        .with_output("html", |node, _ctx, _state| {
            let Node::Text(text) = node else {
                return Ok(Artifact::Empty);
            };
            Ok(Artifact::Html(sanitize_text(&text.content).into_owned()))
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parser::parser_for;
    use crate::rule::RefDef;
    use crate::rules::default_rules;

    fn parse_default_inline(source: &str) -> Vec<Node> {
        let mut state = State {
            inline: true,
            ..State::new()
        };
        parser_for(Arc::new(default_rules()))
            .parse_with_state(source, &mut state)
            .unwrap()
    }

    fn match_full(rule: &Rule, source: &str) -> Option<String> {
        let state = State {
            inline: true,
            ..State::new()
        };
        rule.matcher
            .as_ref()
            .unwrap()
            .run(source, &state, "")
            .map(|c| c.full().to_owned())
    }

    #[test]
    fn em_strong_u_share_one_order() {
        assert_eq!(em().order, strong().order);
        assert_eq!(strong().order, u().order);
    }

    #[test]
    fn quality_is_length_plus_fixed_bias() {
        let capture = Capture::new(vec![Some("*ab*".into())]);
        let state = State::new();
        let em_q = (em().quality.unwrap())(&capture, &state, "");
        let strong_q = (strong().quality.unwrap())(&capture, &state, "");
        let u_q = (u().quality.unwrap())(&capture, &state, "");
        assert_eq!(u_q, 4.0);
        assert!(em_q > strong_q && strong_q > u_q);
        // The bias stays below one length unit, so a longer capture always
        // outranks a shorter one.
        assert!(em_q - u_q < 1.0);
    }

    #[test]
    fn em_matches_both_delimiters() {
        assert_eq!(match_full(&em(), "*em* rest"), Some("*em*".into()));
        assert_eq!(match_full(&em(), "_em_ rest"), Some("_em_".into()));
        assert_eq!(match_full(&em(), "**x**"), None);
    }

    #[test]
    fn strong_and_u_need_their_doubles() {
        assert_eq!(match_full(&strong(), "**x** y"), Some("**x**".into()));
        assert_eq!(match_full(&strong(), "*x*"), None);
        assert_eq!(match_full(&u(), "__x__ y"), Some("__x__".into()));
        assert_eq!(match_full(&u(), "_x_"), None);
    }

    #[test]
    fn escape_produces_a_text_node() {
        assert_eq!(parse_default_inline(r"\*"), vec![Node::text("*")]);
    }

    #[test]
    fn autolink_wraps_the_target_as_text() {
        let ast = parse_default_inline("<http://x.y>");
        let Node::Link(link) = &ast[0] else {
            panic!("expected a link");
        };
        assert_eq!(link.target.as_deref(), Some("http://x.y"));
        assert_eq!(link.content, vec![Node::text("http://x.y")]);
        assert_eq!(link.reference, None);
    }

    #[test]
    fn mailto_prepends_the_scheme_once() {
        let ast = parse_default_inline("<a@b.c>");
        let Node::Link(link) = &ast[0] else {
            panic!("expected a link");
        };
        assert_eq!(link.target.as_deref(), Some("mailto:a@b.c"));

        let ast = parse_default_inline("<mailto:a@b.c>");
        let Node::Link(link) = &ast[0] else {
            panic!("expected a link");
        };
        assert_eq!(link.target.as_deref(), Some("mailto:a@b.c"));
    }

    #[test]
    fn url_match_drops_trailing_punctuation() {
        assert_eq!(
            match_full(&url(), "http://e.com."),
            Some("http://e.com".into())
        );
    }

    #[test]
    fn link_unescapes_target_and_keeps_title() {
        let ast = parse_default_inline("[t](http://e.com/a\\_b \"T\")");
        let Node::Link(link) = &ast[0] else {
            panic!("expected a link");
        };
        assert_eq!(link.target.as_deref(), Some("http://e.com/a_b"));
        assert_eq!(link.title.as_deref(), Some("T"));
        assert_eq!(link.content, vec![Node::text("t")]);
    }

    #[test]
    fn reflink_records_a_canonical_pending_key() {
        let ast = parse_default_inline("[x][Y  z]");
        let Node::Link(link) = &ast[0] else {
            panic!("expected a link");
        };
        assert_eq!(link.reference.as_deref(), Some("y z"));
        assert_eq!(link.target, None);
    }

    #[test]
    fn refimage_copies_a_known_definition() {
        let mut state = State {
            inline: true,
            ..State::new()
        };
        state.defs.insert(
            "i".into(),
            RefDef {
                target: "http://e.com/i.png".into(),
                title: None,
            },
        );
        let ast = parser_for(Arc::new(default_rules()))
            .parse_with_state("![a][i]", &mut state)
            .unwrap();
        let Node::Image(image) = &ast[0] else {
            panic!("expected an image");
        };
        assert_eq!(image.alt, "a");
        assert_eq!(image.target.as_deref(), Some("http://e.com/i.png"));
        assert_eq!(image.reference.as_deref(), Some("i"));
    }

    #[test]
    fn inline_code_strips_fence_adjacent_spaces() {
        let ast = parse_default_inline("`` `x` ``");
        let Node::InlineCode(code) = &ast[0] else {
            panic!("expected inline code");
        };
        assert_eq!(code.content, "`x`");
    }

    #[test]
    fn del_parses_its_content() {
        let ast = parse_default_inline("~~x~~");
        let Node::Del(del) = &ast[0] else {
            panic!("expected a del");
        };
        assert_eq!(del.content, vec![Node::text("x")]);
    }

    #[test]
    fn br_needs_two_spaces() {
        assert_eq!(match_full(&br(), "  \n"), Some("  \n".into()));
        assert_eq!(match_full(&br(), " \n"), None);
    }

    #[test]
    fn text_stops_before_symbols_and_blank_lines() {
        assert_eq!(match_full(&text(), "ab*c"), Some("ab".into()));
        assert_eq!(match_full(&text(), "a\n\nb"), Some("a".into()));
        assert_eq!(match_full(&text(), "go https://x"), Some("go ".into()));
    }
}
