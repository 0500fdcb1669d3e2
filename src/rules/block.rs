// Block-level rules: headings, horizontal rules, code blocks, block
// quotes, reference definitions, blank lines, and paragraphs.
//
// Every block regex ends by consuming its trailing blank lines, so the
// dispatcher lands on the start of the next block. Rules that re-tag their
// node (`lheading` → heading, `fence` → codeBlock) carry no output of
// their own.

use std::sync::LazyLock;

use fancy_regex::Regex;

use crate::html::html_tag;
use crate::node::{BlockQuote, CodeBlock, Def, Heading, Node, Paragraph};
use crate::output::Artifact;
use crate::parser::{parse_capture_inline, parse_inline, ref_key};
use crate::rule::{block_regex, RefDef, Rule};
use crate::rules::order;
use crate::sanitize::sanitize_text;

static HEADING_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ *(#{1,6})([^\n]+?)#* *(?:\n *)+\n").unwrap());
static LHEADING_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\n]+)\n *(=|-){3,} *(?:\n *)+\n").unwrap());
static HR_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( *[-*_]){3,} *(?:\n *)+\n").unwrap());
static CODE_BLOCK_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:    [^\n]+\n*)+(?:\n *)+\n").unwrap());
static FENCE_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ *(`{3,}|~{3,}) *(\S+)? *\n([\s\S]+?)\n?\1 *(?:\n *)+\n").unwrap()
});
static BLOCK_QUOTE_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( *>[^\n]+(\n[^\n]+)*\n*)+\n{2,}").unwrap());
static DEF_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^ *\[([^\]]+)\]: *<?([^\s>]*)>?(?: +["(]([^\n]+)[")])? *\n(?: *\n)*"#).unwrap()
});
static NEWLINE_R: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:\n *)*\n").unwrap());
static PARAGRAPH_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?:[^\n]|\n(?! *\n))+)(?:\n *)+\n").unwrap());

static CODE_INDENT_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?m)^    ").unwrap());
static QUOTE_PREFIX_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?m)^ *> ?").unwrap());

pub(crate) fn heading() -> Rule {
    Rule::new(order::HEADING)
        .with_match(block_regex(HEADING_R.clone()))
        .with_parse(|capture, ctx, state| {
            let level = capture.group(1).len() as u8;
            let content = parse_inline(ctx, capture.group(2).trim(), state)?;
            Ok(Node::Heading(Heading { level, content }).into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::Heading(heading) = node else {
                return Ok(Artifact::Empty);
            };
            let content = ctx.output(&heading.content, state)?.into_html();
            let tag = format!("h{}", heading.level);
            Ok(Artifact::Html(format!(
                "{}\n\n",
                html_tag(&tag, &content, &[], true)
            )))
        })
}

/// Setext heading. Re-tags to `heading`, so it renders through the heading
/// rule.
pub(crate) fn lheading() -> Rule {
    Rule::new(order::LHEADING)
        .with_match(block_regex(LHEADING_R.clone()))
        .with_parse(|capture, ctx, state| {
            let level = if capture.group(2) == "=" { 1 } else { 2 };
            let content = parse_inline(ctx, capture.group(1), state)?;
            Ok(Node::Heading(Heading { level, content }).into())
        })
}

pub(crate) fn hr() -> Rule {
    Rule::new(order::HR)
        .with_match(block_regex(HR_R.clone()))
        .with_parse(|_capture, _ctx, _state| Ok(Node::Hr.into()))
        .with_output("html", |_node, _ctx, _state| {
            Ok(Artifact::Html("<hr>".into()))
        })
}

/// Indented code block: four leading spaces per line, no language.
pub(crate) fn code_block() -> Rule {
    Rule::new(order::CODE_BLOCK)
        .with_match(block_regex(CODE_BLOCK_R.clone()))
        .with_parse(|capture, _ctx, _state| {
            let content = CODE_INDENT_R.replace_all(capture.full(), "");
            let content = content.trim_end_matches('\n').to_owned();
            Ok(Node::CodeBlock(CodeBlock {
                lang: None,
                content,
            })
            .into())
        })
        .with_output("html", |node, _ctx, _state| {
            let Node::CodeBlock(code) = node else {
                return Ok(Artifact::Empty);
            };
            let class = code.lang.as_ref().map(|lang| format!("markdown-code-{lang}"));
            let inner = html_tag(
                "code",
                &sanitize_text(&code.content),
                &[("class", class.as_deref())],
                true,
            );
            Ok(Artifact::Html(html_tag("pre", &inner, &[], true)))
        })
}

/// Fenced code block. Re-tags to `codeBlock`, keeping the fence language.
pub(crate) fn fence() -> Rule {
    Rule::new(order::FENCE)
        .with_match(block_regex(FENCE_R.clone()))
        .with_parse(|capture, _ctx, _state| {
            Ok(Node::CodeBlock(CodeBlock {
                lang: capture.get(2).map(str::to_owned),
                content: capture.group(3).to_owned(),
            })
            .into())
        })
}

pub(crate) fn block_quote() -> Rule {
    Rule::new(order::BLOCK_QUOTE)
        .with_match(block_regex(BLOCK_QUOTE_R.clone()))
        .with_parse(|capture, ctx, state| {
            let content = QUOTE_PREFIX_R.replace_all(capture.full(), "");
            Ok(Node::BlockQuote(BlockQuote {
                content: ctx.parse(&content, state)?,
            })
            .into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::BlockQuote(quote) = node else {
                return Ok(Artifact::Empty);
            };
            let content = ctx.output(&quote.content, state)?.into_html();
            Ok(Artifact::Html(html_tag("blockquote", &content, &[], true)))
        })
}

/// Reference definition. Stores the definition in `state.defs`; pending
/// references pick it up in the patch pass. Renders as nothing.
pub(crate) fn def() -> Rule {
    Rule::new(order::DEF)
        .with_match(block_regex(DEF_R.clone()))
        .with_parse(|capture, _ctx, state| {
            let key = ref_key(capture.group(1));
            let target = capture.group(2).to_owned();
            let title = capture.get(3).map(str::to_owned);
            state.defs.insert(
                key.clone(),
                RefDef {
                    target: target.clone(),
                    title: title.clone(),
                },
            );
            Ok(Node::Def(Def {
                def: key,
                target,
                title,
            })
            .into())
        })
        .with_output("html", |_node, _ctx, _state| {
            Ok(Artifact::Html(String::new()))
        })
}

pub(crate) fn newline() -> Rule {
    Rule::new(order::NEWLINE)
        .with_match(block_regex(NEWLINE_R.clone()))
        .with_parse(|_capture, _ctx, _state| Ok(Node::Newline.into()))
        .with_output("html", |_node, _ctx, _state| Ok(Artifact::Html("\n".into())))
}

pub(crate) fn paragraph() -> Rule {
    Rule::new(order::PARAGRAPH)
        .with_match(block_regex(PARAGRAPH_R.clone()))
        .with_parse(|capture, ctx, state| {
            Ok(Node::Paragraph(Paragraph {
                content: parse_capture_inline(capture, ctx, state)?,
            })
            .into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::Paragraph(paragraph) = node else {
                return Ok(Artifact::Empty);
            };
            let content = ctx.output(&paragraph.content, state)?.into_html();
            Ok(Artifact::Html(html_tag(
                "div",
                &content,
                &[("class", Some("paragraph"))],
                true,
            )))
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parser::parser_for;
    use crate::rule::State;
    use crate::rules::default_rules;

    fn parse_default(source: &str) -> Vec<Node> {
        parser_for(Arc::new(default_rules())).parse(source).unwrap()
    }

    fn match_full(rule: &Rule, state: &State, source: &str) -> Option<String> {
        rule.matcher
            .as_ref()
            .unwrap()
            .run(source, state, "")
            .map(|c| c.full().to_owned())
    }

    #[test]
    fn heading_parses_level_and_trimmed_content() {
        let ast = parse_default("##  Spaced  ##\n\n");
        let Node::Heading(heading) = &ast[0] else {
            panic!("expected a heading");
        };
        assert_eq!(heading.level, 2);
        assert_eq!(heading.content, vec![Node::text("Spaced")]);
    }

    #[test]
    fn heading_declines_inline_scope() {
        let state = State {
            inline: true,
            ..State::new()
        };
        assert_eq!(match_full(&heading(), &state, "# x\n\n"), None);
    }

    #[test]
    fn lheading_retags_to_heading() {
        let ast = parse_default("Title\n===\n\n");
        assert_eq!(ast[0].kind(), "heading");
        let Node::Heading(heading) = &ast[0] else {
            panic!("expected a heading");
        };
        assert_eq!(heading.level, 1);

        let ast = parse_default("Title\n----\n\n");
        let Node::Heading(heading) = &ast[0] else {
            panic!("expected a heading");
        };
        assert_eq!(heading.level, 2);
    }

    #[test]
    fn hr_parses_to_an_empty_node() {
        assert_eq!(parse_default("---\n\n"), vec![Node::Hr]);
    }

    #[test]
    fn code_block_strips_indent_and_trailing_newlines() {
        let ast = parse_default("    a\n    b\n\n");
        let Node::CodeBlock(code) = &ast[0] else {
            panic!("expected a code block");
        };
        assert_eq!(code.lang, None);
        assert_eq!(code.content, "a\nb");
    }

    #[test]
    fn fence_retags_to_code_block_with_language() {
        let ast = parse_default("```js\nfoo\n```\n\n");
        assert_eq!(ast[0].kind(), "codeBlock");
        let Node::CodeBlock(code) = &ast[0] else {
            panic!("expected a code block");
        };
        assert_eq!(code.lang.as_deref(), Some("js"));
        assert_eq!(code.content, "foo");
    }

    #[test]
    fn tilde_fence_without_language() {
        let ast = parse_default("~~~\nx\n~~~\n\n");
        let Node::CodeBlock(code) = &ast[0] else {
            panic!("expected a code block");
        };
        assert_eq!(code.lang, None);
        assert_eq!(code.content, "x");
    }

    #[test]
    fn block_quote_strips_markers_and_recurses() {
        let ast = parse_default("> a\n> b\n\n");
        let Node::BlockQuote(quote) = &ast[0] else {
            panic!("expected a block quote");
        };
        let Node::Paragraph(paragraph) = &quote.content[0] else {
            panic!("expected a paragraph");
        };
        assert_eq!(paragraph.content, vec![Node::text("a\nb")]);
    }

    #[test]
    fn def_canonicalizes_and_stores_the_definition() {
        let mut state = State::new();
        let parser = parser_for(Arc::new(default_rules()));
        let ast = parser
            .parse_with_state("[Foo  Bar]: http://e.com \"T\"\n\n", &mut state)
            .unwrap();
        let Node::Def(def) = &ast[0] else {
            panic!("expected a def");
        };
        assert_eq!(def.def, "foo bar");
        assert_eq!(def.target, "http://e.com");
        assert_eq!(def.title.as_deref(), Some("T"));
        assert_eq!(state.defs["foo bar"].target, "http://e.com");
    }

    #[test]
    fn newline_consumes_blank_runs() {
        let ast = parse_default("\n\nx\n\n");
        assert_eq!(ast[0], Node::Newline);
        assert!(matches!(ast[1], Node::Paragraph(_)));
    }

    #[test]
    fn paragraph_wraps_inline_content() {
        let ast = parse_default("a *b*\n\n");
        let Node::Paragraph(paragraph) = &ast[0] else {
            panic!("expected a paragraph");
        };
        assert_eq!(paragraph.content.len(), 2);
        assert_eq!(paragraph.content[0], Node::text("a "));
        assert!(matches!(paragraph.content[1], Node::Em(_)));
    }
}
