// rulemark — extensible rule-driven Markdown parser and renderer.
//
// Architecture:
//   source string → preprocess → parser dispatcher over a rule table → AST
//   AST → output dispatcher (rule table + property) → HTML string or view tree
//
// The same rule table carries both parse and output behavior keyed by rule
// name, so grammars extend by overriding or adding entries rather than by
// forking the engine. The dispatcher picks rules by ascending `order`,
// breaking ties among equal-order rules with their `quality` functions
// (this is how em/strong/u precedence works).

mod error;
mod html;
pub mod node;
mod output;
mod parser;
mod rule;
mod rules;
mod sanitize;

pub use error::MarkdownError;
pub use html::html_tag;
pub use node::{Align, Node};
pub use output::{output_for, Artifact, Element, OutputContext, Renderer};
pub use parser::{
    ignore_capture, parse_block, parse_capture_inline, parse_inline, parser_for, ref_key,
    ParseContext, Parser,
};
pub use rule::{
    any_scope_regex, block_regex, inline_regex, ArrayOutputFn, Capture, Matcher, OutputFn,
    Parsed, ParseFn, QualityFn, RefDef, Rule, Rules, Scope, State,
};
pub use rules::default_rules;
pub use sanitize::{preprocess, sanitize_text, sanitize_url, unescape_url};

use std::sync::{Arc, LazyLock};

static DEFAULT_RULES: LazyLock<Arc<Rules>> = LazyLock::new(|| Arc::new(default_rules()));
static DEFAULT_PARSER: LazyLock<Parser> = LazyLock::new(|| Parser::new(DEFAULT_RULES.clone()));
static DEFAULT_HTML: LazyLock<Renderer> = LazyLock::new(|| {
    Renderer::new(DEFAULT_RULES.clone(), "html").expect("the html joiner is built in")
});
/// A source is block-terminated when it ends with a blank line.
static BLOCK_END_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\n{2,}$").unwrap());

/// Parse with the default rules in block scope.
pub fn default_block_parse(source: &str) -> Result<Vec<Node>, MarkdownError> {
    default_block_parse_with_state(source, &mut State::new())
}

/// Parse with the default rules in block scope, threading a caller-owned
/// state.
pub fn default_block_parse_with_state(
    source: &str,
    state: &mut State,
) -> Result<Vec<Node>, MarkdownError> {
    state.inline = false;
    DEFAULT_PARSER.parse_with_state(source, state)
}

/// Parse with the default rules in inline scope.
pub fn default_inline_parse(source: &str) -> Result<Vec<Node>, MarkdownError> {
    default_inline_parse_with_state(source, &mut State::new())
}

/// Parse with the default rules in inline scope, threading a caller-owned
/// state.
pub fn default_inline_parse_with_state(
    source: &str,
    state: &mut State,
) -> Result<Vec<Node>, MarkdownError> {
    state.inline = true;
    DEFAULT_PARSER.parse_with_state(source, state)
}

/// Parse with the default rules, choosing the scope from the source: block
/// when it is block-terminated (ends with a blank line), inline otherwise.
pub fn default_implicit_parse(source: &str) -> Result<Vec<Node>, MarkdownError> {
    default_implicit_parse_with_state(source, &mut State::new())
}

/// [`default_implicit_parse`] threading a caller-owned state.
pub fn default_implicit_parse_with_state(
    source: &str,
    state: &mut State,
) -> Result<Vec<Node>, MarkdownError> {
    state.inline = !BLOCK_END_R.is_match(source);
    DEFAULT_PARSER.parse_with_state(source, state)
}

/// Render an AST to HTML with the default rules.
pub fn default_html_output(ast: &[Node]) -> Result<String, MarkdownError> {
    default_html_output_with_state(ast, &mut State::new())
}

/// [`default_html_output`] threading a caller-owned state.
pub fn default_html_output_with_state(
    ast: &[Node],
    state: &mut State,
) -> Result<String, MarkdownError> {
    Ok(DEFAULT_HTML.render_with_state(ast, state)?.into_html())
}

/// Convert Markdown straight to HTML with the default rules.
///
/// # Examples
///
/// ```
/// let html = rulemark::markdown_to_html("# Hello\n\n").unwrap();
/// assert_eq!(html, "<h1>Hello</h1>\n\n");
/// ```
pub fn markdown_to_html(source: &str) -> Result<String, MarkdownError> {
    markdown_to_html_with_state(source, &mut State::new())
}

/// [`markdown_to_html`] threading a caller-owned state, so references can
/// resolve against definitions accumulated by an earlier parse.
pub fn markdown_to_html_with_state(
    source: &str,
    state: &mut State,
) -> Result<String, MarkdownError> {
    let ast = default_implicit_parse_with_state(source, state)?;
    default_html_output_with_state(&ast, state)
}

#[deprecated(note = "use `default_implicit_parse`")]
pub fn default_parse(source: &str) -> Result<Vec<Node>, MarkdownError> {
    log::warn!("default_parse is deprecated, use default_implicit_parse");
    default_implicit_parse(source)
}

#[deprecated(note = "use `default_html_output`")]
pub fn default_output(ast: &[Node]) -> Result<String, MarkdownError> {
    log::warn!("default_output is deprecated, use default_html_output");
    default_html_output(ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(markdown_to_html("").unwrap(), "");
    }

    #[test]
    fn implicit_parse_picks_scope_from_termination() {
        // Not block-terminated: inline scope, no paragraph wrapper.
        assert_eq!(markdown_to_html("plain").unwrap(), "plain");
        // Block-terminated: block scope, paragraph wrapper.
        assert_eq!(
            markdown_to_html("plain\n\n").unwrap(),
            "<div class=\"paragraph\">plain</div>"
        );
    }

    #[test]
    fn default_block_parse_forces_block_scope() {
        let ast = default_block_parse("text without blank line").unwrap();
        assert!(matches!(ast.first(), Some(Node::Paragraph(_))));
    }

    #[test]
    fn default_inline_parse_forces_inline_scope() {
        let ast = default_inline_parse("text without blank line").unwrap();
        assert!(matches!(ast.first(), Some(Node::Text(_))));
    }

    #[test]
    #[allow(deprecated)]
    fn deprecated_wrappers_still_work() {
        let ast = default_parse("hi").unwrap();
        assert_eq!(default_output(&ast).unwrap(), "hi");
    }
}
