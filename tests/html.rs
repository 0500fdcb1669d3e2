// End-to-end HTML rendering over the default rule set.

use pretty_assertions::assert_eq;
use rulemark::{
    default_html_output, default_inline_parse, markdown_to_html, markdown_to_html_with_state,
    State,
};

fn inline_html(source: &str) -> String {
    let ast = default_inline_parse(source).unwrap();
    default_html_output(&ast).unwrap()
}

#[test]
fn heading() {
    assert_eq!(markdown_to_html("# Hello\n\n").unwrap(), "<h1>Hello</h1>\n\n");
}

#[test]
fn heading_levels_and_trailing_hashes() {
    assert_eq!(markdown_to_html("### Three ###\n\n").unwrap(), "<h3>Three</h3>\n\n");
    assert_eq!(markdown_to_html("###### Six\n\n").unwrap(), "<h6>Six</h6>\n\n");
}

#[test]
fn leading_blank_lines_emit_a_literal_newline() {
    // The newline rule consumes the blank-line run before the first block
    // and renders it as "\n", so it survives into the HTML stream.
    assert_eq!(
        markdown_to_html("\n\n# Title\n\n").unwrap(),
        "\n<h1>Title</h1>\n\n"
    );
}

#[test]
fn setext_headings() {
    assert_eq!(markdown_to_html("Title\n===\n\n").unwrap(), "<h1>Title</h1>\n\n");
    assert_eq!(markdown_to_html("Title\n---\n\n").unwrap(), "<h2>Title</h2>\n\n");
}

#[test]
fn emphasis_family() {
    assert_eq!(
        inline_html("*em* and **strong** and __u__"),
        "<em>em</em> and <strong>strong</strong> and <u>u</u>"
    );
}

#[test]
fn underscore_emphasis() {
    assert_eq!(inline_html("_em_"), "<em>em</em>");
}

#[test]
fn nested_emphasis_prefers_em_on_ties() {
    // em and strong both capture the whole run; em's quality bias wins the
    // tie, and the inner text re-parses as strong.
    assert_eq!(inline_html("***a***"), "<em><strong>a</strong></em>");
}

#[test]
fn strikethrough() {
    assert_eq!(inline_html("~~gone~~"), "<del>gone</del>");
}

#[test]
fn javascript_url_is_neutralized() {
    assert_eq!(
        markdown_to_html("[a](javascript:alert(1))").unwrap(),
        "<a href=\"\">a</a>"
    );
}

#[test]
fn link_with_title() {
    assert_eq!(
        inline_html("[text](http://e.com \"Title\")"),
        "<a href=\"http://e.com\" title=\"Title\">text</a>"
    );
}

#[test]
fn link_target_is_backslash_unescaped() {
    assert_eq!(
        inline_html(r"[x](http://e.com/a\_b)"),
        "<a href=\"http://e.com/a_b\">x</a>"
    );
}

#[test]
fn tight_list() {
    assert_eq!(
        markdown_to_html("- one\n- two\n\n").unwrap(),
        "<ul><li>one</li><li>two</li></ul>"
    );
}

#[test]
fn ordered_list_keeps_start() {
    assert_eq!(
        markdown_to_html("2. two\n3. three\n\n").unwrap(),
        "<ol start=\"2\"><li>two</li><li>three</li></ol>"
    );
}

#[test]
fn loose_list_wraps_items_in_paragraphs() {
    assert_eq!(
        markdown_to_html("- a\n\n- b\n\n").unwrap(),
        "<ul><li><div class=\"paragraph\">a</div></li><li><div class=\"paragraph\">b</div></li></ul>"
    );
}

#[test]
fn nested_list() {
    assert_eq!(
        markdown_to_html("- a\n  - b\n\n").unwrap(),
        "<ul><li>a\n<ul><li>b</li></ul></li></ul>"
    );
}

#[test]
fn reference_link_backpatches_forward() {
    assert_eq!(
        markdown_to_html("[x][y]\n\n[y]: http://e.com \"T\"\n\n").unwrap(),
        "<div class=\"paragraph\"><a href=\"http://e.com\" title=\"T\">x</a></div>"
    );
}

#[test]
fn reference_link_resolves_backward() {
    assert_eq!(
        markdown_to_html("[y]: http://e.com\n\n[x][y]\n\n").unwrap(),
        "<div class=\"paragraph\"><a href=\"http://e.com\">x</a></div>"
    );
}

#[test]
fn reference_keys_are_canonicalized() {
    // Whitespace runs collapse and case folds before lookup.
    assert_eq!(
        markdown_to_html("[x][Y  z]\n\n[y z]: http://e.com\n\n").unwrap(),
        "<div class=\"paragraph\"><a href=\"http://e.com\">x</a></div>"
    );
}

#[test]
fn unresolved_reference_renders_empty_href() {
    assert_eq!(inline_html("[x][nope]"), "<a href=\"\">x</a>");
}

#[test]
fn definitions_carry_over_through_shared_state() {
    let mut state = State::new();
    markdown_to_html_with_state("[y]: http://e.com\n\n", &mut state).unwrap();
    assert_eq!(
        markdown_to_html_with_state("[x][y]\n\n", &mut state).unwrap(),
        "<div class=\"paragraph\"><a href=\"http://e.com\">x</a></div>"
    );
}

#[test]
fn fenced_code_block() {
    assert_eq!(
        markdown_to_html("```js\nfoo\n```\n\n").unwrap(),
        "<pre><code class=\"markdown-code-js\">foo</code></pre>"
    );
}

#[test]
fn fenced_code_block_without_language() {
    assert_eq!(
        markdown_to_html("```\nfoo\n```\n\n").unwrap(),
        "<pre><code>foo</code></pre>"
    );
}

#[test]
fn indented_code_block() {
    assert_eq!(
        markdown_to_html("    foo\n    bar\n\n").unwrap(),
        "<pre><code>foo\nbar</code></pre>"
    );
}

#[test]
fn tabs_normalize_to_code_indentation() {
    assert_eq!(
        markdown_to_html("\tfoo\n\n").unwrap(),
        "<pre><code>foo</code></pre>"
    );
}

#[test]
fn pipe_table_with_alignment() {
    assert_eq!(
        markdown_to_html("| a | b |\n|---|--:|\n| 1 | 2 |\n\n").unwrap(),
        "<table><thead><tr><th scope=\"col\">a</th>\
         <th style=\"text-align:right;\" scope=\"col\">b</th></tr></thead>\
         <tbody><tr><td>1</td><td style=\"text-align:right;\">2</td></tr></tbody></table>"
    );
}

#[test]
fn nptable_without_pipes() {
    assert_eq!(
        markdown_to_html("a|b\n-|-\n1|2\n\n").unwrap(),
        "<table><thead><tr><th scope=\"col\">a</th><th scope=\"col\">b</th></tr></thead>\
         <tbody><tr><td>1</td><td>2</td></tr></tbody></table>"
    );
}

#[test]
fn block_quote() {
    assert_eq!(
        markdown_to_html("> quote\n\n").unwrap(),
        "<blockquote><div class=\"paragraph\">quote</div></blockquote>"
    );
}

#[test]
fn horizontal_rule() {
    assert_eq!(markdown_to_html("---\n\n").unwrap(), "<hr>");
    assert_eq!(markdown_to_html(" * * * \n\n").unwrap(), "<hr>");
}

#[test]
fn autolink() {
    assert_eq!(
        inline_html("<http://x.com/path>"),
        "<a href=\"http://x.com/path\">http:&#x2F;&#x2F;x.com&#x2F;path</a>"
    );
}

#[test]
fn mailto_prepends_scheme() {
    assert_eq!(
        inline_html("<foo@bar.com>"),
        "<a href=\"mailto:foo@bar.com\">foo@bar.com</a>"
    );
}

#[test]
fn mailto_keeps_existing_scheme() {
    assert_eq!(
        inline_html("<mailto:foo@bar.com>"),
        "<a href=\"mailto:foo@bar.com\">mailto:foo@bar.com</a>"
    );
}

#[test]
fn bare_url() {
    assert_eq!(
        inline_html("visit https://e.com/x now"),
        "visit <a href=\"https://e.com/x\">https:&#x2F;&#x2F;e.com&#x2F;x</a> now"
    );
}

#[test]
fn image() {
    assert_eq!(
        inline_html("![alt](http://e.com/i.png \"t\")"),
        "<img src=\"http://e.com/i.png\" alt=\"alt\" title=\"t\">"
    );
}

#[test]
fn reference_image() {
    assert_eq!(
        markdown_to_html("![a][i]\n\n[i]: http://e.com/i.png\n\n").unwrap(),
        "<div class=\"paragraph\"><img src=\"http://e.com/i.png\" alt=\"a\"></div>"
    );
}

#[test]
fn escapes_disable_emphasis() {
    assert_eq!(inline_html(r"\*not em\*"), "*not em*");
}

#[test]
fn inline_code() {
    assert_eq!(inline_html("`code`"), "<code>code</code>");
}

#[test]
fn inline_code_escapes_content() {
    assert_eq!(inline_html("`<b>`"), "<code>&lt;b&gt;</code>");
}

#[test]
fn inline_code_protects_embedded_backticks() {
    // The space adjacent to each fence is stripped, keeping the inner
    // backticks literal.
    assert_eq!(inline_html("`` `ticks` ``"), "<code>&#96;ticks&#96;</code>");
}

#[test]
fn hard_break() {
    assert_eq!(inline_html("a  \nb"), "a<br>b");
}

#[test]
fn text_is_escaped() {
    assert_eq!(inline_html("a < b & c"), "a &lt; b &amp; c");
}

#[test]
fn list_needs_a_line_start() {
    // Inline scope outside a list item never opens a list, even after a
    // newline.
    assert_eq!(inline_html("a- b"), "a- b");
    assert_eq!(inline_html("a\n- b"), "a\n- b");
}

#[test]
fn mixed_document() {
    let source = "# Title\n\nSome *text*.\n\n- one\n- two\n\n> quote\n\n";
    assert_eq!(
        markdown_to_html(source).unwrap(),
        "<h1>Title</h1>\n\n\
         <div class=\"paragraph\">Some <em>text</em>.</div>\
         <ul><li>one</li><li>two</li></ul>\
         <blockquote><div class=\"paragraph\">quote</div></blockquote>"
    );
}
