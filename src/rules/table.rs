// The table rules: pipe tables, `nptable` (no leading pipes), and the
// transient `tableSeparator` node that cell splitting rides on.
//
// One regex captures header, alignment row, and body. Rows re-parse as
// inline content with `state.in_table` set, so the separator rule becomes
// active; the resulting flat node list is then split into cells at the
// separator nodes, which never reach an output.

use std::sync::LazyLock;

use fancy_regex::Regex;

use crate::error::MarkdownError;
use crate::html::html_tag;
use crate::node::{Align, Node, Table};
use crate::output::{Artifact, OutputContext};
use crate::parser::ParseContext;
use crate::rule::{block_regex, Capture, Parsed, Rule, State};
use crate::rules::order;

static TABLE_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ *(\|.+)\n *\|( *[-:]+[-| :]*)\n((?: *\|.*(?:\n|$))*)\n*").unwrap()
});
static NPTABLE_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ *(\S.*\|.*)\n *([-:]+ *\|[-| :]*)\n((?:.*\|.*(?:\n|$))*)\n*").unwrap()
});
static TABLE_SEPARATOR_R: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ *\| *").unwrap());

static ROW_SEPARATOR_TRIM_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^ *\| *| *\| *$").unwrap());
static RIGHT_ALIGN_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^ *-+: *$").unwrap());
static CENTER_ALIGN_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^ *:-+: *$").unwrap());
static LEFT_ALIGN_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^ *:-+ *$").unwrap());

fn classify_align(cell: &str) -> Option<Align> {
    if RIGHT_ALIGN_R.is_match(cell) {
        Some(Align::Right)
    } else if CENTER_ALIGN_R.is_match(cell) {
        Some(Align::Center)
    } else if LEFT_ALIGN_R.is_match(cell) {
        Some(Align::Left)
    } else {
        None
    }
}

fn parse_align_row(source: &str, trim_end_separators: bool) -> Vec<Option<Align>> {
    let trimmed;
    let source = if trim_end_separators {
        trimmed = ROW_SEPARATOR_TRIM_R.replace_all(source, "");
        trimmed.as_ref()
    } else {
        source
    };
    source.trim().split('|').map(classify_align).collect()
}

/// Parse one row into cells. The row re-parses as inline content with the
/// separator rule active, then the flat node list splits at separators.
/// With `trim_end_separators`, a leading or trailing separator is
/// decoration rather than a cell boundary. The text node right before a
/// separator (or at row end) loses its trailing spaces.
fn parse_row(
    source: &str,
    ctx: &ParseContext<'_>,
    state: &mut State,
    trim_end_separators: bool,
) -> Result<Vec<Vec<Node>>, MarkdownError> {
    let was_in_table = state.in_table;
    state.in_table = true;
    let row = ctx.parse(source.trim(), state);
    state.in_table = was_in_table;
    let row = row?;

    let mut cells: Vec<Vec<Node>> = vec![Vec::new()];
    let last = row.len().saturating_sub(1);
    for (i, node) in row.iter().enumerate() {
        match node {
            Node::TableSeparator => {
                if !trim_end_separators || (i != 0 && i != last) {
                    cells.push(Vec::new());
                }
            }
            Node::Text(text) => {
                let mut text = text.clone();
                if matches!(row.get(i + 1), None | Some(Node::TableSeparator)) {
                    let kept = text.content.trim_end_matches(' ').len();
                    text.content.truncate(kept);
                }
                if let Some(cell) = cells.last_mut() {
                    cell.push(Node::Text(text));
                }
            }
            node => {
                if let Some(cell) = cells.last_mut() {
                    cell.push(node.clone());
                }
            }
        }
    }
    Ok(cells)
}

fn parse_cells(
    source: &str,
    ctx: &ParseContext<'_>,
    state: &mut State,
    trim_end_separators: bool,
) -> Result<Vec<Vec<Vec<Node>>>, MarkdownError> {
    source
        .trim()
        .split('\n')
        .map(|row| parse_row(row, ctx, state, trim_end_separators))
        .collect()
}

fn parse_table(
    capture: &Capture,
    ctx: &ParseContext<'_>,
    state: &mut State,
    trim_end_separators: bool,
) -> Result<Parsed, MarkdownError> {
    state.inline = true;
    let header = parse_row(capture.group(1), ctx, state, trim_end_separators)?;
    let align = parse_align_row(capture.group(2), trim_end_separators);
    let cells = parse_cells(capture.group(3), ctx, state, trim_end_separators)?;
    state.inline = false;
    Ok(Node::Table(Table {
        header,
        align,
        cells,
    })
    .into())
}

fn table_html(
    node: &Node,
    ctx: &OutputContext<'_>,
    state: &mut State,
) -> Result<Artifact, MarkdownError> {
    let Node::Table(table) = node else {
        return Ok(Artifact::Empty);
    };
    let style_for = |col: usize| -> Option<String> {
        table
            .align
            .get(col)
            .copied()
            .flatten()
            .map(|align| format!("text-align:{};", align.as_css()))
    };

    let mut headers = String::new();
    for (col, cell) in table.header.iter().enumerate() {
        let content = ctx.output(cell, state)?.into_html();
        let style = style_for(col);
        headers.push_str(&html_tag(
            "th",
            &content,
            &[("style", style.as_deref()), ("scope", Some("col"))],
            true,
        ));
    }

    let mut rows = String::new();
    for row in &table.cells {
        let mut cols = String::new();
        for (col, cell) in row.iter().enumerate() {
            let content = ctx.output(cell, state)?.into_html();
            let style = style_for(col);
            cols.push_str(&html_tag("td", &content, &[("style", style.as_deref())], true));
        }
        rows.push_str(&html_tag("tr", &cols, &[], true));
    }

    let head = html_tag("thead", &html_tag("tr", &headers, &[], true), &[], true);
    let body = html_tag("tbody", &rows, &[], true);
    Ok(Artifact::Html(html_tag(
        "table",
        &format!("{head}{body}"),
        &[],
        true,
    )))
}

pub(crate) fn table() -> Rule {
    Rule::new(order::TABLE)
        .with_match(block_regex(TABLE_R.clone()))
        .with_parse(|capture, ctx, state| parse_table(capture, ctx, state, true))
        .with_output("html", table_html)
}

/// Pipe-less table. Re-tags to `table`, so it renders through the table
/// rule.
pub(crate) fn nptable() -> Rule {
    Rule::new(order::NPTABLE)
        .with_match(block_regex(NPTABLE_R.clone()))
        .with_parse(|capture, ctx, state| parse_table(capture, ctx, state, false))
}

/// Cell boundary, only live while a table row is being parsed. The nodes
/// it produces are consumed by cell splitting and never rendered.
pub(crate) fn table_separator() -> Rule {
    Rule::new(order::TABLE_SEPARATOR)
        .with_match_fn(|source, state, _prev_capture_text| {
            if !state.in_table {
                return None;
            }
            match TABLE_SEPARATOR_R.captures(source) {
                Ok(caps) => caps.map(|c| Capture::from_fancy(&c)),
                Err(_) => None,
            }
        })
        .with_parse(|_capture, _ctx, _state| Ok(Node::TableSeparator.into()))
        .with_output("html", |_node, _ctx, _state| {
            Ok(Artifact::Html(" | ".into()))
        })
}
