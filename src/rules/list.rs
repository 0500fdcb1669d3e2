// The list rule.
//
// Lists need two things no plain scoped regex gives us: lookbehind (a list
// may only start at the beginning of a line, detected from the previous
// capture's tail) and per-item re-parsing with tight/loose handling. An
// item parses as block content ("loose") when it contains a blank line, or
// when it is the last item and the item before it was loose; tight items
// parse as inline content.

use std::sync::LazyLock;

use fancy_regex::Regex;

use crate::html::html_tag;
use crate::node::{List, Node};
use crate::output::Artifact;
use crate::rule::{Capture, Rule};
use crate::rules::order;

/// The whole list block: first bullet through the first double newline
/// that does not continue the list (or end of input).
static LIST_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^( *)((?:[*+-]|\d+\.)) [\s\S]+?(?:\n{2,}(?! )(?!\1(?:[*+-]|\d+\.) )\n*|\s*\n*$)")
        .unwrap()
});
/// One item: its bullet line plus continuation lines that do not open a
/// sibling bullet at the same indent.
static LIST_ITEM_R: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"( *)((?:[*+-]|\d+\.)) +[^\n]*(?:\n(?!\1(?:[*+-]|\d+\.) )[^\n]*)*(\n|$)").unwrap()
});
/// Start-of-line check against the previous capture, keeping its trailing
/// indentation.
static LIST_LOOKBEHIND_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?:^|\n)( *)$").unwrap());
static LIST_ITEM_PREFIX_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^( *)((?:[*+-]|\d+\.)) +").unwrap());
static LIST_BLOCK_END_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\n{2,}$").unwrap());
static LIST_ITEM_END_R: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r" *\n+$").unwrap());

/// Strip up to `prefix_len` leading spaces from every line.
fn unindent(item: &str, prefix_len: usize) -> String {
    item.split('\n')
        .map(|line| {
            let leading = line.len() - line.trim_start_matches(' ').len();
            &line[leading.min(prefix_len)..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn list() -> Rule {
    Rule::new(order::LIST)
        .with_match_fn(|source, state, prev_capture_text| {
            // Only at the start of a line, and only in block scope or
            // inside another list item.
            let lookbehind = LIST_LOOKBEHIND_R.captures(prev_capture_text)?;
            if !(state.in_list || !state.inline) {
                return None;
            }
            // Re-prepend the indentation the previous capture consumed so
            // the block regex sees the item's true column.
            let indent = lookbehind.get(1).map_or("", |m| m.as_str());
            let prefixed = format!("{indent}{source}");
            match LIST_R.captures(&prefixed) {
                Ok(caps) => caps.map(|c| Capture::from_fancy(&c)),
                Err(err) => {
                    log::warn!("list regex failed, treating as no match: {err}");
                    None
                }
            }
        })
        .with_parse(|capture, ctx, state| {
            let bullet = capture.group(2);
            let ordered = bullet.len() > 1;
            let start = if ordered {
                bullet.trim_end_matches('.').parse().ok()
            } else {
                None
            };

            let block = LIST_BLOCK_END_R.replace(capture.full(), "\n");
            let item_sources: Vec<&str> = LIST_ITEM_R
                .find_iter(&block)
                .filter_map(|m| m.ok())
                .map(|m| m.as_str())
                .collect();

            let count = item_sources.len();
            let mut items = Vec::with_capacity(count);
            let mut last_was_paragraph = false;
            for (i, item) in item_sources.into_iter().enumerate() {
                let prefix_len = LIST_ITEM_PREFIX_R
                    .find(item)
                    .map_or(0, |m| m.as_str().len());
                let content = unindent(item, prefix_len);
                let content = LIST_ITEM_PREFIX_R.replace(&content, "");

                let is_last = i == count - 1;
                let contains_blocks = content.contains("\n\n");
                // Loose-ness is inherited into the tail: the last item of a
                // loose list renders loose even without its own blank line.
                let is_paragraph = contains_blocks || (is_last && last_was_paragraph);
                last_was_paragraph = is_paragraph;

                let was_inline = state.inline;
                let was_list = state.in_list;
                state.in_list = true;
                let adjusted = if is_paragraph {
                    state.inline = false;
                    LIST_ITEM_END_R.replace(&content, "\n\n").into_owned()
                } else {
                    state.inline = true;
                    LIST_ITEM_END_R.replace(&content, "").into_owned()
                };
                let parsed = ctx.parse(&adjusted, state);
                state.inline = was_inline;
                state.in_list = was_list;
                items.push(parsed?);
            }

            Ok(Node::List(List {
                ordered,
                start,
                items,
            })
            .into())
        })
        .with_output("html", |node, ctx, state| {
            let Node::List(list) = node else {
                return Ok(Artifact::Empty);
            };
            let mut items_html = String::new();
            for item in &list.items {
                let content = ctx.output(item, state)?.into_html();
                items_html.push_str(&html_tag("li", &content, &[], true));
            }
            let start = list.start.filter(|s| *s != 0).map(|s| s.to_string());
            let tag = if list.ordered { "ol" } else { "ul" };
            Ok(Artifact::Html(html_tag(
                tag,
                &items_html,
                &[("start", start.as_deref())],
                true,
            )))
        })
}
