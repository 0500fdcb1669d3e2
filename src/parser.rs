// The parser dispatcher.
//
// `parser_for` builds a `Parser` over a rule table: rule names are sorted
// by ascending order (quality-bearing rules first within an order, then by
// name), and parsing repeatedly picks the best-matching rule and consumes
// its capture until the source is exhausted.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::error::MarkdownError;
use crate::node::{visit_all, Custom, Node};
use crate::rule::{Capture, Parsed, RefDef, Rule, Rules, State};
use crate::sanitize::preprocess;

/// Build a parser from a rule table. Entries without a match function are
/// skipped; a rule with a non-finite order is logged and kept.
pub fn parser_for(rules: Arc<Rules>) -> Parser {
    Parser::new(rules)
}

/// A parse function produced from a rule table.
pub struct Parser {
    rules: Arc<Rules>,
    /// Rule names in dispatch order.
    order: Vec<String>,
    default_state: State,
}

impl Parser {
    pub fn new(rules: Arc<Rules>) -> Self {
        let mut order: Vec<String> = rules
            .rules
            .iter()
            .filter(|(name, rule)| {
                if rule.matcher.is_none() {
                    return false;
                }
                if !rule.order.is_finite() {
                    log::warn!("invalid order for rule `{name}`: {}", rule.order);
                }
                true
            })
            .map(|(name, _)| name.clone())
            .collect();
        order.sort_by(|a, b| {
            let rule_a = &rules.rules[a.as_str()];
            let rule_b = &rules.rules[b.as_str()];
            rule_a
                .order
                .total_cmp(&rule_b.order)
                .then_with(|| {
                    let a_has_quality = if rule_a.quality.is_some() { 0 } else { 1 };
                    let b_has_quality = if rule_b.quality.is_some() { 0 } else { 1 };
                    a_has_quality.cmp(&b_has_quality)
                })
                .then_with(|| a.cmp(b))
        });
        Self {
            rules,
            order,
            default_state: State::new(),
        }
    }

    /// Use `state` as the template cloned for each `parse` call.
    pub fn with_default_state(mut self, state: State) -> Self {
        self.default_state = state;
        self
    }

    /// Parse with a fresh copy of the default state.
    pub fn parse(&self, source: &str) -> Result<Vec<Node>, MarkdownError> {
        let mut state = self.default_state.clone();
        self.parse_with_state(source, &mut state)
    }

    /// Parse with a caller-owned state. The state's `prev_capture` is
    /// cleared; scope fields and accumulated definitions are kept, so a
    /// pre-populated `defs` table patches references parsed here.
    pub fn parse_with_state(
        &self,
        source: &str,
        state: &mut State,
    ) -> Result<Vec<Node>, MarkdownError> {
        state.prev_capture = None;
        let padded;
        let source = if !state.inline && !state.disable_auto_block_newlines {
            padded = format!("{source}\n\n");
            padded.as_str()
        } else {
            source
        };
        let source = preprocess(source);
        let mut nodes = self.nested_parse(&source, state)?;
        patch_references(&mut nodes, &state.defs);
        Ok(nodes)
    }

    fn nested_parse(&self, source: &str, state: &mut State) -> Result<Vec<Node>, MarkdownError> {
        let ctx = ParseContext { parser: self };
        let mut result = Vec::new();
        let mut source = source;

        while !source.is_empty() {
            let mut best: Option<(&str, &Rule, Capture)> = None;
            let mut best_quality = f64::NAN;
            let mut i = 0;

            loop {
                let Some(name) = self.order.get(i) else { break };
                let rule = &self.rules.rules[name.as_str()];
                let curr_order = rule.order;
                let prev_text = state.prev_capture.as_ref().map_or("", |c| c.full());

                if let Some(capture) = rule
                    .matcher
                    .as_ref()
                    .and_then(|m| m.run(source, state, prev_text))
                {
                    let quality = match &rule.quality {
                        Some(f) => f(&capture, state, prev_text),
                        None => 0.0,
                    };
                    // best_quality starts as NaN, so the first match always
                    // wins; later ones only on strictly greater quality.
                    if !(quality <= best_quality) {
                        best = Some((name.as_str(), rule, capture));
                        best_quality = quality;
                    }
                }

                i += 1;
                let Some(next_name) = self.order.get(i) else { break };
                if best.is_some() {
                    let next = &self.rules.rules[next_name.as_str()];
                    if !(next.order == curr_order && next.quality.is_some()) {
                        break;
                    }
                }
            }

            let Some((name, rule, capture)) = best else {
                return Err(MarkdownError::NoMatchingRule {
                    rule: self.order.last().cloned().unwrap_or_default(),
                    content: source.to_owned(),
                });
            };
            if capture.start() != 0 {
                return Err(MarkdownError::UnanchoredMatch {
                    rule: name.to_owned(),
                    index: capture.start(),
                });
            }
            let parse = rule
                .parse
                .as_ref()
                .ok_or_else(|| MarkdownError::MissingParse {
                    rule: name.to_owned(),
                })?;

            let consumed = capture.full().len();
            match parse(&capture, &ctx, state)? {
                Parsed::Many(nodes) => result.extend(nodes),
                Parsed::Single(mut node) => {
                    if let Node::Custom(custom) = &mut node {
                        if custom.kind.is_empty() {
                            custom.kind = name.to_owned();
                        }
                    }
                    result.push(node);
                }
            }
            state.prev_capture = Some(capture);
            // The list rule may report a capture longer than the remaining
            // source (it re-prepends already-consumed indentation); clamp.
            source = source.get(consumed..).unwrap_or("");
        }

        Ok(result)
    }
}

/// Handle to the in-progress parse, passed to every rule's parse function
/// so it can recurse into nested content.
pub struct ParseContext<'a> {
    parser: &'a Parser,
}

impl ParseContext<'_> {
    /// Parse nested content under the current state. Scope fields are taken
    /// as-is; use [`parse_inline`]/[`parse_block`] to switch scope.
    pub fn parse(&self, source: &str, state: &mut State) -> Result<Vec<Node>, MarkdownError> {
        self.parser.nested_parse(source, state)
    }
}

/// Parse `content` in inline scope, restoring the previous scope after.
pub fn parse_inline(
    ctx: &ParseContext<'_>,
    content: &str,
    state: &mut State,
) -> Result<Vec<Node>, MarkdownError> {
    let was_inline = state.inline;
    state.inline = true;
    let result = ctx.parse(content, state);
    state.inline = was_inline;
    result
}

/// Parse `content + "\n\n"` in block scope, restoring the previous scope
/// after.
pub fn parse_block(
    ctx: &ParseContext<'_>,
    content: &str,
    state: &mut State,
) -> Result<Vec<Node>, MarkdownError> {
    let was_inline = state.inline;
    state.inline = false;
    let result = ctx.parse(&format!("{content}\n\n"), state);
    state.inline = was_inline;
    result
}

/// Inline-parse `capture[1]`, the conventional content group.
pub fn parse_capture_inline(
    capture: &Capture,
    ctx: &ParseContext<'_>,
    state: &mut State,
) -> Result<Vec<Node>, MarkdownError> {
    parse_inline(ctx, capture.group(1), state)
}

/// A parse result with no payload at all; the dispatcher fills in the rule
/// name as its kind.
pub fn ignore_capture() -> Parsed {
    Parsed::Single(Node::Custom(Custom::default()))
}

/// Canonical form of a reference key: whitespace runs collapse to a single
/// space and the result is lowercased. Definitions and references must
/// agree on this before lookup.
pub fn ref_key(raw: &str) -> String {
    static WHITESPACE_RUN_R: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\s+").unwrap());
    WHITESPACE_RUN_R.replace_all(raw, " ").to_lowercase()
}

/// Final patch pass over a finished tree: every reference link/image whose
/// key has a definition receives that definition's target and title. This
/// covers definitions appearing before or after their references.
fn patch_references(nodes: &mut [Node], defs: &HashMap<String, RefDef>) {
    visit_all(nodes, &mut |node| match node {
        Node::Link(link) => {
            if let Some(key) = &link.reference {
                if let Some(def) = defs.get(key) {
                    link.target = Some(def.target.clone());
                    link.title = def.title.clone();
                }
            }
        }
        Node::Image(image) => {
            if let Some(key) = &image.reference {
                if let Some(def) = defs.get(key) {
                    image.target = Some(def.target.clone());
                    image.title = def.title.clone();
                }
            }
        }
        _ => {}
    });
}
