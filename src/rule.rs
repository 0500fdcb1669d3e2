// The rule/output protocol: captures, parse state, match adapters, and the
// rule table. A rule table carries both parse behavior (order, match,
// quality, parse) and output behavior (one function per output property),
// keyed by rule name, so grammars extend without forking the engine.

use std::collections::{BTreeMap, HashMap};
use std::ops::Index;
use std::sync::Arc;

use fancy_regex::Regex;

use crate::error::MarkdownError;
use crate::node::Node;
use crate::output::{Artifact, OutputContext};
use crate::parser::ParseContext;

/// The result of probing a source prefix with a rule's match function.
///
/// `capture[0]` is the full match; `capture[i]` are subgroup captures, with
/// absent groups reading as the empty string. A capture must begin at
/// position 0 of the probed source; the dispatcher rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    groups: Vec<Option<String>>,
    start: usize,
}

impl Capture {
    /// Build a capture by hand, e.g. from a custom match function. The
    /// capture is anchored at position 0.
    pub fn new(groups: Vec<Option<String>>) -> Self {
        Self { groups, start: 0 }
    }

    /// Build a capture with an explicit start offset. Offsets other than 0
    /// make the dispatcher fail; this exists so match functions can report
    /// exactly what their regex produced.
    pub fn with_start(groups: Vec<Option<String>>, start: usize) -> Self {
        Self { groups, start }
    }

    pub(crate) fn from_fancy(caps: &fancy_regex::Captures<'_>) -> Self {
        let groups = (0..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_owned()))
            .collect();
        let start = caps.get(0).map_or(0, |m| m.start());
        Self { groups, start }
    }

    /// The full matched text.
    pub fn full(&self) -> &str {
        self.group(0)
    }

    /// Byte offset of the match within the probed source.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Subgroup `i`, or `None` when it did not participate in the match.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.groups.get(i).and_then(|g| g.as_deref())
    }

    /// Subgroup `i`, with absent groups reading as `""`.
    pub fn group(&self, i: usize) -> &str {
        self.get(i).unwrap_or("")
    }

    /// Number of capture slots, full match included.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Index<usize> for Capture {
    type Output = str;

    fn index(&self, i: usize) -> &str {
        self.group(i)
    }
}

/// A stored reference definition (`[key]: target "title"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefDef {
    pub target: String,
    pub title: Option<String>,
}

/// Mutable parse/output state threaded through all nested calls.
///
/// Scope fields (`inline`, `in_table`, `in_list`, `key`) are mutated in
/// place as parsing descends; anything that flips one must restore it
/// before returning. A state belongs to a single parse or render
/// invocation; concurrent invocations each build their own.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Current scope: inline rules match only when true, block rules only
    /// when false.
    pub inline: bool,
    /// Suppress the `"\n\n"` suffix appended at top-level block parse.
    pub disable_auto_block_newlines: bool,
    /// True inside table-row parsing; enables the `tableSeparator` rule.
    pub in_table: bool,
    /// True inside a list item body; re-enables the list rule under inline
    /// scope.
    pub in_list: bool,
    /// The most recent successful capture, kept whole for rules that need
    /// limited lookbehind (the list rule reads its trailing indentation).
    pub prev_capture: Option<Capture>,
    /// Reference definitions accumulated so far, by canonicalized key.
    pub defs: HashMap<String, RefDef>,
    /// Stable sibling index maintained by the tree `Array` joiner.
    pub key: Option<String>,
    /// Client-defined fields, passed through untouched.
    pub extras: HashMap<String, serde_json::Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What scope a regex-backed match function participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Inline,
    Block,
    Any,
}

type CustomMatchFn = Arc<dyn Fn(&str, &State, &str) -> Option<Capture> + Send + Sync>;

/// A rule's match function: a scoped regex or a custom closure.
#[derive(Clone)]
pub struct Matcher {
    kind: MatcherKind,
}

#[derive(Clone)]
enum MatcherKind {
    Scoped { scope: Scope, regex: Regex },
    Custom(CustomMatchFn),
}

impl Matcher {
    /// Wrap a regex that matches only in inline scope.
    pub fn inline(regex: Regex) -> Self {
        Self::scoped(Scope::Inline, regex)
    }

    /// Wrap a regex that matches only in block scope.
    pub fn block(regex: Regex) -> Self {
        Self::scoped(Scope::Block, regex)
    }

    /// Wrap a regex that matches in either scope.
    pub fn any_scope(regex: Regex) -> Self {
        Self::scoped(Scope::Any, regex)
    }

    fn scoped(scope: Scope, regex: Regex) -> Self {
        Self {
            kind: MatcherKind::Scoped { scope, regex },
        }
    }

    /// Wrap a custom match closure, e.g. one that consults state before
    /// applying a regex.
    pub fn custom(f: impl Fn(&str, &State, &str) -> Option<Capture> + Send + Sync + 'static) -> Self {
        Self {
            kind: MatcherKind::Custom(Arc::new(f)),
        }
    }

    /// The underlying regex, for introspection. `None` for custom matchers.
    pub fn regex(&self) -> Option<&Regex> {
        match &self.kind {
            MatcherKind::Scoped { regex, .. } => Some(regex),
            MatcherKind::Custom(_) => None,
        }
    }

    /// Probe the prefix of `source`. `prev_capture_text` is the full text of
    /// the previous capture, or `""` at the start of a parse.
    pub fn run(&self, source: &str, state: &State, prev_capture_text: &str) -> Option<Capture> {
        match &self.kind {
            MatcherKind::Scoped { scope, regex } => {
                let active = match scope {
                    Scope::Inline => state.inline,
                    Scope::Block => !state.inline,
                    Scope::Any => true,
                };
                if !active {
                    return None;
                }
                match regex.captures(source) {
                    Ok(caps) => caps.map(|c| Capture::from_fancy(&c)),
                    Err(err) => {
                        log::warn!("match regex failed, treating as no match: {err}");
                        None
                    }
                }
            }
            MatcherKind::Custom(f) => f(source, state, prev_capture_text),
        }
    }
}

/// Match function scoped to inline content. The regex must be anchored with
/// `^`.
pub fn inline_regex(regex: Regex) -> Matcher {
    Matcher::inline(regex)
}

/// Match function scoped to block content. The regex must be anchored with
/// `^`.
pub fn block_regex(regex: Regex) -> Matcher {
    Matcher::block(regex)
}

/// Match function active in any scope. The regex must be anchored with `^`.
pub fn any_scope_regex(regex: Regex) -> Matcher {
    Matcher::any_scope(regex)
}

/// What a rule's parse function hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// One node. A `Custom` node with an empty kind gets the rule name.
    Single(Node),
    /// Several sibling nodes, appended as-is.
    Many(Vec<Node>),
}

impl From<Node> for Parsed {
    fn from(node: Node) -> Self {
        Parsed::Single(node)
    }
}

impl From<Vec<Node>> for Parsed {
    fn from(nodes: Vec<Node>) -> Self {
        Parsed::Many(nodes)
    }
}

pub type QualityFn = Arc<dyn Fn(&Capture, &State, &str) -> f64 + Send + Sync>;
pub type ParseFn = Arc<
    dyn Fn(&Capture, &ParseContext<'_>, &mut State) -> Result<Parsed, MarkdownError>
        + Send
        + Sync,
>;
pub type OutputFn = Arc<
    dyn Fn(&Node, &OutputContext<'_>, &mut State) -> Result<Artifact, MarkdownError>
        + Send
        + Sync,
>;
pub type ArrayOutputFn = Arc<
    dyn Fn(&[Node], &OutputContext<'_>, &mut State) -> Result<Artifact, MarkdownError>
        + Send
        + Sync,
>;

/// One entry of a rule table.
#[derive(Clone)]
pub struct Rule {
    /// Precedence: lower is higher. Must be finite; a non-finite order is
    /// logged and the rule kept.
    pub order: f64,
    /// Absent for output-only rules; such entries never participate in
    /// parsing.
    pub matcher: Option<Matcher>,
    /// Tiebreaker among equal-order rules that both matched; higher wins.
    pub quality: Option<QualityFn>,
    pub parse: Option<ParseFn>,
    /// Output functions by property name (e.g. `"html"`). A rule with no
    /// entry for a property declines rendering for it.
    pub outputs: BTreeMap<String, OutputFn>,
}

impl Rule {
    pub fn new(order: f64) -> Self {
        Self {
            order,
            matcher: None,
            quality: None,
            parse: None,
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_match(mut self, matcher: Matcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_match_fn(
        self,
        f: impl Fn(&str, &State, &str) -> Option<Capture> + Send + Sync + 'static,
    ) -> Self {
        self.with_match(Matcher::custom(f))
    }

    pub fn with_quality(
        mut self,
        f: impl Fn(&Capture, &State, &str) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.quality = Some(Arc::new(f));
        self
    }

    pub fn with_parse(
        mut self,
        f: impl Fn(&Capture, &ParseContext<'_>, &mut State) -> Result<Parsed, MarkdownError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.parse = Some(Arc::new(f));
        self
    }

    pub fn with_output(
        mut self,
        property: &str,
        f: impl Fn(&Node, &OutputContext<'_>, &mut State) -> Result<Artifact, MarkdownError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.outputs.insert(property.to_owned(), Arc::new(f));
        self
    }
}

/// A rule table: named rules plus optional per-property `Array` joiners for
/// sibling sequences. Start from [`default_rules`](crate::default_rules)
/// and override or add entries to extend the grammar.
#[derive(Clone, Default)]
pub struct Rules {
    pub(crate) rules: BTreeMap<String, Rule>,
    pub(crate) array: BTreeMap<String, ArrayOutputFn>,
}

impl Rules {
    /// An empty table with no rules and no joiners.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, rule: Rule) -> Option<Rule> {
        self.rules.insert(name.into(), rule)
    }

    pub fn remove(&mut self, name: &str) -> Option<Rule> {
        self.rules.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Rule> {
        self.rules.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Replace the `Array` joiner used to combine sibling nodes for a
    /// property. Without one, the built-in `html`/`tree` joiners apply.
    pub fn set_array_joiner(
        &mut self,
        property: &str,
        f: impl Fn(&[Node], &OutputContext<'_>, &mut State) -> Result<Artifact, MarkdownError>
            + Send
            + Sync
            + 'static,
    ) {
        self.array.insert(property.to_owned(), Arc::new(f));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_indexes_groups() {
        let cap = Capture::new(vec![Some("ab".into()), None, Some("b".into())]);
        assert_eq!(cap.full(), "ab");
        assert_eq!(&cap[1], "");
        assert_eq!(&cap[2], "b");
        assert_eq!(cap.get(1), None);
        assert_eq!(cap.get(9), None);
    }

    #[test]
    fn scoped_matchers_respect_state() {
        let matcher = Matcher::inline(Regex::new(r"^x").unwrap());
        let mut state = State::new();
        assert!(matcher.run("xy", &state, "").is_none());
        state.inline = true;
        let cap = matcher.run("xy", &state, "").unwrap();
        assert_eq!(cap.full(), "x");
    }

    #[test]
    fn matcher_exposes_its_regex() {
        let matcher = any_scope_regex(Regex::new(r"^a+").unwrap());
        assert_eq!(matcher.regex().unwrap().as_str(), "^a+");
        let custom = Matcher::custom(|_, _, _| None);
        assert!(custom.regex().is_none());
    }
}
