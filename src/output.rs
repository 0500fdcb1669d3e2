// The output dispatcher.
//
// `output_for` builds a `Renderer` over a rule table for one output
// property (e.g. `"html"`). Rendering a node delegates to that rule's
// output function; rendering a sibling sequence goes through the table's
// `Array` joiner for the property, or a built-in default. The `html`
// joiner concatenates strings; the `tree` joiner emits a fragment and
// maintains `state.key` so component frameworks get stable child identity.

use std::sync::Arc;

use crate::error::MarkdownError;
use crate::node::{Node, Text};
use crate::rule::{ArrayOutputFn, Rules, State};

/// A rendered artifact: an HTML string, a framework-agnostic view object,
/// or a sequence of either.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Artifact {
    #[default]
    Empty,
    Html(String),
    Element(Element),
    Fragment(Vec<Artifact>),
}

impl Artifact {
    /// Flatten to an HTML string. Fragments concatenate; tree-only
    /// artifacts contribute nothing.
    pub fn into_html(self) -> String {
        match self {
            Artifact::Html(html) => html,
            Artifact::Fragment(parts) => parts.into_iter().map(Artifact::into_html).collect(),
            Artifact::Empty | Artifact::Element(_) => String::new(),
        }
    }
}

/// A minimal view object for tree outputs. Component-framework adapters
/// consume these; the engine itself only creates and nests them.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    /// Sibling identity, copied from `state.key` by the producing rule.
    pub key: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Artifact>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Build a renderer from a rule table for one output property. Fails when
/// no `Array` joiner is available for that property.
pub fn output_for(rules: Arc<Rules>, property: &str) -> Result<Renderer, MarkdownError> {
    Renderer::new(rules, property)
}

/// A render function produced from a rule table.
pub struct Renderer {
    rules: Arc<Rules>,
    property: String,
    array: ArrayOutputFn,
    default_state: State,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("property", &self.property)
            .field("default_state", &self.default_state)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new(rules: Arc<Rules>, property: &str) -> Result<Self, MarkdownError> {
        let array = rules
            .array
            .get(property)
            .cloned()
            .or_else(|| builtin_array_joiner(property))
            .ok_or_else(|| MarkdownError::MissingArrayJoiner {
                property: property.to_owned(),
            })?;
        Ok(Self {
            rules,
            property: property.to_owned(),
            array,
            default_state: State::new(),
        })
    }

    /// Use `state` as the template cloned for each `render` call.
    pub fn with_default_state(mut self, state: State) -> Self {
        self.default_state = state;
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Render with a fresh copy of the default state.
    pub fn render(&self, ast: &[Node]) -> Result<Artifact, MarkdownError> {
        let mut state = self.default_state.clone();
        self.render_with_state(ast, &mut state)
    }

    /// Render with a caller-owned state, e.g. the one a parse populated.
    pub fn render_with_state(
        &self,
        ast: &[Node],
        state: &mut State,
    ) -> Result<Artifact, MarkdownError> {
        let ctx = OutputContext { renderer: self };
        ctx.output(ast, state)
    }
}

/// Handle to the in-progress render, passed to every rule's output
/// function so it can recurse into child content.
pub struct OutputContext<'a> {
    renderer: &'a Renderer,
}

impl OutputContext<'_> {
    /// Render a sibling sequence through the `Array` joiner.
    pub fn output(&self, nodes: &[Node], state: &mut State) -> Result<Artifact, MarkdownError> {
        (self.renderer.array)(nodes, self, state)
    }

    /// Render a single node through its rule's output function.
    pub fn output_node(&self, node: &Node, state: &mut State) -> Result<Artifact, MarkdownError> {
        let kind = node.kind();
        let output = self
            .renderer
            .rules
            .rules
            .get(kind)
            .and_then(|rule| rule.outputs.get(&self.renderer.property))
            .ok_or_else(|| MarkdownError::MissingOutput {
                kind: kind.to_owned(),
                property: self.renderer.property.clone(),
            })?;
        output(node, self, state)
    }
}

fn builtin_array_joiner(property: &str) -> Option<ArrayOutputFn> {
    match property {
        "html" => Some(Arc::new(html_array_joiner)),
        "tree" => Some(Arc::new(tree_array_joiner)),
        _ => None,
    }
}

/// Built-in `html` joiner: folds consecutive text siblings into one maximal
/// run, renders each node, concatenates the strings.
fn html_array_joiner(
    nodes: &[Node],
    ctx: &OutputContext<'_>,
    state: &mut State,
) -> Result<Artifact, MarkdownError> {
    let mut out = String::new();
    let mut i = 0;
    while i < nodes.len() {
        let artifact = match &nodes[i] {
            Node::Text(text) => {
                let mut content = text.content.clone();
                while let Some(Node::Text(next)) = nodes.get(i + 1) {
                    content.push_str(&next.content);
                    i += 1;
                }
                ctx.output_node(&Node::Text(Text { content }), state)?
            }
            node => ctx.output_node(node, state)?,
        };
        out.push_str(&artifact.into_html());
        i += 1;
    }
    Ok(Artifact::Html(out))
}

/// Built-in tree joiner: same text folding, but emits a fragment and sets
/// `state.key` to the sibling index before each child, restoring the
/// caller's key on exit.
fn tree_array_joiner(
    nodes: &[Node],
    ctx: &OutputContext<'_>,
    state: &mut State,
) -> Result<Artifact, MarkdownError> {
    let prior_key = state.key.take();
    let mut children = Vec::with_capacity(nodes.len());
    let mut i = 0;
    while i < nodes.len() {
        state.key = Some(i.to_string());
        let artifact = match &nodes[i] {
            Node::Text(text) => {
                let mut content = text.content.clone();
                while let Some(Node::Text(next)) = nodes.get(i + 1) {
                    content.push_str(&next.content);
                    i += 1;
                }
                ctx.output_node(&Node::Text(Text { content }), state)?
            }
            node => ctx.output_node(node, state)?,
        };
        children.push(artifact);
        i += 1;
    }
    state.key = prior_key;
    Ok(Artifact::Fragment(children))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_html_flattens_fragments() {
        let artifact = Artifact::Fragment(vec![
            Artifact::Html("a".into()),
            Artifact::Empty,
            Artifact::Fragment(vec![Artifact::Html("b".into())]),
        ]);
        assert_eq!(artifact.into_html(), "ab");
    }

    #[test]
    fn missing_array_joiner_is_an_error() {
        let rules = Arc::new(Rules::new());
        let err = Renderer::new(rules, "vue").unwrap_err();
        assert!(matches!(err, MarkdownError::MissingArrayJoiner { .. }));
    }
}
