// AST node types for the default Markdown grammar.
//
// Each node is a variant of the `Node` enum, tagged by the rule name that
// produced it; `Node::kind()` returns that tag, which is what the output
// dispatcher uses to look the rule back up. User-defined rules that need
// shapes the default grammar doesn't know about use the `Custom` variant.

/// Alignment of a table column. `None` in an alignment row means the column
/// is unaligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    /// CSS keyword for a `text-align` declaration.
    pub fn as_css(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

// ---------------------------------------------------------------------------
// Node structs
// ---------------------------------------------------------------------------

/// ATX (`# …`) or setext heading.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub level: u8, // 1–6
    pub content: Vec<Node>,
}

/// Fenced or indented code block.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    pub lang: Option<String>,
    pub content: String,
}

/// Block quote (`> …`).
#[derive(Debug, Clone, PartialEq)]
pub struct BlockQuote {
    pub content: Vec<Node>,
}

/// Ordered or unordered list. Each entry of `items` is the node sequence of
/// one list item: inline content for tight items, block content for loose
/// (paragraph) items.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub ordered: bool,
    pub start: Option<u32>,
    pub items: Vec<Vec<Node>>,
}

/// Reference definition (`[key]: target "title"`). Does not render; it
/// feeds the definition table used to patch reference links.
#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    /// Canonicalized reference key.
    pub def: String,
    pub target: String,
    pub title: Option<String>,
}

/// Pipe table or `nptable`. `header` and each row of `cells` hold one node
/// sequence per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<Vec<Node>>,
    pub align: Vec<Option<Align>>,
    pub cells: Vec<Vec<Vec<Node>>>,
}

/// Paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub content: Vec<Node>,
}

/// Hyperlink. `reference` is the canonicalized key of a reference link
/// (`[text][key]`) awaiting or carrying a definition; plain links leave it
/// `None`. An unresolved reference keeps `target` empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub content: Vec<Node>,
    pub target: Option<String>,
    pub title: Option<String>,
    pub reference: Option<String>,
}

/// Image (`![alt](src "title")` or `![alt][key]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub alt: String,
    pub target: Option<String>,
    pub title: Option<String>,
    pub reference: Option<String>,
}

/// Emphasis (`*text*` or `_text_`).
#[derive(Debug, Clone, PartialEq)]
pub struct Em {
    pub content: Vec<Node>,
}

/// Strong emphasis (`**text**`).
#[derive(Debug, Clone, PartialEq)]
pub struct Strong {
    pub content: Vec<Node>,
}

/// Underline (`__text__`).
#[derive(Debug, Clone, PartialEq)]
pub struct Underline {
    pub content: Vec<Node>,
}

/// Strikethrough (`~~text~~`).
#[derive(Debug, Clone, PartialEq)]
pub struct Del {
    pub content: Vec<Node>,
}

/// Inline code (`` `code` ``).
#[derive(Debug, Clone, PartialEq)]
pub struct InlineCode {
    pub content: String,
}

/// Plain text run.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
}

/// Escape hatch for user-defined rules: a free-form tag plus an arbitrary
/// payload. A `Custom` node with an empty `kind` gets the producing rule's
/// name filled in by the dispatcher.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Custom {
    pub kind: String,
    pub data: serde_json::Value,
    pub children: Vec<Node>,
}

// ---------------------------------------------------------------------------
// Node enum
// ---------------------------------------------------------------------------

/// A node in the Markdown abstract syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Block content
    Heading(Heading),
    CodeBlock(CodeBlock),
    BlockQuote(BlockQuote),
    List(List),
    Def(Def),
    Table(Table),
    Newline,
    Paragraph(Paragraph),
    Hr,

    // Inline content
    TableSeparator,
    Link(Link),
    Image(Image),
    Em(Em),
    Strong(Strong),
    Underline(Underline),
    Del(Del),
    InlineCode(InlineCode),
    Br,
    Text(Text),

    // User-defined
    Custom(Custom),
}

impl Node {
    /// The rule-name tag of this node, used for output dispatch.
    pub fn kind(&self) -> &str {
        match self {
            Node::Heading(_) => "heading",
            Node::CodeBlock(_) => "codeBlock",
            Node::BlockQuote(_) => "blockQuote",
            Node::List(_) => "list",
            Node::Def(_) => "def",
            Node::Table(_) => "table",
            Node::Newline => "newline",
            Node::Paragraph(_) => "paragraph",
            Node::Hr => "hr",
            Node::TableSeparator => "tableSeparator",
            Node::Link(_) => "link",
            Node::Image(_) => "image",
            Node::Em(_) => "em",
            Node::Strong(_) => "strong",
            Node::Underline(_) => "u",
            Node::Del(_) => "del",
            Node::InlineCode(_) => "inlineCode",
            Node::Br => "br",
            Node::Text(_) => "text",
            Node::Custom(c) => &c.kind,
        }
    }

    /// Convenience constructor for a text node.
    pub fn text(content: impl Into<String>) -> Node {
        Node::Text(Text {
            content: content.into(),
        })
    }

    /// Visit every node of the subtree rooted here, including nodes nested
    /// inside list items and table cells, depth-first.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        match self {
            Node::Heading(n) => visit_all(&mut n.content, f),
            Node::BlockQuote(n) => visit_all(&mut n.content, f),
            Node::Paragraph(n) => visit_all(&mut n.content, f),
            Node::Link(n) => visit_all(&mut n.content, f),
            Node::Em(n) => visit_all(&mut n.content, f),
            Node::Strong(n) => visit_all(&mut n.content, f),
            Node::Underline(n) => visit_all(&mut n.content, f),
            Node::Del(n) => visit_all(&mut n.content, f),
            Node::Custom(n) => visit_all(&mut n.children, f),
            Node::List(n) => {
                for item in &mut n.items {
                    visit_all(item, f);
                }
            }
            Node::Table(n) => {
                for cell in &mut n.header {
                    visit_all(cell, f);
                }
                for row in &mut n.cells {
                    for cell in row {
                        visit_all(cell, f);
                    }
                }
            }
            Node::CodeBlock(_)
            | Node::Def(_)
            | Node::Newline
            | Node::Hr
            | Node::TableSeparator
            | Node::Image(_)
            | Node::InlineCode(_)
            | Node::Br
            | Node::Text(_) => {}
        }
    }
}

/// Visit every node in a sequence of sibling subtrees.
pub fn visit_all(nodes: &mut [Node], f: &mut impl FnMut(&mut Node)) {
    for node in nodes {
        node.visit_mut(f);
    }
}
