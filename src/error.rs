/// Errors that can occur while parsing Markdown or rendering an AST.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MarkdownError {
    /// The dispatcher found no rule matching a non-empty prefix. The
    /// lowest-precedence rule is contractually the universal fallback, so
    /// the message names it.
    #[error(
        "no rule matched the remaining content; `{rule}` has the highest \
         `order` and must match anything handed to it, but it did not match:\n{content}"
    )]
    NoMatchingRule { rule: String, content: String },

    /// A rule's match function returned a capture that does not start at the
    /// current parse position.
    #[error(
        "rule `{rule}` returned a capture starting at index {index}; matches \
         must begin at index 0 (did you forget a `^` at the start of the regex?)"
    )]
    UnanchoredMatch { rule: String, index: usize },

    /// A rule was selected by the dispatcher but carries no parse function.
    #[error("rule `{rule}` matched but has no parse function")]
    MissingParse { rule: String },

    /// An output was requested for a property with no `Array` joiner, so
    /// sibling node sequences cannot be combined.
    #[error(
        "no `Array` joiner for output property `{property}`; add one to the \
         rule table to join sibling nodes of that property"
    )]
    MissingArrayJoiner { property: String },

    /// A node reached the output dispatcher but its rule has no output
    /// function for the requested property.
    #[error("node type `{kind}` has no output function for property `{property}`")]
    MissingOutput { kind: String, property: String },
}
