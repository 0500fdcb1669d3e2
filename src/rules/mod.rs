// The default Markdown rule set.
//
// Rules are listed here in precedence order; each submodule builds the
// `Rule` values for its slice of the grammar, with `html` output functions
// alongside the parse behavior.

pub(crate) mod block;
pub(crate) mod inline;
pub(crate) mod list;
pub(crate) mod table;

use crate::rule::Rules;

// Precedence slots, lowest wins. em/strong/u share one slot on purpose and
// compete on quality.
pub(crate) mod order {
    pub const HEADING: f64 = 0.0;
    pub const NPTABLE: f64 = 1.0;
    pub const LHEADING: f64 = 2.0;
    pub const HR: f64 = 3.0;
    pub const CODE_BLOCK: f64 = 4.0;
    pub const FENCE: f64 = 5.0;
    pub const BLOCK_QUOTE: f64 = 6.0;
    pub const LIST: f64 = 7.0;
    pub const DEF: f64 = 8.0;
    pub const TABLE: f64 = 9.0;
    pub const NEWLINE: f64 = 10.0;
    pub const PARAGRAPH: f64 = 11.0;
    pub const ESCAPE: f64 = 12.0;
    pub const TABLE_SEPARATOR: f64 = 13.0;
    pub const AUTOLINK: f64 = 14.0;
    pub const MAILTO: f64 = 15.0;
    pub const URL: f64 = 16.0;
    pub const LINK: f64 = 17.0;
    pub const IMAGE: f64 = 18.0;
    pub const REFLINK: f64 = 19.0;
    pub const REFIMAGE: f64 = 20.0;
    pub const EMPHASIS: f64 = 21.0;
    pub const DEL: f64 = 22.0;
    pub const INLINE_CODE: f64 = 23.0;
    pub const BR: f64 = 24.0;
    pub const TEXT: f64 = 25.0;
}

/// The default Markdown grammar with its `html` outputs. Extend it by
/// inserting or replacing entries on the returned table.
pub fn default_rules() -> Rules {
    let mut rules = Rules::new();
    rules.insert("heading", block::heading());
    rules.insert("nptable", table::nptable());
    rules.insert("lheading", block::lheading());
    rules.insert("hr", block::hr());
    rules.insert("codeBlock", block::code_block());
    rules.insert("fence", block::fence());
    rules.insert("blockQuote", block::block_quote());
    rules.insert("list", list::list());
    rules.insert("def", block::def());
    rules.insert("table", table::table());
    rules.insert("newline", block::newline());
    rules.insert("paragraph", block::paragraph());
    rules.insert("escape", inline::escape());
    rules.insert("tableSeparator", table::table_separator());
    rules.insert("autolink", inline::autolink());
    rules.insert("mailto", inline::mailto());
    rules.insert("url", inline::url());
    rules.insert("link", inline::link());
    rules.insert("image", inline::image());
    rules.insert("reflink", inline::reflink());
    rules.insert("refimage", inline::refimage());
    rules.insert("em", inline::em());
    rules.insert("strong", inline::strong());
    rules.insert("u", inline::u());
    rules.insert("del", inline::del());
    rules.insert("inlineCode", inline::inline_code());
    rules.insert("br", inline::br());
    rules.insert("text", inline::text());
    rules
}
