//! The compiled form of a template.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Block overrides supplied by a `{{<parent}}` tag, keyed by block name.
pub type BlockMap = HashMap<String, Rc<[Node]>>;

/// Tag delimiters, `{{` and `}}` unless changed with `{{=<% %>=}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: "{{".to_string(),
            close: "}}".to_string(),
        }
    }
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.open == "{{" && self.close == "}}"
    }

    /// The set-delimiter tag, written in default delimiters, that switches to these.
    pub fn switch_tag(&self) -> String {
        format!("{{{{={} {}=}}}}", self.open, self.close)
    }
}

/// A variable or section name as written in a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Name {
    /// `.`, the current frame.
    Implicit,
    /// A single key, resolved with `find`.
    Key(String),
    /// A dotted path, resolved with `find_dot`.
    Dotted(String),
}

impl Name {
    pub(crate) fn parse(raw: &str) -> Self {
        if raw == "." {
            Name::Implicit
        } else if raw.contains('.') {
            Name::Dotted(raw.to_string())
        } else {
            Name::Key(raw.to_string())
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Implicit => f.write_str("."),
            Name::Key(name) | Name::Dotted(name) => f.write_str(name),
        }
    }
}

/// One step of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal template text.
    Text(String),

    /// `{{name}}` (escaped) or `{{{name}}}` / `{{&name}}` (raw).
    Variable { name: Name, escape: bool },

    /// `{{#name}}...{{/name}}` or, when `inverted`, `{{^name}}...{{/name}}`.
    Section {
        name: Name,
        inverted: bool,
        children: Vec<Node>,
        /// Unrendered text between the opening and closing tags, handed to lambdas.
        source: String,
        /// Delimiters in effect at the opening tag.
        delimiters: Delimiters,
    },

    /// `{{>name}}`. `indent` is the leading whitespace of a standalone tag.
    Partial { name: String, indent: Option<String> },

    /// `{{<name}}...{{/name}}` with the block overrides found inside it.
    Parent {
        name: String,
        indent: Option<String>,
        blocks: Rc<BlockMap>,
    },

    /// `{{$name}}default{{/name}}` outside a parent tag.
    Block { name: String, children: Rc<[Node]> },
}
