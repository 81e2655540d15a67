//! Node and mark types of the document tree
//!
//! Every type except `text` carries a `markup` attribute, empty by default. Empty
//! markup means the serializer picks the canonical syntax.

use super::node::{AttrValue, Attrs, Mark, Node};

/// Default value of a declared attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDefault {
    Null,
    Bool(bool),
    Number(i64),
    Str(&'static str),
}

impl AttrDefault {
    fn value(self) -> AttrValue {
        match self {
            AttrDefault::Null => AttrValue::Null,
            AttrDefault::Bool(value) => AttrValue::Bool(value),
            AttrDefault::Number(value) => AttrValue::Number(value),
            AttrDefault::Str(value) => AttrValue::String(value.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct NodeType {
    pub name: &'static str,
    pub inline: bool,
    /// Holds inline content (text and inline nodes) rather than blocks
    pub textblock: bool,
    pub attrs: &'static [(&'static str, AttrDefault)],
}

#[derive(Debug)]
pub struct MarkType {
    pub name: &'static str,
    pub attrs: &'static [(&'static str, AttrDefault)],
}

impl NodeType {
    /// Every declared attribute at its default value
    pub fn default_attrs(&self) -> Attrs {
        with_defaults(self.attrs, Attrs::new())
    }
}

impl MarkType {
    pub fn default_attrs(&self) -> Attrs {
        with_defaults(self.attrs, Attrs::new())
    }
}

const MARKUP: (&str, AttrDefault) = ("markup", AttrDefault::Str(""));
const REFERENCE: [(&str, AttrDefault); 2] = [
    ("referenceLabel", AttrDefault::Null),
    ("referenceType", AttrDefault::Null),
];

const fn block(name: &'static str, attrs: &'static [(&'static str, AttrDefault)]) -> NodeType {
    NodeType {
        name,
        inline: false,
        textblock: false,
        attrs,
    }
}

const fn textblock(name: &'static str, attrs: &'static [(&'static str, AttrDefault)]) -> NodeType {
    NodeType {
        name,
        inline: false,
        textblock: true,
        attrs,
    }
}

const fn inline(name: &'static str, attrs: &'static [(&'static str, AttrDefault)]) -> NodeType {
    NodeType {
        name,
        inline: true,
        textblock: false,
        attrs,
    }
}

pub static NODES: &[NodeType] = &[
    block("doc", &[MARKUP]),
    textblock("paragraph", &[MARKUP]),
    block("blockquote", &[MARKUP]),
    block("spoiler", &[MARKUP]),
    textblock("heading", &[("level", AttrDefault::Number(1)), MARKUP]),
    textblock("code_block", &[("params", AttrDefault::Str("")), MARKUP]),
    block(
        "ordered_list",
        &[("order", AttrDefault::Number(1)), ("tight", AttrDefault::Bool(false)), MARKUP],
    ),
    block("bullet_list", &[("tight", AttrDefault::Bool(false)), MARKUP]),
    block("list_item", &[MARKUP]),
    block("horizontal_rule", &[MARKUP]),
    block("html_block", &[("content", AttrDefault::Str("")), MARKUP]),
    block(
        "html_block_container",
        &[("contentOpen", AttrDefault::Str("")), ("contentClose", AttrDefault::Str("")), MARKUP],
    ),
    block("pre", &[MARKUP]),
    block("table", &[MARKUP]),
    block("table_head", &[MARKUP]),
    block("table_body", &[MARKUP]),
    block("table_row", &[MARKUP]),
    textblock("table_cell", &[("style", AttrDefault::Null), MARKUP]),
    textblock("table_header", &[("style", AttrDefault::Null), MARKUP]),
    block(
        "stack_snippet",
        &[
            ("hide", AttrDefault::Null),
            ("console", AttrDefault::Null),
            ("babel", AttrDefault::Null),
            ("babelPresetReact", AttrDefault::Null),
            ("babelPresetTS", AttrDefault::Null),
            MARKUP,
        ],
    ),
    textblock("stack_snippet_lang", &[("language", AttrDefault::Str("")), MARKUP]),
    inline("text", &[]),
    inline(
        "image",
        &[
            ("src", AttrDefault::Str("")),
            ("alt", AttrDefault::Null),
            ("title", AttrDefault::Null),
            ("width", AttrDefault::Null),
            ("height", AttrDefault::Null),
            REFERENCE[0],
            REFERENCE[1],
            MARKUP,
        ],
    ),
    inline("hard_break", &[MARKUP]),
    inline("softbreak", &[MARKUP]),
    inline("html_inline", &[("content", AttrDefault::Str("")), MARKUP]),
    inline(
        "tagLink",
        &[("tagName", AttrDefault::Str("")), ("tagType", AttrDefault::Str("tag")), MARKUP],
    ),
];

/// In rank order: a node's marks are always sorted this way
pub static MARKS: &[MarkType] = &[
    MarkType {
        name: "link",
        attrs: &[
            ("href", AttrDefault::Str("")),
            ("title", AttrDefault::Null),
            REFERENCE[0],
            REFERENCE[1],
            MARKUP,
        ],
    },
    MarkType { name: "em", attrs: &[MARKUP] },
    MarkType { name: "strong", attrs: &[MARKUP] },
    MarkType { name: "strike", attrs: &[MARKUP] },
    MarkType { name: "kbd", attrs: &[MARKUP] },
    MarkType { name: "sup", attrs: &[MARKUP] },
    MarkType { name: "sub", attrs: &[MARKUP] },
    MarkType { name: "code", attrs: &[MARKUP] },
];

pub fn node_type(name: &str) -> Option<&'static NodeType> {
    NODES.iter().find(|node| node.name == name)
}

pub fn mark_type(name: &str) -> Option<&'static MarkType> {
    MARKS.iter().find(|mark| mark.name == name)
}

/// Position of a mark type in the canonical mark order, unknown types last
pub fn mark_rank(name: &str) -> usize {
    MARKS
        .iter()
        .position(|mark| mark.name == name)
        .unwrap_or(MARKS.len())
}

fn with_defaults(declared: &[(&str, AttrDefault)], mut attrs: Attrs) -> Attrs {
    for (name, default) in declared {
        attrs
            .entry((*name).to_string())
            .or_insert_with(|| default.value());
    }
    attrs
}

/// Build a node, filling in declared attributes the caller left out
pub fn create_node(kind: &str, attrs: Attrs, content: Vec<Node>) -> Node {
    let attrs = match node_type(kind) {
        Some(node_type) => with_defaults(node_type.attrs, attrs),
        None => attrs,
    };
    Node {
        kind: kind.to_string(),
        attrs,
        content,
        text: None,
        marks: Vec::new(),
    }
}

pub fn create_mark(kind: &str, attrs: Attrs) -> Mark {
    let attrs = match mark_type(kind) {
        Some(mark_type) => with_defaults(mark_type.attrs, attrs),
        None => attrs,
    };
    Mark {
        kind: kind.to_string(),
        attrs,
    }
}

/// Add `mark` to a rank-ordered set, replacing a mark of the same type
pub fn add_mark(marks: &[Mark], mark: Mark) -> Vec<Mark> {
    let mut result: Vec<Mark> = marks
        .iter()
        .filter(|existing| existing.kind != mark.kind)
        .cloned()
        .collect();
    let rank = mark_rank(&mark.kind);
    let position = result
        .iter()
        .position(|existing| mark_rank(&existing.kind) > rank)
        .unwrap_or(result.len());
    result.insert(position, mark);
    result
}
