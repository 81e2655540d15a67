//! Treeviz formatter for document trees
//!
//! Treeviz is a visual, line based dump of the tree, one node per line:
//!
//! <prefix><connector> <icon> <type> <attrs> <marks or text>
//!
//! Attributes holding their default value are left out, as is an empty `markup`.
//! Text is quoted and truncated to 30 characters.
//!
//! Example:
//!
//! ⧉ doc
//! ├─ § heading level=2 markup="#"
//! │  └─ ◦ "Title"
//! └─ ¶ paragraph
//!    ├─ ◦ "Some "
//!    └─ ◦ "text" [em markup="*"]

use super::icons::get_icon;
use crate::error::FormatError;
use crate::format::Format;
use crate::tree::schema::{mark_type, node_type};
use crate::tree::{AttrValue, Attrs, Node};

const MAX_TEXT: usize = 30;

fn truncate(text: &str) -> String {
    let mut out: String = text.chars().take(MAX_TEXT).collect();
    if text.chars().count() > MAX_TEXT {
        out.push('…');
    }
    out
}

fn format_value(value: &AttrValue) -> String {
    match value {
        AttrValue::String(text) => format!("{:?}", truncate(text)),
        other => other.to_string(),
    }
}

/// `name=value` pairs for attributes that differ from the schema defaults
fn format_attrs(attrs: &Attrs, defaults: &Attrs) -> String {
    attrs
        .iter()
        .filter(|(name, value)| defaults.get(*name) != Some(*value))
        .map(|(name, value)| format!(" {name}={}", format_value(value)))
        .collect()
}

fn label(node: &Node) -> String {
    let mut out = node.kind.clone();
    let defaults = node_type(&node.kind)
        .map(|spec| spec.default_attrs())
        .unwrap_or_default();
    out.push_str(&format_attrs(&node.attrs, &defaults));
    if let Some(text) = &node.text {
        out = format!("{:?}", truncate(text));
    }
    if !node.marks.is_empty() {
        let marks: Vec<String> = node
            .marks
            .iter()
            .map(|mark| {
                let defaults = mark_type(&mark.kind)
                    .map(|spec| spec.default_attrs())
                    .unwrap_or_default();
                format!("{}{}", mark.kind, format_attrs(&mark.attrs, &defaults))
            })
            .collect();
        out.push_str(&format!(" [{}]", marks.join(", ")));
    }
    out
}

fn format_node(node: &Node, prefix: &str, is_last: bool, output: &mut String) {
    let connector = if is_last { "└─" } else { "├─" };
    output.push_str(&format!(
        "{prefix}{connector} {} {}\n",
        get_icon(&node.kind),
        label(node)
    ));
    let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "│  " });
    format_children(node, &child_prefix, output);
}

fn format_children(node: &Node, prefix: &str, output: &mut String) {
    let count = node.content.len();
    for (index, child) in node.content.iter().enumerate() {
        format_node(child, prefix, index + 1 == count, output);
    }
}

/// Render a tree as a treeviz string
pub fn to_treeviz_str(doc: &Node) -> String {
    let mut output = format!("{} {}\n", get_icon(&doc.kind), label(doc));
    format_children(doc, "", &mut output);
    output
}

pub struct TreevizFormat;

impl Format for TreevizFormat {
    fn name(&self) -> &str {
        "treeviz"
    }

    fn description(&self) -> &str {
        "Visual tree representation with indentation and Unicode icons"
    }

    fn file_extensions(&self) -> &[&str] {
        &["tree"]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize(&self, doc: &Node) -> Result<String, FormatError> {
        Ok(to_treeviz_str(doc))
    }
}
