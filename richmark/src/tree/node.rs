//! Document tree values
//!
//! A [`Node`] is either a text leaf (`kind == "text"`, `text` set) or an element with
//! typed attributes and child nodes. Inline decorations are [`Mark`]s on the text
//! (and inline leaf) nodes they cover. Trees are plain values: edits build new nodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A node or mark attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(i64),
    String(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "null"),
            AttrValue::Bool(value) => write!(f, "{value}"),
            AttrValue::Number(value) => write!(f, "{value}"),
            AttrValue::String(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Number(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttrValue::Null, Into::into)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;

fn attr_str<'a>(attrs: &'a Attrs, name: &str) -> &'a str {
    attrs.get(name).and_then(AttrValue::as_str).unwrap_or("")
}

/// An inline decoration such as emphasis or a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    /// A mark with the schema's default attributes
    pub fn new(kind: &str) -> Self {
        super::schema::create_mark(kind, Attrs::new())
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// String attribute, `""` when absent or not a string
    pub fn attr_str(&self, name: &str) -> &str {
        attr_str(&self.attrs, name)
    }

    pub fn markup(&self) -> &str {
        self.attr_str("markup")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    /// An element with the schema's default attributes and no content
    pub fn new(kind: &str) -> Self {
        super::schema::create_node(kind, Attrs::new(), Vec::new())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node {
            kind: "text".to_string(),
            attrs: Attrs::new(),
            content: Vec::new(),
            text: Some(text.into()),
            marks: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = content;
        self
    }

    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = marks;
        self
    }

    /// Copy of a text node with different text and the same marks
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Node {
            text: Some(text.into()),
            ..self.clone()
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// String attribute, `""` when absent or not a string
    pub fn attr_str(&self, name: &str) -> &str {
        attr_str(&self.attrs, name)
    }

    pub fn markup(&self) -> &str {
        self.attr_str("markup")
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.iter().map(Node::text_content).collect(),
        }
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }

    pub fn mark_of_kind(&self, kind: &str) -> Option<&Mark> {
        self.marks.iter().find(|mark| mark.kind == kind)
    }
}
