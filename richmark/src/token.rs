//! Token stream representation
//!
//! Tokens are the intermediate form between Markdown text and the document tree. Block
//! tokens form a flat list where `nesting` marks opening (+1) and closing (-1) tokens;
//! `inline` tokens carry their inline tokens in `children`.
//!
//! `meta` is an open string map. Keys written by the post passes:
//!
//! - `html.raw`: original tag text of a token produced from inline HTML
//! - `html.name`: lowercase tag name of that tag, used for open/close pairing
//! - `reference.label`, `reference.type`, `reference.href`, `reference.title`:
//!   reference-link annotation (type is `full`, `collapsed` or `shortcut`)
//! - `language`: language carried by a folded language comment

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Token {
    /// Semantic kind, e.g. `paragraph_open`, `html_block`, `code_inline`
    #[serde(rename = "type")]
    pub kind: String,
    /// HTML tag name the token corresponds to
    pub tag: String,
    /// -1 closing, 0 self-contained, 1 opening
    pub nesting: i8,
    pub attrs: Vec<(String, String)>,
    /// Source line range `[start, end)`
    pub map: Option<[usize; 2]>,
    pub level: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Token>,
    pub content: String,
    /// Literal source syntax, e.g. `**`, `<strong>`, `>!`
    pub markup: String,
    pub info: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
    pub block: bool,
    pub hidden: bool,
}

impl Token {
    pub fn new(kind: impl Into<String>, tag: impl Into<String>, nesting: i8) -> Self {
        Token {
            kind: kind.into(),
            tag: tag.into(),
            nesting,
            ..Default::default()
        }
    }

    /// Plain text token
    pub fn text(content: impl Into<String>) -> Self {
        let mut token = Token::new("text", "", 0);
        token.content = content.into();
        token
    }

    pub fn attr_get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn attr_set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn meta_get(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    pub fn meta_set(&mut self, key: &str, value: impl Into<String>) {
        self.meta.insert(key.to_string(), value.into());
    }
}
