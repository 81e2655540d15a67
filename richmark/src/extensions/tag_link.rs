//! `[tag:name]` and `[meta-tag:name]` links
//!
//! Runs ahead of the link rule so a tag is never read as a shortcut reference.
//! Names may not be empty and may not contain whitespace or brackets; the host's
//! validator gets the final say.

use crate::parser::TagLinkSettings;
use markdown_it::parser::inline::{InlineRule, InlineState, Text};
use markdown_it::{Node, NodeValue};

const TAG_PREFIX: &str = "[tag:";
const META_TAG_PREFIX: &str = "[meta-tag:";

/// A `[tag:name]` or `[meta-tag:name]` link
#[derive(Debug)]
pub struct TagLink {
    pub name: String,
    pub is_meta: bool,
}

impl NodeValue for TagLink {}

/// Byte length of the tag prefix at the start of `src` and whether it is a meta tag
fn prefix_of(src: &str) -> Option<(usize, bool)> {
    if src.starts_with(TAG_PREFIX) {
        Some((TAG_PREFIX.len(), false))
    } else if src.starts_with(META_TAG_PREFIX) {
        Some((META_TAG_PREFIX.len(), true))
    } else {
        None
    }
}

pub struct TagLinkScanner;

impl InlineRule for TagLinkScanner {
    const MARKER: char = '[';

    fn run(state: &mut InlineState) -> Option<(Node, usize)> {
        let options = &state.md.ext.get::<TagLinkSettings>()?.0;
        let rest = &state.src[state.pos..state.pos_max];
        let (prefix_len, is_meta) = prefix_of(rest)?;

        let name_len = rest[prefix_len..].find(']')?;
        let name = &rest[prefix_len..prefix_len + name_len];
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '[') {
            return None;
        }
        if !options.accepts(name, is_meta) {
            log::debug!("tag link rejected by validator: {name}");
            return None;
        }

        let mut node = Node::new(TagLink {
            name: name.to_string(),
            is_meta,
        });
        node.children.push(Node::new(Text {
            content: name.to_string(),
        }));
        Some((node, prefix_len + name_len + 1))
    }
}
