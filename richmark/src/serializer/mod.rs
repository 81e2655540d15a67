//! Document tree to Markdown
//!
//! Table-driven: one handler per node type and one [`MarkSpec`] per mark type,
//! looked up by type name. Every handler consults the `markup` attribute first so
//! the output reuses the syntax the source was written in (`_` vs `*`, `<b>` vs
//! `**`, setext vs ATX headings, reference vs inline links). Empty markup selects
//! the canonical form.

pub mod marks;
pub mod nodes;
pub mod state;

pub use state::{ReferenceDefinition, SerializerState};

use crate::error::FormatError;
use crate::tree::{Mark, Node, MARKS, NODES};
use std::collections::HashMap;
use std::sync::Arc;

/// `(state, node, parent, index)`; writes `node` into the state
pub type NodeHandler =
    Arc<dyn Fn(&mut SerializerState<'_>, &Node, &Node, usize) -> Result<(), FormatError> + Send + Sync>;

/// Computes a mark delimiter from the mark and the node it is opened or closed at
pub type DelimFn = Arc<dyn Fn(&mut SerializerState<'_>, &Mark, &Node, usize) -> String + Send + Sync>;

#[derive(Clone)]
pub enum Delim {
    Static(String),
    Computed(DelimFn),
}

impl Delim {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&mut SerializerState<'_>, &Mark, &Node, usize) -> String + Send + Sync + 'static,
    {
        Delim::Computed(Arc::new(f))
    }

    pub fn render(&self, state: &mut SerializerState<'_>, mark: &Mark, parent: &Node, index: usize) -> String {
        match self {
            Delim::Static(value) => value.clone(),
            Delim::Computed(f) => f(state, mark, parent, index),
        }
    }
}

/// How one mark type is written
#[derive(Clone)]
pub struct MarkSpec {
    pub open: Delim,
    pub close: Delim,
    /// May be opened and closed in any order relative to other mixable marks
    pub mixable: bool,
    /// Leading and trailing whitespace is moved outside the delimiters
    pub expel_enclosing_whitespace: bool,
    /// Whether the marked text is escaped
    pub escape: bool,
}

impl MarkSpec {
    pub fn new(open: &str, close: &str) -> Self {
        MarkSpec {
            open: Delim::Static(open.to_string()),
            close: Delim::Static(close.to_string()),
            mixable: false,
            expel_enclosing_whitespace: false,
            escape: true,
        }
    }
}

pub struct Serializer {
    nodes: HashMap<String, NodeHandler>,
    marks: HashMap<String, MarkSpec>,
}

impl Serializer {
    /// The built-in handlers with `node_overrides` and `mark_overrides` taking
    /// precedence by type name
    ///
    /// Static mark overrides are made markup-aware; see [`marks::with_markup`].
    pub fn new(
        node_overrides: HashMap<String, NodeHandler>,
        mark_overrides: HashMap<String, MarkSpec>,
    ) -> Result<Self, FormatError> {
        let mut nodes = nodes::default_handlers();
        nodes.extend(node_overrides);
        let mut marks = marks::default_specs();
        for (name, spec) in mark_overrides {
            let spec = marks::with_markup(&name, spec);
            marks.insert(name, spec);
        }
        Self::from_parts(nodes, marks)
    }

    /// A serializer from complete handler tables, which must cover the schema
    pub fn from_parts(
        nodes: HashMap<String, NodeHandler>,
        marks: HashMap<String, MarkSpec>,
    ) -> Result<Self, FormatError> {
        if let Some(missing) = NODES.iter().find(|node| !nodes.contains_key(node.name)) {
            log::error!("serializer has no handler for node type '{}'", missing.name);
            return Err(FormatError::UnknownNodeType(missing.name.to_string()));
        }
        if let Some(missing) = MARKS.iter().find(|mark| !marks.contains_key(mark.name)) {
            log::error!("serializer has no handler for mark type '{}'", missing.name);
            return Err(FormatError::UnknownMarkType(missing.name.to_string()));
        }
        Ok(Serializer { nodes, marks })
    }

    pub fn serialize(&self, doc: &Node) -> Result<String, FormatError> {
        let mut state = SerializerState::new(&self.nodes, &self.marks);
        state.render(doc, doc, 0)?;
        Ok(state.finish())
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Serializer {
            nodes: nodes::default_handlers(),
            marks: marks::default_specs(),
        }
    }
}
