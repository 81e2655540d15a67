//! The document tree and its construction from tokens

pub mod builder;
pub mod node;
pub mod schema;

pub use builder::{build, TreeBuilder};
pub use node::{AttrValue, Attrs, Mark, Node};
pub use schema::{MarkType, NodeType, MARKS, NODES};
