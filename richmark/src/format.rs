//! The [`Format`] trait: one text representation of a document tree
//!
//! A format reads text into a [`Node`] tree, writes a tree back to text, or both.
//! Unsupported directions fall back to a `NotSupported` error.

use crate::error::FormatError;
use crate::tree::Node;

/// A named text representation of document trees
///
/// ```ignore
/// struct Outline;
///
/// impl Format for Outline {
///     fn name(&self) -> &str {
///         "outline"
///     }
///
///     fn supports_serialization(&self) -> bool {
///         true
///     }
///
///     fn serialize(&self, doc: &Node) -> Result<String, FormatError> {
///         Ok(doc.content.iter().map(|n| n.kind.clone()).collect::<Vec<_>>().join("\n"))
///     }
/// }
/// ```
pub trait Format: Send + Sync {
    /// Registry key, e.g. `markdown`
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Extensions without the dot, matched when the CLI guesses `--from`
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    fn supports_parsing(&self) -> bool {
        false
    }

    fn supports_serialization(&self) -> bool {
        false
    }

    fn parse(&self, _source: &str) -> Result<Node, FormatError> {
        Err(unsupported(self.name(), "parsing"))
    }

    fn serialize(&self, _doc: &Node) -> Result<String, FormatError> {
        Err(unsupported(self.name(), "serialization"))
    }
}

fn unsupported(name: &str, direction: &str) -> FormatError {
    FormatError::NotSupported(format!("Format '{name}' does not support {direction}"))
}
