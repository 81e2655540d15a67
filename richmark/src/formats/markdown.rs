//! Markdown format implementation
//!
//! Bidirectional conversion between Markdown and the document tree, through
//! [`crate::parse`] and the built-in [`Serializer`].
//!
//! # Element Mapping Table
//!
//! | Markdown                          | Node / mark                | `markup` kept          |
//! |-----------------------------------|----------------------------|------------------------|
//! | `# x`, `x\n===`                   | heading                    | `#`, `=`, `-`, `<h1>`  |
//! | `> x`, `>! x`                     | blockquote, spoiler        | `>`, `>!`              |
//! | fence, indented code              | code_block                 | fence string or empty  |
//! | `<!-- language: lang-x -->`       | code_block `params`        |                        |
//! | `- x`, `1. x`                     | bullet_list, ordered_list  | marker, `.` or `)`     |
//! | `*x*`, `**x**`, `<em>`, `<b>`     | em, strong                 | delimiter or tag       |
//! | `[x](u)`, `[x][r]`, `<u>`, bare   | link                       | ``, `reference`, `autolink`, `linkify` |
//! | `[tag:x]`                         | tagLink                    |                        |
//!
//! # Lossy Conversions
//!
//! - Blank line runs collapse to a single blank line.
//! - Reference definitions are rewritten as a sorted trailer after the document.
//! - Unknown HTML is stripped (blocks) or escaped (inline).

use crate::error::FormatError;
use crate::format::Format;
use crate::options::{ParseOptions, ReferenceTable};
use crate::serializer::Serializer;
use crate::tree::Node;

#[derive(Debug, Clone, Default)]
pub struct MarkdownFormat {
    pub options: ParseOptions,
    /// Definitions known to the host, merged with the document's own
    pub references: ReferenceTable,
}

impl MarkdownFormat {
    pub fn new(options: ParseOptions) -> Self {
        MarkdownFormat {
            options,
            references: ReferenceTable::new(),
        }
    }

    pub fn with_references(mut self, references: ReferenceTable) -> Self {
        self.references = references;
        self
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "Markdown with markup-preserving round trips"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Node, FormatError> {
        let references = (!self.references.is_empty()).then_some(&self.references);
        Ok(crate::parse(source, &self.options, references))
    }

    fn serialize(&self, doc: &Node) -> Result<String, FormatError> {
        Serializer::default().serialize(doc)
    }
}
