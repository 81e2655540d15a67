//! Markup-preserving Markdown ↔ document tree conversion
//!
//!     This crate converts Markdown in the Stack Exchange flavour into a structured document
//!     tree and back. The tree remembers how every construct was written (`**` or `<b>`,
//!     `[x][ref]` or `[x](url)`, a `<!-- language: -->` comment or a fence), so an unedited
//!     document serializes back to the text it came from, and an edited one changes only
//!     where it was edited.
//!
//! Pipeline
//!
//!     Parsing runs in three stages:
//!         1. parser: the `markdown-it` crate with the CommonMark plugins and the flavour
//!            rules (spoilers, tag links, language comments, stack snippets), its AST
//!            flattened into tokens (see ./parser).
//!         2. post passes: pure `Vec<Token> -> Vec<Token>` rewrites in a fixed order
//!            (see ./extensions/mod.rs). HTML merging and sanitizing, tight list marking,
//!            hard break markup, reference annotation and language folding live here.
//!         3. tree builder: a stack machine folding the token stream into [`Node`]s
//!            (see ./tree/builder.rs).
//!
//!     Serialization is table driven: one handler per node type and one delimiter spec per
//!     mark type (see ./serializer). Hosts may replace any entry; a type with no entry is a
//!     construction error, never silent output loss.
//!
//! Formats
//!
//!     The [`Format`] trait and [`FormatRegistry`] give the CLI a uniform way to read and
//!     write documents: `markdown`, `json` (the tree as serde JSON) and `treeviz`.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── options.rs              # ParseOptions, reference tables, link validation
//!     ├── token.rs
//!     ├── parser                  # markdown-it setup, flavour rules, AST → tokens
//!     ├── extensions              # flavour rules and post passes
//!     ├── tree                    # Node, Mark, schema, token → tree builder
//!     ├── serializer              # tree → Markdown
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     └── formats
//!
//! Testing
//!
//!     Unit tests sit next to the code. Integration tests live in tests/<concern>/ and are
//!     collected by tests/lib.rs.

pub mod error;
pub mod extensions;
pub mod format;
pub mod formats;
mod html_scan;
pub mod options;
pub mod parser;
pub mod registry;
pub mod serializer;
pub mod token;
pub mod tree;

pub use error::FormatError;
pub use format::Format;
pub use options::{LinkReference, ParseOptions, ReferenceTable, TagLinkOptions};
pub use registry::FormatRegistry;
pub use serializer::{MarkSpec, NodeHandler, Serializer};
pub use token::Token;
pub use tree::{AttrValue, Mark, Node};

use extensions::PassContext;
use markdown_it::common::utils::normalize_reference;
use parser::{Env, Parser};
use std::collections::HashMap;

/// Tokenize `text` and run the post passes
///
/// `references` seeds the definition table; labels are normalized here, and
/// definitions found in the document do not replace seeded ones.
pub fn parse_tokens(
    text: &str,
    options: &ParseOptions,
    references: Option<&ReferenceTable>,
) -> Vec<Token> {
    let mut md = Parser::new(options.clone());
    if let Some(references) = references {
        md.seed_references(
            references
                .iter()
                .map(|(label, reference)| (normalize_reference(label), reference.clone()))
                .collect(),
        );
    }
    let mut env = Env::default();
    let tokens = md.tokenize(text, &mut env);
    log::debug!("tokenized {} block tokens", tokens.len());
    let mut ctx = PassContext {
        md: &md,
        env: &env,
    };
    extensions::run_passes(tokens, &mut ctx)
}

/// Parse Markdown into a document tree
pub fn parse(text: &str, options: &ParseOptions, references: Option<&ReferenceTable>) -> Node {
    tree::build(&parse_tokens(text, options, references))
}

/// Serialize a document tree with the built-in handlers
pub fn serialize(doc: &Node) -> Result<String, FormatError> {
    Serializer::default().serialize(doc)
}

/// Serialize with host handlers replacing built-ins of the same type name
pub fn serialize_with(
    doc: &Node,
    node_overrides: HashMap<String, NodeHandler>,
    mark_overrides: HashMap<String, MarkSpec>,
) -> Result<String, FormatError> {
    Serializer::new(node_overrides, mark_overrides)?.serialize(doc)
}
