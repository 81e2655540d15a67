//! Error types for conversion operations

use std::fmt;

/// Errors that can occur while converting between Markdown and document trees
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// Format not found in registry
    FormatNotFound(String),
    /// Error during parsing
    ParseError(String),
    /// Error during serialization
    SerializationError(String),
    /// Format does not support the requested operation
    NotSupported(String),
    /// A node type has no serializer handler
    UnknownNodeType(String),
    /// A mark type has no serializer handler
    UnknownMarkType(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::FormatNotFound(name) => write!(f, "Format '{name}' not found"),
            FormatError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            FormatError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            FormatError::NotSupported(msg) => write!(f, "Operation not supported: {msg}"),
            FormatError::UnknownNodeType(name) => {
                write!(f, "No serializer registered for node type '{name}'")
            }
            FormatError::UnknownMarkType(name) => {
                write!(f, "No serializer registered for mark type '{name}'")
            }
        }
    }
}

impl std::error::Error for FormatError {}
