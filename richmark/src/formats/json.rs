//! The document tree as JSON
//!
//! Nodes are written as `{"type", "attrs", "content", "text", "marks"}` objects with
//! empty fields omitted, the same shape `serde` reads back.

use crate::error::FormatError;
use crate::format::Format;
use crate::tree::Node;

#[derive(Debug, Clone)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl Default for JsonFormat {
    fn default() -> Self {
        JsonFormat { pretty: true }
    }
}

impl JsonFormat {
    pub fn new(pretty: bool) -> Self {
        JsonFormat { pretty }
    }
}

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document tree as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Node, FormatError> {
        serde_json::from_str(source).map_err(|err| FormatError::ParseError(err.to_string()))
    }

    fn serialize(&self, doc: &Node) -> Result<String, FormatError> {
        let result = if self.pretty {
            serde_json::to_string_pretty(doc)
        } else {
            serde_json::to_string(doc)
        };
        result.map_err(|err| FormatError::SerializationError(err.to_string()))
    }
}
