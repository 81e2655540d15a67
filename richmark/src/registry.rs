//! Named formats and conversion between them
//!
//! Every conversion goes through a document tree: the source format parses into a
//! [`Node`], the target format serializes it. Formats are kept in name order so
//! listings and extension lookups are deterministic.

use crate::error::FormatError;
use crate::format::Format;
use crate::formats::{JsonFormat, MarkdownFormat, TreevizFormat};
use crate::tree::Node;
use std::collections::BTreeMap;
use std::path::Path;

/// Formats keyed by name
///
/// ```ignore
/// let registry = FormatRegistry::default();
/// let json = registry.convert("*hi*", "markdown", "json")?;
/// ```
pub struct FormatRegistry {
    formats: BTreeMap<String, Box<dyn Format>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry {
            formats: BTreeMap::new(),
        }
    }

    /// Markdown with default options, pretty JSON and the tree view
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MarkdownFormat::default());
        registry.register(JsonFormat::default());
        registry.register(TreevizFormat);
        registry
    }

    /// Add `format`, replacing any format registered under the same name
    pub fn register<F: Format + 'static>(&mut self, format: F) {
        let name = format.name().to_string();
        if self.formats.insert(name.clone(), Box::new(format)).is_some() {
            log::debug!("format '{name}' replaced");
        }
    }

    pub fn get(&self, name: &str) -> Result<&dyn Format, FormatError> {
        self.formats
            .get(name)
            .map(|format| format.as_ref())
            .ok_or_else(|| FormatError::FormatNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Registered names in alphabetical order
    pub fn list_formats(&self) -> Vec<String> {
        self.formats.keys().cloned().collect()
    }

    /// Name of the first format (alphabetically) claiming the file's extension,
    /// compared without case
    pub fn detect_format_from_filename(&self, filename: &str) -> Option<String> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_ascii_lowercase();
        self.formats
            .values()
            .find(|format| format.file_extensions().contains(&extension.as_str()))
            .map(|format| format.name().to_string())
    }

    pub fn parse(&self, source: &str, format: &str) -> Result<Node, FormatError> {
        let reader = self.get(format)?;
        if !reader.supports_parsing() {
            return Err(FormatError::NotSupported(format!(
                "Format '{format}' does not support parsing"
            )));
        }
        reader.parse(source)
    }

    pub fn serialize(&self, doc: &Node, format: &str) -> Result<String, FormatError> {
        let writer = self.get(format)?;
        if !writer.supports_serialization() {
            return Err(FormatError::NotSupported(format!(
                "Format '{format}' does not support serialization"
            )));
        }
        writer.serialize(doc)
    }

    /// Parse with `from`, serialize with `to`
    ///
    /// Both names are checked before any parsing happens.
    pub fn convert(&self, source: &str, from: &str, to: &str) -> Result<String, FormatError> {
        self.get(from)?;
        self.get(to)?;
        let doc = self.parse(source, from)?;
        log::debug!("converting {from} -> {to}: {} top-level nodes", doc.content.len());
        self.serialize(&doc, to)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reads any text as one paragraph; cannot write
    struct PlainText;

    impl Format for PlainText {
        fn name(&self) -> &str {
            "plain"
        }
        fn description(&self) -> &str {
            "Unformatted text"
        }
        fn file_extensions(&self) -> &[&str] {
            &["txt", "md"]
        }
        fn supports_parsing(&self) -> bool {
            true
        }
        fn parse(&self, source: &str) -> Result<Node, FormatError> {
            Ok(Node::new("doc").with_content(vec![
                Node::new("paragraph").with_content(vec![Node::text(source)])
            ]))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = FormatRegistry::new();
        assert!(registry.list_formats().is_empty());
        registry.register(PlainText);
        assert!(registry.has("plain"));
        assert!(!registry.has("markdown"));
        assert_eq!(registry.get("plain").unwrap().description(), "Unformatted text");
    }

    #[test]
    fn test_unknown_format() {
        let registry = FormatRegistry::new();
        assert_eq!(
            registry.parse("x", "rtf").unwrap_err(),
            FormatError::FormatNotFound("rtf".to_string())
        );
    }

    #[test]
    fn test_write_only_and_read_only_formats() {
        let mut registry = FormatRegistry::default();
        registry.register(PlainText);
        let doc = Node::new("doc");
        assert!(matches!(
            registry.serialize(&doc, "plain"),
            Err(FormatError::NotSupported(_))
        ));
        assert!(matches!(
            registry.parse("x", "treeviz"),
            Err(FormatError::NotSupported(_))
        ));
    }

    #[test]
    fn test_detect_format_from_filename() {
        let registry = FormatRegistry::default();
        assert_eq!(registry.detect_format_from_filename("notes.md"), Some("markdown".to_string()));
        assert_eq!(registry.detect_format_from_filename("NOTES.MD"), Some("markdown".to_string()));
        assert_eq!(registry.detect_format_from_filename("tree.json"), Some("json".to_string()));
        assert_eq!(registry.detect_format_from_filename("doc.unknown"), None);
        assert_eq!(registry.detect_format_from_filename("no_extension"), None);
    }

    #[test]
    fn test_shared_extension_resolves_by_name_order() {
        let mut registry = FormatRegistry::default();
        registry.register(PlainText);
        // "markdown" sorts before "plain"
        assert_eq!(registry.detect_format_from_filename("a.md"), Some("markdown".to_string()));
    }

    #[test]
    fn test_convert() {
        let registry = FormatRegistry::default();
        let json = registry.convert("# Hi", "markdown", "json").unwrap();
        let doc = registry.parse(&json, "json").unwrap();
        assert_eq!(registry.serialize(&doc, "markdown").unwrap(), "# Hi");
    }

    #[test]
    fn test_convert_checks_target_first() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.convert("# Hi", "markdown", "pdf").unwrap_err(),
            FormatError::FormatNotFound("pdf".to_string())
        );
    }

    #[test]
    fn test_default_formats() {
        let registry = FormatRegistry::default();
        assert_eq!(registry.list_formats(), vec!["json", "markdown", "treeviz"]);
        assert!(!registry.get("treeviz").unwrap().supports_parsing());
    }
}
