//! Shared configuration loader for the richmark toolchain.
//!
//! `defaults/richmark.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`RichmarkConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use richmark::{LinkReference, ParseOptions, ReferenceTable, TagLinkOptions};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/richmark.default.toml");

/// Top-level configuration consumed by richmark applications.
#[derive(Debug, Clone, Deserialize)]
pub struct RichmarkConfig {
    pub parser: ParserConfig,
    pub inspect: InspectConfig,
    /// Host reference definitions, label → destination
    #[serde(default)]
    pub references: BTreeMap<String, String>,
}

/// Mirrors the flags of [`ParseOptions`].
#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    pub html: bool,
    pub tables: bool,
    pub extra_emphasis: bool,
    pub tag_links: bool,
    #[serde(default)]
    pub known_tags: Vec<String>,
    pub linkify: bool,
}

impl From<&ParserConfig> for ParseOptions {
    fn from(config: &ParserConfig) -> Self {
        let tag_links = config.tag_links.then(|| {
            if config.known_tags.is_empty() {
                TagLinkOptions::default()
            } else {
                let known: HashSet<String> = config.known_tags.iter().cloned().collect();
                TagLinkOptions::with_validator(move |name, _is_meta| known.contains(name))
            }
        });
        ParseOptions {
            html: config.html,
            tables: config.tables,
            extra_emphasis: config.extra_emphasis,
            tag_links,
            link_validation: None,
            linkify: config.linkify,
        }
    }
}

impl From<ParserConfig> for ParseOptions {
    fn from(config: ParserConfig) -> Self {
        ParseOptions::from(&config)
    }
}

/// Controls inspect output.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectConfig {
    pub pretty: bool,
}

impl RichmarkConfig {
    /// The configured reference definitions as a parser reference table
    pub fn reference_table(&self) -> ReferenceTable {
        self.references
            .iter()
            .map(|(label, href)| (label.clone(), LinkReference::new(href.as_str(), None)))
            .collect()
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<RichmarkConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<RichmarkConfig, ConfigError> {
    Loader::new().build()
}
