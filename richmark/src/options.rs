//! Parser feature flags and host-supplied callbacks

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Accepts or rejects a candidate link destination
pub type LinkValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Accepts or rejects a tag name; the flag is `true` for `[meta-tag:...]`
pub type TagValidator = Arc<dyn Fn(&str, bool) -> bool + Send + Sync>;

/// Options for the `[tag:name]` / `[meta-tag:name]` grammar
#[derive(Clone, Default)]
pub struct TagLinkOptions {
    /// When absent every syntactically valid tag name is accepted
    pub validate: Option<TagValidator>,
}

impl TagLinkOptions {
    pub fn with_validator<F>(validate: F) -> Self
    where
        F: Fn(&str, bool) -> bool + Send + Sync + 'static,
    {
        TagLinkOptions {
            validate: Some(Arc::new(validate)),
        }
    }

    pub(crate) fn accepts(&self, name: &str, is_meta: bool) -> bool {
        match &self.validate {
            Some(validate) => validate(name, is_meta),
            None => true,
        }
    }
}

impl fmt::Debug for TagLinkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagLinkOptions")
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Feature flags for [`crate::parse`]
///
/// HTML passthrough, tables, strikethrough and tag links are off unless enabled.
/// Bare URL detection (`http`, `https` and `ftp` only) is on by default.
#[derive(Clone)]
pub struct ParseOptions {
    pub html: bool,
    pub tables: bool,
    /// Enables `~~strikethrough~~`
    pub extra_emphasis: bool,
    /// `Some` enables the tag link grammar
    pub tag_links: Option<TagLinkOptions>,
    /// Replaces the default link destination check
    pub link_validation: Option<LinkValidator>,
    pub linkify: bool,
}

impl ParseOptions {
    /// Every extension enabled, with default callbacks
    pub fn all() -> Self {
        ParseOptions {
            html: true,
            tables: true,
            extra_emphasis: true,
            tag_links: Some(TagLinkOptions::default()),
            link_validation: None,
            linkify: true,
        }
    }

    pub fn with_link_validation<F>(mut self, validate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.link_validation = Some(Arc::new(validate));
        self
    }

    pub(crate) fn validate_link(&self, href: &str) -> bool {
        match &self.link_validation {
            Some(validate) => validate(href),
            None => default_link_validation(href),
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            html: false,
            tables: false,
            extra_emphasis: false,
            tag_links: None,
            link_validation: None,
            linkify: true,
        }
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("html", &self.html)
            .field("tables", &self.tables)
            .field("extra_emphasis", &self.extra_emphasis)
            .field("tag_links", &self.tag_links)
            .field("link_validation", &self.link_validation.is_some())
            .field("linkify", &self.linkify)
            .finish()
    }
}

/// Rejects script-capable schemes; `data:` is allowed for raster images only
pub fn default_link_validation(href: &str) -> bool {
    let trimmed = href.trim();
    let Ok(parsed) = url::Url::parse(trimmed) else {
        // relative or otherwise scheme-less destinations
        return true;
    };
    match parsed.scheme() {
        "javascript" | "vbscript" | "file" => false,
        "data" => {
            let lower = trimmed.to_ascii_lowercase();
            ["data:image/gif;", "data:image/png;", "data:image/jpeg;", "data:image/webp;"]
                .iter()
                .any(|prefix| lower.starts_with(prefix))
        }
        _ => true,
    }
}

/// A resolved link reference definition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkReference {
    pub href: String,
    pub title: Option<String>,
}

impl LinkReference {
    pub fn new(href: impl Into<String>, title: Option<&str>) -> Self {
        LinkReference {
            href: href.into(),
            title: title.map(str::to_string),
        }
    }
}

/// Normalized label → definition
pub type ReferenceTable = BTreeMap<String, LinkReference>;
