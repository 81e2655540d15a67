//! Format implementations
//!
//! This module contains the formats registered by default in
//! [`crate::registry::FormatRegistry`].

pub mod icons;
pub mod json;
pub mod markdown;
pub mod treeviz;

pub use json::JsonFormat;
pub use markdown::MarkdownFormat;
pub use treeviz::TreevizFormat;
