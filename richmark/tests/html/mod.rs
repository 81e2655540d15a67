//! HTML passthrough tests
//!
//! Allow-list sanitization and split-block merging, observed through the tree.

mod sanitize;
