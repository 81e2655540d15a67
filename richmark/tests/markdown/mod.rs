//! Markdown tests
//!
//! Parsing Markdown into document trees and serializing them back.

mod import;
mod roundtrip;
mod scenarios;
