//! Inspect transforms
//!
//! Each transform shows one processing stage of a Markdown document:
//!
//! - `tokens`: the token stream after the post passes, as JSON
//! - `tree-json`: the document tree as JSON
//! - `treeviz`: the document tree with Unicode icons (default)

use richmark::formats::treeviz::to_treeviz_str;
use richmark::{parse, parse_tokens, ParseOptions, ReferenceTable};

/// All available inspect transforms
pub const AVAILABLE_TRANSFORMS: &[&str] = &["tokens", "tree-json", "treeviz"];

pub const DEFAULT_TRANSFORM: &str = "treeviz";

/// What a transform needs besides the source text
pub struct InspectParams<'a> {
    pub options: &'a ParseOptions,
    pub references: Option<&'a ReferenceTable>,
    pub pretty: bool,
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, String> {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result
        .map(|json| json + "\n")
        .map_err(|err| format!("JSON serialization failed: {err}"))
}

/// Run `transform` over `source`
pub fn execute_transform(
    source: &str,
    transform: &str,
    params: &InspectParams<'_>,
) -> Result<String, String> {
    match transform {
        "tokens" => {
            let tokens = parse_tokens(source, params.options, params.references);
            to_json(&tokens, params.pretty)
        }
        "tree-json" => {
            let doc = parse(source, params.options, params.references);
            to_json(&doc, params.pretty)
        }
        "treeviz" => {
            let doc = parse(source, params.options, params.references);
            Ok(to_treeviz_str(&doc))
        }
        other => Err(format!(
            "Unknown transform '{other}'. Available: {}",
            AVAILABLE_TRANSFORMS.join(", ")
        )),
    }
}
