//! Shared helpers plus tests for the token stream to tree step

use richmark::{parse, serialize, Node, ParseOptions};

/// Default options with HTML passthrough switched on
pub fn html_options() -> ParseOptions {
    ParseOptions {
        html: true,
        ..ParseOptions::default()
    }
}

/// Kinds of the direct children of `node`
pub fn kinds(node: &Node) -> Vec<&str> {
    node.content.iter().map(|child| child.kind.as_str()).collect()
}

/// Nested node kinds, e.g. `doc(paragraph(text))`
pub fn shape(node: &Node) -> String {
    if node.content.is_empty() {
        return node.kind.clone();
    }
    let children: Vec<String> = node.content.iter().map(shape).collect();
    format!("{}({})", node.kind, children.join(" "))
}

/// Parse then serialize with the built-in handlers
pub fn round_trip(src: &str, options: &ParseOptions) -> String {
    serialize(&parse(src, options, None)).expect("document should serialize")
}

#[test]
fn test_nested_blocks_shape() {
    let doc = parse("> a\n\n- b\n- c", &ParseOptions::default(), None);
    assert_eq!(
        shape(&doc),
        "doc(blockquote(paragraph(text)) bullet_list(list_item(paragraph(text)) list_item(paragraph(text))))"
    );
}

#[test]
fn test_empty_document() {
    let doc = parse("", &ParseOptions::default(), None);
    assert_eq!(doc.kind, "doc");
    assert!(doc.content.is_empty());
    assert_eq!(round_trip("", &html_options()), "");
}

#[test]
fn test_adjacent_text_is_merged() {
    let doc = parse("a \\* b &amp; c", &ParseOptions::default(), None);
    assert_eq!(kinds(&doc.content[0]), vec!["text"]);
    assert_eq!(doc.content[0].text_content(), "a * b & c");
}
