use crate::common::round_trip;
use insta::assert_snapshot;
use richmark::serializer::SerializerState;
use richmark::{
    parse, serialize, serialize_with, FormatError, Mark, MarkSpec, Node, NodeHandler, ParseOptions,
    Serializer,
};
use std::collections::HashMap;
use std::sync::Arc;

fn paragraph(content: Vec<Node>) -> Node {
    Node::new("doc").with_content(vec![Node::new("paragraph").with_content(content)])
}

#[test]
fn test_kitchensink_markdown() {
    let src = r#"# Title

Some **strong**, _em_ and `code` with a [link](/u).

* one
* two

1. first
2. second

> quoted

```rust
fn main() {}
```

---

![alt](/i.png "Pic")"#;
    assert_snapshot!(round_trip(src, &ParseOptions::default()), @r#"
    # Title

    Some **strong**, _em_ and `code` with a [link](/u).

    * one
    * two

    1. first
    2. second

    > quoted

    ```rust
    fn main() {}
    ```

    ---

    ![alt](/i.png "Pic")
    "#);
}

fn labelled_paragraph(
    state: &mut SerializerState<'_>,
    node: &Node,
    _parent: &Node,
    _index: usize,
) -> Result<(), FormatError> {
    state.write("P: ");
    state.render_inline(node)?;
    state.close_block(node);
    Ok(())
}

#[test]
fn test_node_override_replaces_builtin() {
    let handler: NodeHandler = Arc::new(labelled_paragraph);
    let overrides = HashMap::from([("paragraph".to_string(), handler)]);
    let doc = parse("a\n\nb", &ParseOptions::default(), None);
    assert_eq!(serialize_with(&doc, overrides, HashMap::new()).unwrap(), "P: a\n\nP: b");
}

#[test]
fn test_mark_override_honours_markup() {
    let overrides = HashMap::from([("em".to_string(), MarkSpec::new("<<", ">>"))]);
    let serializer = Serializer::new(HashMap::new(), overrides).unwrap();

    let built = paragraph(vec![Node::text("a").with_marks(vec![Mark::new("em")])]);
    assert_eq!(serializer.serialize(&built).unwrap(), "<<a>>");

    let parsed = parse("_a_", &ParseOptions::default(), None);
    assert_eq!(serializer.serialize(&parsed).unwrap(), "_a_");
}

#[test]
fn test_unknown_node_type_is_an_error() {
    let doc = Node::new("doc").with_content(vec![Node::new("widget")]);
    assert_eq!(serialize(&doc), Err(FormatError::UnknownNodeType("widget".to_string())));
}

#[test]
fn test_unknown_mark_type_is_an_error() {
    let doc = paragraph(vec![Node::text("a").with_marks(vec![Mark::new("blink")])]);
    assert_eq!(serialize(&doc), Err(FormatError::UnknownMarkType("blink".to_string())));
}

#[test]
fn test_incomplete_handler_table_is_rejected() {
    let result = Serializer::from_parts(HashMap::new(), HashMap::new());
    assert!(matches!(result, Err(FormatError::UnknownNodeType(_))));
}

#[test]
fn test_malformed_table_is_an_error() {
    let doc = Node::new("doc").with_content(vec![Node::new("table").with_content(vec![
        Node::new("paragraph").with_content(vec![Node::text("x")]),
    ])]);
    assert!(matches!(serialize(&doc), Err(FormatError::SerializationError(_))));
}

#[test]
fn test_built_tree_serializes() {
    let doc = Node::new("doc").with_content(vec![
        Node::new("heading")
            .with_attr("level", 1i64)
            .with_content(vec![Node::text("Notes")]),
        Node::new("bullet_list").with_content(vec![
            Node::new("list_item").with_content(vec![
                Node::new("paragraph").with_content(vec![Node::text("first")]),
            ]),
            Node::new("list_item").with_content(vec![
                Node::new("paragraph").with_content(vec![Node::text("second")]),
            ]),
        ]),
    ]);
    assert_snapshot!(serialize(&doc).unwrap(), @r"
    # Notes

    - first

    - second
    ");
}

#[test]
fn test_special_characters_are_escaped() {
    let doc = paragraph(vec![Node::text("1. not *a* list")]);
    assert_snapshot!(serialize(&doc).unwrap(), @r"1\. not \*a\* list");
}
