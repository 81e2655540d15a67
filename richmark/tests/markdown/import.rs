//! Import tests: Markdown → document tree
//!
//! These check node kinds and the attributes each block and mark carries,
//! including the `markup` that records how the source spelled it.

use crate::common::{kinds, shape};
use richmark::{parse, AttrValue, LinkReference, ParseOptions, ReferenceTable};

#[test]
fn test_headings_keep_their_form() {
    let doc = parse("### Atx\n\nSetext\n===", &ParseOptions::default(), None);
    assert_eq!(doc.content[0].attr("level"), Some(&AttrValue::Number(3)));
    assert_eq!(doc.content[0].markup(), "###");
    assert_eq!(doc.content[1].attr("level"), Some(&AttrValue::Number(1)));
    assert_eq!(doc.content[1].markup(), "===");
}

#[test]
fn test_list_attributes() {
    let doc = parse("3) a\n4) b\n\n- c\n\n- d", &ParseOptions::default(), None);
    let ordered = &doc.content[0];
    assert_eq!(ordered.kind, "ordered_list");
    assert_eq!(ordered.attr("order"), Some(&AttrValue::Number(3)));
    assert_eq!(ordered.attr("tight"), Some(&AttrValue::Bool(true)));
    assert_eq!(ordered.markup(), ")");

    let bullets = &doc.content[1];
    assert_eq!(bullets.kind, "bullet_list");
    assert_eq!(bullets.attr("tight"), Some(&AttrValue::Bool(false)));
    assert_eq!(bullets.markup(), "-");
}

#[test]
fn test_fenced_code() {
    let doc = parse("~~~rust\nfn main() {}\n~~~", &ParseOptions::default(), None);
    let code = &doc.content[0];
    assert_eq!(code.kind, "code_block");
    assert_eq!(code.attr_str("params"), "rust");
    assert_eq!(code.markup(), "~~~");
    assert_eq!(code.text_content(), "fn main() {}");
}

#[test]
fn test_inline_link_and_image() {
    let doc = parse("[a](/x \"t\") ![pic](/i.png)", &ParseOptions::default(), None);
    let paragraph = &doc.content[0];
    let link = paragraph.content[0].mark_of_kind("link").unwrap();
    assert_eq!(link.attr_str("href"), "/x");
    assert_eq!(link.attr_str("title"), "t");
    assert!(link.attr("referenceType").is_some_and(AttrValue::is_null));

    let image = paragraph.content.iter().find(|node| node.kind == "image").unwrap();
    assert_eq!(image.attr_str("src"), "/i.png");
    assert_eq!(image.attr_str("alt"), "pic");
}

#[test]
fn test_reference_links_are_annotated() {
    let src = "[text][one] [two][] [three]\n\n[one]: /1\n[two]: /2\n[three]: /3";
    let doc = parse(src, &ParseOptions::default(), None);
    let annotations: Vec<(&str, &str, &str)> = doc.content[0]
        .content
        .iter()
        .filter_map(|node| node.mark_of_kind("link"))
        .map(|link| {
            (
                link.attr_str("href"),
                link.attr_str("referenceLabel"),
                link.attr_str("referenceType"),
            )
        })
        .collect();
    assert_eq!(
        annotations,
        vec![("/1", "one", "full"), ("/2", "two", "collapsed"), ("/3", "three", "shortcut")]
    );
    assert!(doc.content[0]
        .content
        .iter()
        .filter_map(|node| node.mark_of_kind("link"))
        .all(|link| link.markup() == "reference"));
}

#[test]
fn test_host_references_resolve() {
    let mut references = ReferenceTable::new();
    references.insert("docs".to_string(), LinkReference::new("https://x.io/docs", None));
    let doc = parse("see [docs]", &ParseOptions::default(), Some(&references));
    let link = doc.content[0].content[1].mark_of_kind("link").unwrap();
    assert_eq!(link.attr_str("href"), "https://x.io/docs");
    assert_eq!(link.markup(), "reference");
    assert_eq!(link.attr_str("referenceType"), "shortcut");
}

#[test]
fn test_tables() {
    let options = ParseOptions {
        tables: true,
        ..ParseOptions::default()
    };
    let doc = parse("| a | b |\n|:--|---|\n| 1 | 2 |", &options, None);
    assert_eq!(
        shape(&doc),
        "doc(table(table_head(table_row(table_header(text) table_header(text))) \
         table_body(table_row(table_cell(text) table_cell(text)))))"
    );
    let header_row = &doc.content[0].content[0].content[0];
    assert_eq!(header_row.content[0].attr_str("style"), "text-align:left");
    assert!(header_row.content[1].attr("style").is_some_and(AttrValue::is_null));
}

#[test]
fn test_tables_off_by_default() {
    let doc = parse("| a | b |\n|---|---|", &ParseOptions::default(), None);
    assert_eq!(kinds(&doc), vec!["paragraph"]);
}

#[test]
fn test_strikethrough_needs_extra_emphasis() {
    let options = ParseOptions {
        extra_emphasis: true,
        ..ParseOptions::default()
    };
    let doc = parse("~~gone~~", &options, None);
    let strike = doc.content[0].content[0].mark_of_kind("strike").unwrap();
    assert_eq!(strike.markup(), "~~");

    let doc = parse("~~gone~~", &ParseOptions::default(), None);
    assert!(doc.content[0].content[0].marks.is_empty());
}

#[test]
fn test_bare_urls_are_linked() {
    let doc = parse("visit https://example.com now", &ParseOptions::default(), None);
    let linked = doc.content[0]
        .content
        .iter()
        .find(|node| node.mark_of_kind("link").is_some())
        .unwrap();
    assert_eq!(linked.text.as_deref(), Some("https://example.com"));
    assert_eq!(linked.mark_of_kind("link").unwrap().markup(), "linkify");

    let options = ParseOptions {
        linkify: false,
        ..ParseOptions::default()
    };
    let doc = parse("visit https://example.com now", &options, None);
    assert!(doc.content[0].content.iter().all(|node| node.marks.is_empty()));
}

#[test]
fn test_unsafe_link_is_not_a_link() {
    let doc = parse("[x](javascript:alert(1))", &ParseOptions::default(), None);
    assert!(doc.content[0].content.iter().all(|node| node.mark_of_kind("link").is_none()));
}
