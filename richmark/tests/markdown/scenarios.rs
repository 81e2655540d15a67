//! End-to-end behaviour of the extended syntax

use crate::common::{html_options, kinds, shape};
use richmark::{parse, serialize, Node, ParseOptions, TagLinkOptions};

#[test]
fn test_spoiler_followed_by_rule() {
    let doc = parse(">! foo\n---", &ParseOptions::default(), None);
    assert_eq!(shape(&doc), "doc(spoiler(paragraph(text)) horizontal_rule)");
    assert_eq!(doc.content[0].text_content(), "foo");
    assert_eq!(doc.content[1].markup(), "---");
}

#[test]
fn test_accepted_tag_link() {
    let options = ParseOptions {
        tag_links: Some(TagLinkOptions::with_validator(|_, _| true)),
        ..ParseOptions::default()
    };
    let doc = parse("[tag:python]", &options, None);
    let link = &doc.content[0].content[0];
    assert_eq!(link.kind, "tagLink");
    assert_eq!(link.attr_str("tagName"), "python");
    assert_eq!(link.attr_str("tagType"), "tag");
    assert_eq!(link.content, vec![Node::text("python")]);
}

#[test]
fn test_explicit_language_comment_wins() {
    let src = "<!-- language-all: lang-python -->\n<!-- language: lang-js -->\n    console.log(\"test\");";
    let doc = parse(src, &ParseOptions::default(), None);
    assert_eq!(kinds(&doc), vec!["code_block"]);
    assert_eq!(doc.content[0].attr_str("params"), "js");
    assert_eq!(doc.content[0].text_content(), "console.log(\"test\");");
}

#[test]
fn test_soft_break_holds_a_space() {
    let doc = parse("test1\ntest2", &ParseOptions::default(), None);
    let paragraph = &doc.content[0];
    assert_eq!(kinds(paragraph), vec!["text", "softbreak", "text"]);
    assert_eq!(paragraph.content[0].text.as_deref(), Some("test1"));
    assert_eq!(paragraph.content[1].content, vec![Node::text(" ")]);
    assert_eq!(paragraph.content[2].text.as_deref(), Some("test2"));
}

#[test]
fn test_heading_without_markup_is_atx() {
    let doc = Node::new("doc").with_content(vec![Node::new("heading")
        .with_attr("level", 2i64)
        .with_attr("markup", "")
        .with_content(vec![Node::text("Section")])]);
    assert_eq!(serialize(&doc).unwrap(), "## Section");
}

#[test]
fn test_dangling_open_tag_stays_literal() {
    let doc = parse("<em>test", &html_options(), None);
    let paragraph = &doc.content[0];
    assert_eq!(kinds(paragraph), vec!["html_inline", "text"]);
    assert_eq!(paragraph.content[0].attr_str("content"), "<em>");
    assert!(paragraph.content[1].marks.is_empty());
    assert_eq!(paragraph.content[1].text.as_deref(), Some("test"));
}

/// Shape with spoilers renamed, so the two quote forms can be compared
fn quote_shape(node: &Node) -> String {
    shape(node).replace("spoiler", "blockquote")
}

#[test]
fn test_spoiler_mirrors_blockquote() {
    let spoiler = ">! a\n>! b\n>!\n>! > c\n\nd";
    let quote = spoiler.replace(">!", ">");
    let options = ParseOptions::default();

    let spoiler_doc = parse(spoiler, &options, None);
    let quote_doc = parse(&quote, &options, None);
    assert_eq!(spoiler_doc.content[0].kind, "spoiler");
    assert_eq!(quote_doc.content[0].kind, "blockquote");
    assert_eq!(quote_shape(&spoiler_doc), quote_shape(&quote_doc));
    assert_eq!(spoiler_doc.text_content(), quote_doc.text_content());

    let spoiler_md = serialize(&spoiler_doc).unwrap();
    let quote_md = serialize(&quote_doc).unwrap();
    assert_eq!(spoiler_md.replace(">!", ">"), quote_md);
}

#[test]
fn test_rejected_tag_stays_text() {
    let options = ParseOptions {
        tag_links: Some(TagLinkOptions::with_validator(|name, _| name != "cobol")),
        ..ParseOptions::default()
    };
    let doc = parse("[tag:cobol]", &options, None);
    assert!(doc.content[0].content.iter().all(|node| node.kind != "tagLink"));
    assert_eq!(doc.content[0].text_content(), "[tag:cobol]");
}
