use crate::common::{html_options, kinds, shape};
use insta::assert_snapshot;
use richmark::{parse, serialize, Node, ParseOptions};

fn all_nodes(node: &Node) -> Vec<&Node> {
    let mut nodes = vec![node];
    for child in &node.content {
        nodes.extend(all_nodes(child));
    }
    nodes
}

fn has_html(node: &Node) -> bool {
    all_nodes(node)
        .iter()
        .any(|node| node.kind.starts_with("html"))
}

#[test]
fn test_unknown_inline_tag_becomes_text() {
    let doc = parse("a <marquee>b</marquee>", &html_options(), None);
    assert!(!has_html(&doc));
    assert_eq!(doc.text_content(), "a <marquee>b</marquee>");
}

#[test]
fn test_unknown_block_tags_are_stripped() {
    let doc = parse("<div>\n<marquee>m</marquee>\n</div>", &html_options(), None);
    assert_eq!(shape(&doc), "doc(paragraph(text))");
    assert_eq!(doc.text_content(), "m");
}

#[test]
fn test_block_with_nothing_allowed_is_dropped() {
    let doc = parse("<div>\n<marquee></marquee>\n</div>\n\nafter", &html_options(), None);
    assert_eq!(kinds(&doc), vec!["paragraph"]);
    assert_eq!(doc.text_content(), "after");
}

#[test]
fn test_image_forms_normalize_alike() {
    let plain = parse(r#"<img src="x" title="y" extra="z">"#, &html_options(), None);
    let closed = parse(r#"<img extra="z" src="x" title="y" />"#, &html_options(), None);
    assert_eq!(shape(&plain), "doc(paragraph(image))");
    assert_eq!(shape(&plain), shape(&closed));

    let mut plain_image = plain.content[0].content[0].clone();
    let mut closed_image = closed.content[0].content[0].clone();
    assert_eq!(plain_image.markup(), "<img>");
    assert_eq!(closed_image.markup(), "<img/>");
    plain_image.attrs.remove("markup");
    closed_image.attrs.remove("markup");
    assert_eq!(plain_image, closed_image);
    assert_eq!(plain_image.attr_str("src"), "x");
    assert_eq!(plain_image.attr_str("title"), "y");
    assert!(plain_image.attr("extra").is_none());

    assert_snapshot!(serialize(&plain).unwrap(), @r#"<img src="x" title="y">"#);
    assert_snapshot!(serialize(&closed).unwrap(), @r#"<img src="x" title="y" />"#);
}

#[test]
fn test_duplicate_attribute_first_wins() {
    let doc = parse(r#"<img src="a" src="b">"#, &html_options(), None);
    assert_eq!(shape(&doc), "doc(paragraph(image))");
    assert_eq!(doc.content[0].content[0].attr_str("src"), "a");
    assert_snapshot!(serialize(&doc).unwrap(), @r#"<img src="a">"#);

    let doc = parse(r#"<a href="/a" href="/b">x</a>"#, &html_options(), None);
    let link = doc.content[0].content[0].mark_of_kind("link").unwrap();
    assert_eq!(link.attr_str("href"), "/a");
}

#[test]
fn test_dangling_tags_are_demoted() {
    let doc = parse("a <em>b and c</strong>", &html_options(), None);
    let paragraph = &doc.content[0];
    assert!(paragraph.content.iter().all(|node| node.marks.is_empty()));
    let raw: Vec<&str> = paragraph
        .content
        .iter()
        .filter(|node| node.kind == "html_inline")
        .map(|node| node.attr_str("content"))
        .collect();
    assert_eq!(raw, vec!["<em>", "</strong>"]);
}

#[test]
fn test_paired_inline_tags_become_marks() {
    let doc = parse(
        r#"<a href="/u" onclick="x">l</a> <kbd>K</kbd>"#,
        &html_options(),
        None,
    );
    let paragraph = &doc.content[0];
    let link = paragraph.content[0].mark_of_kind("link").unwrap();
    assert_eq!(link.attr_str("href"), "/u");
    assert_eq!(link.markup(), "<a>");
    assert!(paragraph.content[2].mark_of_kind("kbd").is_some());
}

#[test]
fn test_unsafe_inline_href_is_blanked() {
    let doc = parse(r#"<a href="javascript:alert(1)">x</a>"#, &html_options(), None);
    let link = doc.content[0].content[0].mark_of_kind("link").unwrap();
    assert_eq!(link.attr_str("href"), "");
}

#[test]
fn test_single_line_block_forms() {
    let doc = parse("<h2>Title</h2>\n\n<pre>a b</pre>\n\n<hr>", &html_options(), None);
    assert_eq!(
        shape(&doc),
        "doc(heading(text) pre(paragraph(text)) horizontal_rule)"
    );
    assert_eq!(doc.content[0].markup(), "<h2>");
    assert_eq!(doc.content[1].markup(), "<pre>");
    assert_eq!(doc.content[2].markup(), "<hr>");
}

#[test]
fn test_split_block_is_merged() {
    let src = "<blockquote>\n\n*a*\n\n</blockquote>";
    let doc = parse(src, &html_options(), None);
    assert_eq!(shape(&doc), "doc(html_block_container(paragraph(text)))");
    let container = &doc.content[0];
    assert_eq!(container.attr_str("contentOpen"), "<blockquote>");
    assert_eq!(container.attr_str("contentClose"), "</blockquote>");
    assert_snapshot!(serialize(&doc).unwrap(), @r"
    <blockquote>

    *a*

    </blockquote>
    ");
}

#[test]
fn test_split_block_of_unknown_tags_is_unwrapped() {
    let doc = parse("<div>\n\ntext\n\n</div>", &html_options(), None);
    assert_eq!(shape(&doc), "doc(paragraph(text))");
}

#[test]
fn test_unpaired_split_candidate_stays_a_block() {
    let doc = parse("<blockquote>\n\ntext", &html_options(), None);
    assert_eq!(kinds(&doc), vec!["html_block", "paragraph"]);
    assert_eq!(doc.content[0].attr_str("content"), "<blockquote>\n");
}

#[test]
fn test_html_off_escapes_tags() {
    let doc = parse("<b>x</b>", &ParseOptions::default(), None);
    assert!(!has_html(&doc));
    assert_snapshot!(serialize(&doc).unwrap(), @r"\<b\>x\</b\>");
}
