//! Markup preservation: parse then serialize should give back the source spelling

use crate::common::{html_options, round_trip, shape};
use comrak::nodes::NodeValue;
use comrak::{parse_document, Arena, ComrakOptions};
use proptest::prelude::*;
use richmark::{parse, serialize, ParseOptions};

fn assert_preserved(src: &str, options: &ParseOptions) {
    assert_eq!(round_trip(src, options), src, "source: {src:?}");
}

#[test]
fn test_block_markup_is_preserved() {
    let options = ParseOptions::default();
    for src in [
        "Title\n===\n\n* one\n* two",
        "## Section\n\n+ a\n+ b",
        "1) first\n2) second",
        "***",
        "~~~\ncode\n~~~",
        "> quoted\n> text",
        ">! hidden",
    ] {
        assert_preserved(src, &options);
    }
}

#[test]
fn test_inline_markup_is_preserved() {
    let options = ParseOptions {
        extra_emphasis: true,
        ..ParseOptions::default()
    };
    for src in [
        "__strong__ and _em_",
        "**strong** and *em*",
        "~~gone~~ and `code`",
        "[site](https://x.io \"Title\")",
        "![alt](/i.png)",
    ] {
        assert_preserved(src, &options);
    }
}

#[test]
fn test_html_markup_is_preserved() {
    let options = html_options();
    for src in [
        "Some <b>bold</b> and <strong>strong</strong> text",
        "Press <kbd>Ctrl</kbd> then x<sup>2</sup>",
        "An <em>em</em> and an <i>i</i> and <del>gone</del>",
        "<h2>Title</h2>",
        "<hr>",
    ] {
        assert_preserved(src, &options);
    }
}

#[test]
fn test_reference_definitions_move_to_trailer() {
    let src = "[b link][b] and [a link][a]\n\n[b]: /b\n\n[a]: /a \"A\"";
    assert_eq!(
        round_trip(src, &ParseOptions::default()),
        "[b link][b] and [a link][a]\n\n[a]: /a \"A\"\n[b]: /b"
    );
}

#[test]
fn test_language_comment_is_written_back() {
    let src = "<!-- language: lang-js -->\n\n    let a = 1;";
    let doc = parse(src, &ParseOptions::default(), None);
    assert_eq!(doc.content[0].attr_str("params"), "js");
    assert_eq!(serialize(&doc).unwrap(), "<!-- language: lang-js -->\n    let a = 1;");
}

#[test]
fn test_escaped_plus_stays_text() {
    let options = ParseOptions::default();
    for src in ["\\+", "\\+\tx", "\\+ x"] {
        assert_preserved(src, &options);
        assert_eq!(shape(&parse(&round_trip(src, &options), &options, None)), "doc(paragraph(text))");
    }
    assert_preserved("+x", &options);
}

#[test]
fn test_trailing_blanks_do_not_survive_a_block() {
    let options = ParseOptions::all();
    for src in ["a <br>", "<sub>>! </sub>", "> a <br>\n\nb"] {
        let once = round_trip(src, &options);
        assert!(!once.lines().any(|line| line.ends_with(' ')), "output: {once:?}");
        assert_eq!(round_trip(&once, &options), once, "source: {src:?}");
    }
}

/// Text of every text node, in document order, as CommonMark sees it
fn commonmark_text(markdown: &str) -> String {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &ComrakOptions::default());
    let mut text = String::new();
    for node in root.descendants() {
        match &node.data.borrow().value {
            NodeValue::Text(value) => text.push_str(value),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

#[test]
fn test_serialized_output_reads_the_same_in_commonmark() {
    let src = "# Title\n\nSome *em* and **strong** `code`.\n\n- one\n- two\n\n> quoted\nline";
    let doc = parse(src, &ParseOptions::default(), None);
    let markdown = serialize(&doc).unwrap();
    assert_eq!(commonmark_text(&markdown), doc.text_content());
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 1..6).prop_map(|words| words.join(" "))
}

fn inline() -> impl Strategy<Value = String> {
    prop_oneof![
        sentence(),
        sentence().prop_map(|text| format!("*{text}*")),
        sentence().prop_map(|text| format!("_{text}_")),
        (word(), word()).prop_map(|(a, b)| format!("{a}_{b}")),
        word().prop_map(|text| format!("\\*{text}")),
        word().prop_map(|text| format!("<b>{text}</b>")),
        word().prop_map(|text| format!("<sub>{text}</sub> ")),
        word().prop_map(|text| format!("<kbd>{text}</kbd>")),
        (word(), word()).prop_map(|(a, b)| format!("{a} <br>{b}")),
    ]
}

fn paragraph() -> impl Strategy<Value = String> {
    prop::collection::vec(inline(), 1..4).prop_map(|parts| parts.join(" "))
}

fn block() -> impl Strategy<Value = String> {
    prop_oneof![
        paragraph(),
        sentence().prop_map(|text| format!("## {text}")),
        paragraph().prop_map(|text| format!("> {text}")),
        paragraph().prop_map(|text| format!(">! {text}")),
        prop::collection::vec(sentence(), 1..4)
            .prop_map(|items| items.iter().map(|item| format!("- {item}")).collect::<Vec<_>>().join("\n")),
        word().prop_map(|text| format!("+{text}")),
        word().prop_map(|text| format!("\\+ {text}")),
        Just("\\+".to_string()),
        (word(), word()).prop_map(|(text, label)| format!("[{text}][{label}]\n\n[{label}]: /{label}")),
        (word(), word(), word(), word())
            .prop_map(|(a, b, c, d)| format!("| {a} | {b} |\n| --- | :-: |\n| {c} | {d} |")),
    ]
}

proptest! {
    #[test]
    fn prop_serialize_is_idempotent(blocks in prop::collection::vec(block(), 1..5)) {
        let src = blocks.join("\n\n");
        let options = ParseOptions::all();
        let once = round_trip(&src, &options);
        let twice = round_trip(&once, &options);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_text_survives_round_trip(blocks in prop::collection::vec(block(), 1..5)) {
        let src = blocks.join("\n\n");
        let options = ParseOptions::all();
        let doc = parse(&src, &options, None);
        let reparsed = parse(&serialize(&doc).unwrap(), &options, None);
        prop_assert_eq!(doc.text_content(), reparsed.text_content());
    }
}
