//! Markdown parsing on top of `markdown-it`
//!
//! The CommonMark block and inline grammar comes from the `markdown-it` crate. This
//! module only decides which of its plugins are enabled for a [`ParseOptions`],
//! registers the flavour rules (spoilers, language comments, stack snippets and tag
//! links), and flattens the resulting AST into the [`Token`] stream the post passes
//! and the tree builder consume (see [`flatten`]).
//!
//! Link definitions live in a [`DefinitionTable`] on the AST root. The host's
//! references are copied in before block parsing, so a document definition with the
//! same label never replaces a seeded one.

mod flatten;
pub mod quote;

use crate::extensions::{language_comment, stack_snippet, tag_link};
use crate::options::{LinkReference, ParseOptions, ReferenceTable, TagLinkOptions};
use crate::token::Token;
use markdown_it::common::sourcemap::SourcePos;
use markdown_it::common::utils::normalize_reference;
use markdown_it::generics::inline::emph_pair::FragmentsJoin;
use markdown_it::generics::inline::full_link::LinkScanner;
use markdown_it::parser::block::builtin::BlockParserRule;
use markdown_it::parser::core::{CoreRule, Root};
use markdown_it::parser::extset::MarkdownItExt;
use markdown_it::parser::inline::builtin::InlineParserRule;
use markdown_it::parser::inline::InlineRoot;
use markdown_it::parser::linkfmt::{LinkFormatter, MDLinkFormatter};
use markdown_it::plugins::cmark::block::reference::{CustomReferenceMap, ReferenceMap};
use markdown_it::plugins::extra::linkify::LinkifyPrescan;
use markdown_it::plugins::{cmark, extra, html};
use markdown_it::{MarkdownIt, Node, NodeValue};
use quote::{QuoteScanner, Quoted, Spoilered};

/// Per-parse environment shared with the post passes
#[derive(Debug, Clone, Default)]
pub struct Env {
    /// Normalized label → definition, seeded by the host and extended by the document
    pub references: ReferenceTable,
}

/// A configured `markdown-it` instance
pub struct Parser {
    pub options: ParseOptions,
    md: MarkdownIt,
}

impl Parser {
    pub fn new(options: ParseOptions) -> Self {
        let md = configure(&options);
        Parser { options, md }
    }

    /// Definitions every [`Parser::tokenize`] call starts from
    pub fn seed_references(&mut self, references: ReferenceTable) {
        self.md.ext.insert(SeededReferences(references));
    }

    /// Block and inline tokenization, without the post passes
    ///
    /// `env.references` is replaced by the seeded definitions plus the ones the
    /// document declares.
    pub fn tokenize(&self, src: &str, env: &mut Env) -> Vec<Token> {
        let src = normalize(src);
        let root = self.md.parse(&src);
        env.references = root
            .cast::<Root>()
            .and_then(|data| data.ext.get::<ReferenceMap>())
            .and_then(|map| map.downcast_ref::<DefinitionTable>())
            .map(|table| table.0.clone())
            .unwrap_or_default();
        log::trace!("{} link definitions after block parsing", env.references.len());
        flatten::blocks(&root, &src)
    }

    /// Tokenize a run of inline content against the definitions in `env`
    pub fn parse_inline(&self, src: &str, env: &Env) -> Vec<Token> {
        let mut root = Node::new(Root::new(src.to_string()));
        root.srcmap = Some(SourcePos::new(0, src.len()));
        if let Some(data) = root.cast_mut::<Root>() {
            data.ext
                .insert(ReferenceMap::new(DefinitionTable(env.references.clone())));
        }
        let mut run = Node::new(InlineRun {
            source: src.to_string(),
        });
        run.children
            .push(Node::new(InlineRoot::new(src.to_string(), vec![(0, 0)])));
        root.children.push(run);

        if self.options.linkify {
            LinkifyPrescan::run(&mut root, &self.md);
        }
        InlineParserRule::run(&mut root, &self.md);
        FragmentsJoin::run(&mut root, &self.md);

        root.children
            .first()
            .map(|run| flatten::inlines(&run.children, src))
            .unwrap_or_default()
    }
}

fn configure(options: &ParseOptions) -> MarkdownIt {
    let mut md = MarkdownIt::new();
    md.link_formatter = Box::new(LinkPolicy {
        options: options.clone(),
        format: MDLinkFormatter::new(),
    });

    cmark::inline::newline::add(&mut md);
    cmark::inline::escape::add(&mut md);
    cmark::inline::backticks::add(&mut md);
    cmark::inline::emphasis::add(&mut md);
    cmark::inline::link::add(&mut md);
    cmark::inline::image::add(&mut md);
    cmark::inline::autolink::add(&mut md);
    cmark::inline::entity::add(&mut md);

    cmark::block::code::add(&mut md);
    cmark::block::fence::add(&mut md);
    md.block.add_rule::<QuoteScanner<Spoilered>>();
    md.block.add_rule::<QuoteScanner<Quoted>>();
    cmark::block::hr::add(&mut md);
    cmark::block::list::add(&mut md);
    cmark::block::reference::add(&mut md);
    md.block
        .add_rule::<language_comment::LanguageCommentScanner>();
    md.block.add_rule::<stack_snippet::StackSnippetScanner>();
    if options.html {
        html::html_block::add(&mut md);
    }
    cmark::block::heading::add(&mut md);
    cmark::block::lheading::add(&mut md);
    cmark::block::paragraph::add(&mut md);
    if options.tables {
        extra::tables::add(&mut md);
    }

    if options.extra_emphasis {
        extra::strikethrough::add(&mut md);
    }
    if options.html {
        html::html_inline::add(&mut md);
    }
    if options.linkify {
        extra::linkify::add(&mut md);
    }
    if let Some(tags) = &options.tag_links {
        md.ext.insert(TagLinkSettings(tags.clone()));
        md.inline
            .add_rule::<tag_link::TagLinkScanner>()
            .before::<LinkScanner<false>>();
    }

    md.add_rule::<SeedDefinitions>()
        .before::<BlockParserRule>();
    md.add_rule::<CaptureInlineSource>()
        .after::<BlockParserRule>()
        .before::<InlineParserRule>();
    md
}

/// Unify line endings and replace NUL characters
fn normalize(src: &str) -> String {
    src.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\0', "\u{FFFD}")
}

/// Tag grammar options, read by the tag link rule
#[derive(Debug)]
pub(crate) struct TagLinkSettings(pub TagLinkOptions);

impl MarkdownItExt for TagLinkSettings {}

#[derive(Debug)]
struct SeededReferences(ReferenceTable);

impl MarkdownItExt for SeededReferences {}

/// Link definitions keyed by normalized label; the first definition of a label wins
#[derive(Debug, Default)]
pub struct DefinitionTable(pub ReferenceTable);

impl CustomReferenceMap for DefinitionTable {
    fn insert(&mut self, label: String, destination: String, title: Option<String>) -> bool {
        let label = normalize_reference(&label);
        if label.is_empty() {
            return false;
        }
        self.0
            .entry(label)
            .or_insert_with(|| LinkReference::new(destination, title.as_deref()));
        true
    }

    fn get(&self, label: &str) -> Option<(&str, Option<&str>)> {
        self.0
            .get(&normalize_reference(label))
            .map(|reference| (reference.href.as_str(), reference.title.as_deref()))
    }
}

struct SeedDefinitions;

impl CoreRule for SeedDefinitions {
    fn run(root: &mut Node, md: &MarkdownIt) {
        let seeded = md
            .ext
            .get::<SeededReferences>()
            .map(|seeded| seeded.0.clone())
            .unwrap_or_default();
        if let Some(data) = root.cast_mut::<Root>() {
            data.ext.insert(ReferenceMap::new(DefinitionTable(seeded)));
        }
    }
}

/// Raw text of one inline run, trimmed the way inline parsing trims it
#[derive(Debug)]
pub struct InlineRun {
    pub source: String,
}

impl NodeValue for InlineRun {}

/// Wrap every pending inline root so its source survives inline parsing
struct CaptureInlineSource;

impl CoreRule for CaptureInlineSource {
    fn run(root: &mut Node, _: &MarkdownIt) {
        fn wrap(node: &mut Node) {
            for child in node.children.iter_mut() {
                let source = match child.cast::<InlineRoot>() {
                    Some(data) => data.content.trim_matches([' ', '\t']).to_string(),
                    None => {
                        wrap(child);
                        continue;
                    }
                };
                let inner = std::mem::take(child);
                let mut run = Node::new(InlineRun { source });
                run.srcmap = inner.srcmap;
                run.children.push(inner);
                *child = run;
            }
        }
        wrap(root);
    }
}

/// Destination policy: `markdown-it` normalization, host validation
#[derive(Debug)]
struct LinkPolicy {
    options: ParseOptions,
    format: MDLinkFormatter,
}

impl LinkFormatter for LinkPolicy {
    fn validate_link(&self, url: &str) -> Option<()> {
        self.options.validate_link(url).then_some(())
    }

    fn normalize_link(&self, url: &str) -> String {
        self.format.normalize_link(url)
    }

    fn normalize_link_text(&self, url: &str) -> String {
        self.format.normalize_link_text(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.kind.as_str()).collect()
    }

    fn tokenize(src: &str, options: ParseOptions) -> (Vec<Token>, Env) {
        let md = Parser::new(options);
        let mut env = Env::default();
        let tokens = md.tokenize(src, &mut env);
        (tokens, env)
    }

    fn inline(src: &str) -> Vec<Token> {
        Parser::new(ParseOptions::default()).parse_inline(src, &Env::default())
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize("a\r\nb\rc\0"), "a\nb\nc\u{FFFD}");
    }

    #[test]
    fn test_inline_children_attached() {
        let (tokens, _) = tokenize("*a* b", ParseOptions::default());
        assert_eq!(kinds(&tokens[1].children), vec!["em_open", "text", "em_close", "text"]);
    }

    #[test]
    fn test_basic_blocks() {
        let (tokens, _) = tokenize("# T\n\n> q\n\n---\n\n```js\nx\n```", ParseOptions::default());
        assert_eq!(
            kinds(&tokens),
            vec![
                "heading_open",
                "inline",
                "heading_close",
                "blockquote_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "blockquote_close",
                "hr",
                "fence"
            ]
        );
        assert_eq!(tokens[0].markup, "#");
        assert_eq!(tokens[8].markup, "---");
        assert_eq!(tokens[9].info, "js");
        assert_eq!(tokens[9].content, "x\n");
    }

    #[test]
    fn test_paragraph_content_is_trimmed() {
        let (tokens, _) = tokenize("a  \n", ParseOptions::default());
        assert_eq!(tokens[1].content, "a");
        assert_eq!(kinds(&tokens[1].children), vec!["text"]);
    }

    #[test]
    fn test_tight_list_hides_paragraphs() {
        let (tokens, _) = tokenize("- a\n- b", ParseOptions::default());
        let hidden: Vec<bool> = tokens
            .iter()
            .filter(|t| t.kind == "paragraph_open")
            .map(|t| t.hidden)
            .collect();
        assert_eq!(hidden, vec![true, true]);

        let (tokens, _) = tokenize("- a\n\n- b", ParseOptions::default());
        assert!(tokens
            .iter()
            .filter(|t| t.kind == "paragraph_open")
            .all(|t| !t.hidden));
    }

    #[test]
    fn test_ordered_start_and_markup() {
        let (tokens, _) = tokenize("3) a\n4) b", ParseOptions::default());
        assert_eq!(tokens[0].kind, "ordered_list_open");
        assert_eq!(tokens[0].attr_get("start"), Some("3"));
        assert_eq!(tokens[0].markup, ")");
        assert_eq!(tokens[1].info, "3");
    }

    #[test]
    fn test_setext_heading_keeps_underline() {
        let (tokens, _) = tokenize("Title\n=====", ParseOptions::default());
        assert_eq!(tokens[0].tag, "h1");
        assert_eq!(tokens[0].markup, "=====");
    }

    #[test]
    fn test_table_only_when_enabled() {
        let src = "| a | b |\n|:--|---|\n| 1 | 2 |\n| 3 |";
        let (tokens, _) = tokenize(src, ParseOptions::default());
        assert!(!kinds(&tokens).contains(&"table_open"));

        let options = ParseOptions {
            tables: true,
            ..ParseOptions::default()
        };
        let (tokens, _) = tokenize(src, options);
        let th: Vec<&Token> = tokens.iter().filter(|t| t.kind == "th_open").collect();
        assert_eq!(th.len(), 2);
        assert_eq!(th[0].attr_get("style"), Some("text-align:left"));
        assert_eq!(th[1].attr_get("style"), None);
        let cells: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == "inline")
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(cells, vec!["a", "b", "1", "2", "3", ""]);
    }

    #[test]
    fn test_definition_recorded() {
        let (tokens, env) = tokenize("[Foo]: /url \"title\"\n\n[foo]", ParseOptions::default());
        let reference = env.references.get("FOO").unwrap();
        assert_eq!(reference.href, "/url");
        assert_eq!(reference.title.as_deref(), Some("title"));
        assert_eq!(tokens[0].kind, "paragraph_open");
        assert_eq!(tokens[1].children[0].attr_get("href"), Some("/url"));
    }

    #[test]
    fn test_first_definition_wins() {
        let (_, env) = tokenize("[a]: /one\n[A]: /two", ParseOptions::default());
        assert_eq!(env.references.get("A").unwrap().href, "/one");
    }

    #[test]
    fn test_seeded_definition_wins() {
        let mut md = Parser::new(ParseOptions::default());
        let mut seeded = ReferenceTable::new();
        seeded.insert("A".to_string(), LinkReference::new("/host", None));
        md.seed_references(seeded);
        let mut env = Env::default();
        let tokens = md.tokenize("[a]: /doc\n\n[a]", &mut env);
        assert_eq!(env.references.get("A").unwrap().href, "/host");
        assert_eq!(tokens[1].children[0].attr_get("href"), Some("/host"));
    }

    #[test]
    fn test_breaks() {
        let tokens = inline("a\nb  \nc\\\nd");
        assert_eq!(
            kinds(&tokens),
            vec!["text", "softbreak", "text", "hardbreak", "text", "hardbreak", "text"]
        );
        assert_eq!(tokens[2].content, "b");
        assert_eq!(tokens[3].info, "  \n");
        assert_eq!(tokens[5].info, "\\\n");
    }

    #[test]
    fn test_text_is_joined() {
        assert_eq!(kinds(&inline("a \\* b &amp; c")), vec!["text"]);
        assert_eq!(kinds(&inline("*a")), vec!["text"]);
    }

    #[test]
    fn test_inline_link() {
        let tokens = inline("[a *b*](/url \"t\")");
        assert_eq!(tokens[0].kind, "link_open");
        assert_eq!(tokens[0].attr_get("href"), Some("/url"));
        assert_eq!(tokens[0].attr_get("title"), Some("t"));
        assert_eq!(tokens.last().unwrap().kind, "link_close");
    }

    #[test]
    fn test_angle_bracket_destination() {
        let tokens = inline("[a](</my url>)");
        assert_eq!(tokens[0].attr_get("href"), Some("/my%20url"));
    }

    #[test]
    fn test_reference_forms() {
        let md = Parser::new(ParseOptions::default());
        let mut env = Env::default();
        env.references
            .insert("BAR".to_string(), LinkReference::new("/bar", None));
        for src in ["[x][bar]", "[bar][]", "[BAR]"] {
            let tokens = md.parse_inline(src, &env);
            assert_eq!(tokens[0].attr_get("href"), Some("/bar"), "{src}");
        }
        let tokens = md.parse_inline("[x][missing]", &env);
        assert!(tokens.iter().all(|t| t.kind != "link_open"));
    }

    #[test]
    fn test_no_nested_links() {
        let tokens = inline("[a [b](/in)](/out)");
        let opens: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == "link_open")
            .filter_map(|t| t.attr_get("href"))
            .collect();
        assert_eq!(opens, vec!["/in"]);
    }

    #[test]
    fn test_image() {
        let tokens = inline("![alt *x*](/img.png)");
        assert_eq!(tokens[0].kind, "image");
        assert_eq!(tokens[0].attr_get("src"), Some("/img.png"));
        assert_eq!(tokens[0].content, "alt *x*");
        assert_eq!(tokens[0].children.len(), 4);
    }

    #[test]
    fn test_rejected_destination_is_text() {
        let tokens = inline("[a](javascript:alert(1))");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].content, "[a](javascript:alert(1))");
    }

    #[test]
    fn test_bare_url() {
        let tokens = inline("see https://example.com/x.");
        assert_eq!(kinds(&tokens), vec!["text", "link_open", "text", "link_close", "text"]);
        assert_eq!(tokens[0].content, "see ");
        assert_eq!(tokens[1].markup, "linkify");
        assert_eq!(tokens[2].content, "https://example.com/x");
        assert_eq!(tokens[4].content, ".");
    }

    #[test]
    fn test_no_fuzzy_links() {
        for src in ["www.example.com", "me@example.com", "mailto://x"] {
            assert!(inline(src).iter().all(|t| t.kind != "link_open"), "{src}");
        }
    }

    #[test]
    fn test_autolink_and_code() {
        let tokens = inline("<https://a.b> `x`");
        assert_eq!(tokens[0].kind, "link_open");
        assert_eq!(tokens[0].markup, "autolink");
        assert_eq!(tokens[1].content, "https://a.b");
        let code = tokens.iter().find(|t| t.kind == "code_inline").unwrap();
        assert_eq!(code.content, "x");
        assert_eq!(code.markup, "`");
    }

    #[test]
    fn test_strikethrough_needs_extra_emphasis() {
        assert_eq!(kinds(&inline("~~a~~")), vec!["text"]);
        let md = Parser::new(ParseOptions {
            extra_emphasis: true,
            ..ParseOptions::default()
        });
        let tokens = md.parse_inline("~~a~~", &Env::default());
        assert_eq!(kinds(&tokens), vec!["s_open", "text", "s_close"]);
        assert_eq!(tokens[0].markup, "~~");
    }

    #[test]
    fn test_html_only_when_enabled() {
        assert_eq!(kinds(&inline("a <b>c</b>")), vec!["text"]);
        let md = Parser::new(ParseOptions::all());
        let tokens = md.parse_inline("a <b>c</b>", &Env::default());
        assert_eq!(kinds(&tokens), vec!["text", "html_inline", "text", "html_inline"]);
        let (tokens, _) = tokenize("<div>\nx\n</div>", ParseOptions::all());
        assert_eq!(kinds(&tokens), vec!["html_block"]);
        assert_eq!(tokens[0].content, "<div>\nx\n</div>\n");
    }
}
