//! Runnable code snippets framed by HTML comments
//!
//! ```text
//! <!-- begin snippet: js hide: false console: true babel: false -->
//!
//! <!-- language: lang-js -->
//!
//!     console.log("hi");
//!
//! <!-- end snippet -->
//! ```
//!
//! Inside the frame only language comments, indented code and blank lines are allowed.
//! Anything else, or a missing end comment, leaves the lines to the other rules.

use super::language_comment::{language_name, parse_comment};
use markdown_it::parser::block::{BlockRule, BlockState};
use markdown_it::{Node, NodeValue};
use once_cell::sync::Lazy;
use regex::Regex;

static BEGIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<!--\s*begin snippet:\s*js\b(.*?)-->\s*$").expect("valid snippet begin pattern")
});
static END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*end snippet\s*-->\s*$").expect("valid snippet end pattern"));
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+):\s*(\S+)").expect("valid snippet option pattern"));

/// Options recognized on the begin line, in serialization order
pub const SNIPPET_OPTIONS: &[&str] = &["hide", "console", "babel", "babelPresetReact", "babelPresetTS"];

/// A whole snippet frame; children are [`StackSnippetLang`] blocks
#[derive(Debug)]
pub struct StackSnippet {
    pub options: Vec<(String, String)>,
}

impl NodeValue for StackSnippet {}

/// One language block inside a snippet
#[derive(Debug)]
pub struct StackSnippetLang {
    pub language: String,
    pub code: String,
}

impl NodeValue for StackSnippetLang {}

#[derive(Debug, Default)]
struct Snippet {
    options: Vec<(String, String)>,
    /// `(language, code lines)` per block
    blocks: Vec<(String, Vec<String>)>,
    end_line: usize,
}

fn parse_options(text: &str) -> Vec<(String, String)> {
    OPTION_RE
        .captures_iter(text)
        .filter(|caps| SNIPPET_OPTIONS.contains(&&caps[1]))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

fn scan(state: &BlockState) -> Option<Snippet> {
    let start_line = state.line;
    let caps = BEGIN_RE.captures(state.get_line(start_line))?;
    let mut snippet = Snippet {
        options: parse_options(&caps[1]),
        ..Default::default()
    };

    for line in start_line + 1..state.line_max {
        let indent = state.line_indent(line);
        if indent < 0 {
            return None;
        }
        if state.is_empty(line) {
            if let Some((_, code)) = snippet.blocks.last_mut() {
                if !code.is_empty() {
                    code.push(String::new());
                }
            }
            continue;
        }
        if indent >= 4 {
            let (_, code) = snippet.blocks.last_mut()?;
            let (text, _) = state.get_lines(line, line + 1, 4 + state.blk_indent, false);
            code.push(text);
            continue;
        }
        let text = state.get_line(line);
        if END_RE.is_match(text) {
            snippet.end_line = line;
            return Some(snippet);
        }
        match parse_comment(text) {
            Some((language, false)) => {
                snippet.blocks.push((language_name(language).to_string(), Vec::new()));
            }
            _ => return None,
        }
    }
    None
}

pub struct StackSnippetScanner;

impl BlockRule for StackSnippetScanner {
    fn check(state: &mut BlockState) -> Option<()> {
        if state.line_indent(state.line) >= 4 {
            return None;
        }
        scan(state).map(|_| ())
    }

    fn run(state: &mut BlockState) -> Option<(Node, usize)> {
        if state.line_indent(state.line) >= 4 {
            return None;
        }
        let snippet = scan(state)?;

        let mut node = Node::new(StackSnippet {
            options: snippet.options,
        });
        for (language, mut code) in snippet.blocks {
            while code.last().is_some_and(|line| line.is_empty()) {
                code.pop();
            }
            node.children.push(Node::new(StackSnippetLang {
                language,
                code: code.join("\n"),
            }));
        }
        Some((node, snippet.end_line + 1 - state.line))
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ParseOptions;
    use crate::parser::{Env, Parser};
    use crate::token::Token;

    fn tokens(src: &str) -> Vec<Token> {
        let md = Parser::new(ParseOptions::default());
        let mut env = Env::default();
        md.tokenize(src, &mut env)
    }

    const SNIPPET: &str = "<!-- begin snippet: js hide: false console: true babel: null -->\n\n<!-- language: lang-js -->\n\n    let a = 1;\n\n    console.log(a);\n\n<!-- language: lang-html -->\n\n    <p>hi</p>\n\n<!-- end snippet -->\n";

    #[test]
    fn test_snippet_tokens() {
        let tokens = tokens(SNIPPET);
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["stack_snippet_open", "stack_snippet_lang", "stack_snippet_lang", "stack_snippet_close"]
        );
        assert_eq!(tokens[0].attr_get("hide"), Some("false"));
        assert_eq!(tokens[0].attr_get("console"), Some("true"));
        assert_eq!(tokens[0].attr_get("babel"), Some("null"));
        assert_eq!(tokens[1].attr_get("language"), Some("js"));
        assert_eq!(tokens[1].content, "let a = 1;\n\nconsole.log(a);");
        assert_eq!(tokens[2].content, "<p>hi</p>");
    }

    #[test]
    fn test_missing_end_is_not_a_snippet() {
        let tokens = tokens("<!-- begin snippet: js hide: false -->\n\n    code\n");
        assert!(tokens.iter().all(|t| t.kind != "stack_snippet_open"));
    }

    #[test]
    fn test_stray_text_is_not_a_snippet() {
        let src = "<!-- begin snippet: js hide: false -->\ntext\n<!-- end snippet -->";
        assert!(tokens(src).iter().all(|t| t.kind != "stack_snippet_open"));
    }
}
