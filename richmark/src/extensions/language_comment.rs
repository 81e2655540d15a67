//! `<!-- language: lang-x -->` annotations for indented code
//!
//! Indented code blocks have no info string, so the language is given by an HTML
//! comment on the line before. `language-all` sets the default for every later
//! indented block; an explicit `language` comment overrides it for the very next
//! block only. Fenced code keeps its own info string.
//!
//! The block rule turns each comment line into a `language_comment` token; the fold
//! pass attaches the language to the following `code_block` and removes the comment.
//! A `language` comment with no code block after it goes back to being plain HTML
//! (or literal text when HTML is disabled).

use super::PassContext;
use crate::token::Token;
use markdown_it::parser::block::{BlockRule, BlockState};
use markdown_it::{Node, NodeValue};
use once_cell::sync::Lazy;
use regex::Regex;

static LANGUAGE_COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<!--\s*language(-all)?:\s*(\S+)\s*-->\s*$").expect("valid language comment pattern")
});

/// Strip the conventional `lang-` prefix
pub fn language_name(raw: &str) -> &str {
    raw.strip_prefix("lang-").unwrap_or(raw)
}

/// `(language, applies_to_all)` if `line` is a language comment
pub fn parse_comment(line: &str) -> Option<(&str, bool)> {
    let caps = LANGUAGE_COMMENT_RE.captures(line)?;
    let language = caps.get(2)?.as_str();
    Some((language, caps.get(1).is_some()))
}

/// A comment line recognized by [`LanguageCommentScanner`]
#[derive(Debug)]
pub struct LanguageComment {
    pub language: String,
    /// `language-all` rather than `language`
    pub all: bool,
    /// The comment line as written
    pub line: String,
}

impl NodeValue for LanguageComment {}

pub struct LanguageCommentScanner;

impl BlockRule for LanguageCommentScanner {
    fn run(state: &mut BlockState) -> Option<(Node, usize)> {
        if state.line_indent(state.line) >= 4 {
            return None;
        }
        let line = state.get_line(state.line);
        let (language, all) = parse_comment(line)?;
        let node = Node::new(LanguageComment {
            language: language.to_string(),
            all,
            line: line.to_string(),
        });
        Some((node, 1))
    }
}

/// Turn an unattached comment back into what it would have parsed as
fn revert(comment: Token, ctx: &mut PassContext<'_>) -> Vec<Token> {
    log::debug!("language comment not followed by indented code");
    if ctx.md.options.html {
        let mut token = Token::new("html_block", "", 0);
        token.block = true;
        token.content = comment.content;
        token.map = comment.map;
        token.level = comment.level;
        return vec![token];
    }

    let text = comment.content.trim_end();
    let mut open = Token::new("paragraph_open", "p", 1);
    let mut inline = Token::new("inline", "", 0);
    let mut close = Token::new("paragraph_close", "p", -1);
    inline.children = ctx.md.parse_inline(text, ctx.env);
    inline.content = text.to_string();
    inline.level = comment.level + 1;
    for token in [&mut open, &mut inline, &mut close] {
        token.block = true;
        token.map = comment.map;
    }
    open.level = comment.level;
    close.level = comment.level;
    vec![open, inline, close]
}

fn fold_tokens(
    tokens: Vec<Token>,
    ctx: &mut PassContext<'_>,
    default_language: &mut Option<String>,
) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut pending: Option<Token> = None;

    for mut token in tokens {
        match token.kind.as_str() {
            "language_comment" if token.info == "all" => {
                *default_language = token.attr_get("language").map(str::to_string);
            }
            "language_comment" => {
                if let Some(comment) = pending.replace(token) {
                    out.extend(revert(comment, ctx));
                }
            }
            "code_block" => {
                let language = pending
                    .take()
                    .and_then(|comment| comment.attr_get("language").map(str::to_string))
                    .or_else(|| default_language.clone());
                if let Some(language) = language {
                    token.info = language_name(&language).to_string();
                    token.meta_set("language", language);
                }
                out.push(token);
            }
            _ => {
                if let Some(comment) = pending.take() {
                    out.extend(revert(comment, ctx));
                }
                if token.kind == "html_block_container" {
                    let children = std::mem::take(&mut token.children);
                    token.children = fold_tokens(children, ctx, default_language);
                }
                out.push(token);
            }
        }
    }
    if let Some(comment) = pending {
        out.extend(revert(comment, ctx));
    }
    out
}

pub fn fold(tokens: Vec<Token>, ctx: &mut PassContext<'_>) -> Vec<Token> {
    let mut default_language = None;
    fold_tokens(tokens, ctx, &mut default_language)
}
