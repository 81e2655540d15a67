//! Flavour extensions on top of the CommonMark parser
//!
//! The block and inline rules (`language_comment`, `stack_snippet`, `tag_link`) are
//! registered with `markdown-it` by [`crate::parser`]. The post passes below run once
//! over the finished token stream, in a fixed order:
//!
//! 1. HTML split-block merging, then block and inline sanitization (HTML only)
//! 2. tight list marking
//! 3. hard break markup
//! 4. reference link annotation
//! 5. language comment folding
//!
//! Each pass takes the token list by value and returns the rewritten list.

pub mod hardbreak_markup;
pub mod html;
pub mod language_comment;
pub mod reference_link;
pub mod stack_snippet;
pub mod tag_link;
pub mod tight_list;

use crate::token::Token;
use crate::parser::{Env, Parser};

/// What a pass may consult besides the tokens
pub struct PassContext<'a> {
    pub md: &'a Parser,
    pub env: &'a Env,
}

pub type Pass = fn(Vec<Token>, &mut PassContext<'_>) -> Vec<Token>;

/// Passes enabled for the parser's options, in execution order
pub fn passes(md: &Parser) -> Vec<(&'static str, Pass)> {
    let mut passes: Vec<(&'static str, Pass)> = Vec::new();
    if md.options.html {
        passes.push(("html_merge_split", html::merge_split_blocks));
        passes.push(("html_sanitize_blocks", html::sanitize_blocks));
        passes.push(("html_sanitize_inline", html::sanitize_inline));
    }
    passes.push(("tight_list", tight_list::mark_tight_lists));
    passes.push(("hardbreak_markup", hardbreak_markup::annotate));
    passes.push(("reference_link", reference_link::annotate));
    passes.push(("language_comment", language_comment::fold));
    passes
}

pub fn run_passes(tokens: Vec<Token>, ctx: &mut PassContext<'_>) -> Vec<Token> {
    passes(ctx.md)
        .into_iter()
        .fold(tokens, |tokens, (name, pass)| {
            log::trace!("running pass {name}");
            pass(tokens, ctx)
        })
}

/// Apply `f` to every inline token, including those inside HTML containers
pub(crate) fn for_each_inline(tokens: &mut [Token], f: &mut dyn FnMut(&mut Token)) {
    for token in tokens.iter_mut() {
        if token.kind == "inline" {
            f(token);
        } else if token.kind == "html_block_container" {
            for_each_inline(&mut token.children, f);
        }
    }
}
