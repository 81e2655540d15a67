//! `>` blockquotes and `>!` spoilers
//!
//! Both containers share one scanner. A line opens (or continues) a container only
//! when its marker matches exactly: `>` followed by `!` is always a spoiler marker,
//! so a spoiler line ends a blockquote and the other way round. Lazy continuation
//! lines are marked with a negative indent while the content is parsed, and every
//! rewritten line offset is restored afterwards.

use markdown_it::common::utils::find_indent_of;
use markdown_it::parser::block::{BlockRule, BlockState};
use markdown_it::plugins::cmark::block::blockquote::Blockquote;
use markdown_it::{Node, NodeValue};
use std::marker::PhantomData;

/// Container node for `>!` content
#[derive(Debug)]
pub struct Spoiler;

impl NodeValue for Spoiler {}

/// One flavour of `>`-prefixed container
pub trait QuoteKind: 'static {
    /// Marker text, `>` or `>!`
    const MARKER: &'static str;

    fn node() -> Node;
}

pub struct Quoted;

impl QuoteKind for Quoted {
    const MARKER: &'static str = ">";

    fn node() -> Node {
        Node::new(Blockquote)
    }
}

pub struct Spoilered;

impl QuoteKind for Spoilered {
    const MARKER: &'static str = ">!";

    fn node() -> Node {
        Node::new(Spoiler)
    }
}

pub struct QuoteScanner<K>(PhantomData<K>);

impl<K: QuoteKind> QuoteScanner<K> {
    /// `line` starts with exactly this kind's marker
    fn opens(line: &str) -> bool {
        let Some(rest) = line.strip_prefix('>') else {
            return false;
        };
        rest.starts_with('!') == (K::MARKER.len() == 2)
    }
}

impl<K: QuoteKind> BlockRule for QuoteScanner<K> {
    fn check(state: &mut BlockState) -> Option<()> {
        if state.line_indent(state.line) >= state.md.max_indent {
            return None;
        }
        Self::opens(state.get_line(state.line)).then_some(())
    }

    fn run(state: &mut BlockState) -> Option<(Node, usize)> {
        Self::check(state)?;

        let marker_len = K::MARKER.len();
        let mut saved = Vec::new();
        let start_line = state.line;
        let mut next_line = state.line;
        let mut last_line_empty = false;

        while next_line < state.line_max {
            let is_outdented = state.line_indent(next_line) < 0;
            let line = state.get_line(next_line).to_owned();
            if line.is_empty() {
                break;
            }

            if !is_outdented && Self::opens(&line) {
                let offsets = &state.line_offsets[next_line];
                let line_start = offsets.line_start;
                let after_marker = offsets.first_nonspace + marker_len;
                saved.push(offsets.clone());

                let (mut indent, first_nonspace) = find_indent_of(
                    &state.src[line_start..offsets.line_end],
                    after_marker - line_start,
                );
                last_line_empty = first_nonspace == offsets.line_end - line_start;

                // one optional space after the marker belongs to it
                if matches!(line[marker_len..].chars().next(), Some(' ' | '\t')) {
                    indent -= 1;
                }

                let offsets = &mut state.line_offsets[next_line];
                offsets.indent_nonspace = indent as i32;
                offsets.first_nonspace = first_nonspace + line_start;
                next_line += 1;
                continue;
            }

            if last_line_empty {
                break;
            }

            state.line = next_line;
            if state.test_rules_at_line() {
                if state.blk_indent != 0 {
                    saved.push(state.line_offsets[next_line].clone());
                    state.line_offsets[next_line].indent_nonspace -= state.blk_indent as i32;
                }
                break;
            }

            // lazy continuation
            saved.push(state.line_offsets[next_line].clone());
            state.line_offsets[next_line].indent_nonspace = -1;
            next_line += 1;
        }

        let old_indent = state.blk_indent;
        state.blk_indent = 0;
        let old_node = std::mem::replace(&mut state.node, K::node());
        let old_line_max = state.line_max;
        state.line = start_line;
        state.line_max = next_line;
        let md = state.md;
        md.block.tokenize(state);
        next_line = state.line;
        state.line = start_line;
        state.line_max = old_line_max;

        for (index, offsets) in saved.iter_mut().enumerate() {
            std::mem::swap(&mut state.line_offsets[start_line + index], offsets);
        }
        state.blk_indent = old_indent;

        let node = std::mem::replace(&mut state.node, old_node);
        Some((node, next_line - start_line))
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ParseOptions;
    use crate::parser::{Env, Parser};
    use crate::token::Token;

    fn tokenize(src: &str) -> Vec<Token> {
        let md = Parser::new(ParseOptions::default());
        let mut env = Env::default();
        md.tokenize(src, &mut env)
    }

    fn block_kinds(src: &str) -> Vec<(String, String)> {
        tokenize(src)
            .into_iter()
            .map(|token| (token.kind, token.content))
            .collect()
    }

    #[test]
    fn test_spoiler_then_hr() {
        let kinds: Vec<String> = block_kinds(">! foo\n---")
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                "spoiler_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "spoiler_close",
                "hr"
            ]
        );
    }

    #[test]
    fn test_markers_are_exclusive() {
        let kinds: Vec<String> = block_kinds("> quote\n>! hidden")
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();
        assert_eq!(kinds[0], "blockquote_open");
        assert!(kinds.contains(&"blockquote_close".to_string()));
        assert!(kinds.contains(&"spoiler_open".to_string()));
    }

    #[test]
    fn test_lazy_continuation() {
        let tokens = block_kinds(">! a\nb");
        let inline = tokens.iter().find(|(kind, _)| kind == "inline").unwrap();
        assert_eq!(inline.1, "a\nb");
        assert_eq!(tokens.last().unwrap().0, "spoiler_close");
    }

    #[test]
    fn test_symmetry_with_blockquote() {
        let src = ">! a\n>!\n>! - b\n>!   c\n>!\n>!     code";
        let spoiler: Vec<(String, String)> = block_kinds(src)
            .into_iter()
            .map(|(kind, content)| (kind.replace("spoiler", "blockquote"), content))
            .collect();
        let quote = block_kinds(&src.replace(">!", ">"));
        assert_eq!(spoiler, quote);
    }

    #[test]
    fn test_line_state_restored() {
        let tokens = tokenize("> a\n> b\n\nc");
        let last_inline = tokens.iter().rev().find(|t| t.kind == "inline").unwrap();
        assert_eq!(last_inline.content, "c");
        assert_eq!(last_inline.map, Some([3, 4]));
    }
}
