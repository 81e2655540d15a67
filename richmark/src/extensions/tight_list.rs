//! Mark lists whose items render without paragraph spacing
//!
//! The list rule hides the paragraphs of a tight list; this pass lifts that onto
//! the list itself as a `tight` attribute, which becomes the list node's attr.

use super::PassContext;
use crate::token::Token;

fn mark(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if tokens[i].kind == "html_block_container" {
            mark(&mut tokens[i].children);
            continue;
        }
        if tokens[i].kind != "bullet_list_open" && tokens[i].kind != "ordered_list_open" {
            continue;
        }
        let tight = tokens
            .get(i + 2)
            .is_some_and(|token| token.kind == "paragraph_open" && token.hidden);
        if tight {
            tokens[i].attr_set("tight", "true");
        }
    }
}

pub fn mark_tight_lists(mut tokens: Vec<Token>, _ctx: &mut PassContext<'_>) -> Vec<Token> {
    mark(&mut tokens);
    tokens
}
