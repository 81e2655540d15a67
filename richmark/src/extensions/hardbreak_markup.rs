//! Record which syntax produced each hard break
//!
//! Markdown has two hard break forms, a trailing backslash and two trailing
//! spaces. The parser notes the form in `info`; this pass moves it into
//! `markup` unless the break already carries one (HTML `<br>`).

use super::{for_each_inline, PassContext};
use crate::token::Token;

pub fn annotate(mut tokens: Vec<Token>, _ctx: &mut PassContext<'_>) -> Vec<Token> {
    for_each_inline(&mut tokens, &mut |inline| {
        for child in inline.children.iter_mut() {
            if child.kind == "hardbreak" && child.markup.is_empty() && !child.info.is_empty() {
                child.markup = std::mem::take(&mut child.info);
            }
        }
    });
    tokens
}
