//! Thin wrapper over the html5ever tokenizer
//!
//! Raw tag strings and entity references are run through a real HTML tokenizer so
//! attribute quoting, duplicate attributes and character references follow the
//! HTML standard.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token as HtmlToken, TokenSink, TokenSinkResult, Tokenizer,
    TokenizerOpts,
};
use std::cell::RefCell;

/// A piece of tokenized HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HtmlPiece {
    Tag {
        name: String,
        closing: bool,
        self_closing: bool,
        /// In source order, duplicates already removed (first wins)
        attrs: Vec<(String, String)>,
    },
    Comment(String),
    Text(String),
}

#[derive(Default)]
struct PieceSink {
    pieces: RefCell<Vec<HtmlPiece>>,
}

impl PieceSink {
    fn push_text(&self, text: &str) {
        let mut pieces = self.pieces.borrow_mut();
        if let Some(HtmlPiece::Text(existing)) = pieces.last_mut() {
            existing.push_str(text);
        } else {
            pieces.push(HtmlPiece::Text(text.to_string()));
        }
    }
}

impl TokenSink for PieceSink {
    type Handle = ();

    fn process_token(&self, token: HtmlToken, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            HtmlToken::TagToken(tag) => {
                let attrs = tag
                    .attrs
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect();
                self.pieces.borrow_mut().push(HtmlPiece::Tag {
                    name: tag.name.to_string(),
                    closing: tag.kind == TagKind::EndTag,
                    self_closing: tag.self_closing,
                    attrs,
                });
            }
            HtmlToken::CommentToken(text) => {
                self.pieces
                    .borrow_mut()
                    .push(HtmlPiece::Comment(text.to_string()));
            }
            HtmlToken::CharacterTokens(text) => self.push_text(&text),
            HtmlToken::NullCharacterToken => self.push_text("\u{FFFD}"),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Tokenize an HTML fragment
pub(crate) fn scan(fragment: &str) -> Vec<HtmlPiece> {
    if fragment.is_empty() {
        return Vec::new();
    }
    let tokenizer = Tokenizer::new(PieceSink::default(), TokenizerOpts::default());
    let queue = BufferQueue::default();
    queue.push_back(StrTendril::from_slice(fragment));
    let _ = tokenizer.feed(&queue);
    tokenizer.end();
    tokenizer.sink.pieces.take()
}

/// Decode a single `&name;` or `&#nn;` reference, `None` if html5ever does not know it
pub(crate) fn decode_entity(reference: &str) -> Option<String> {
    let mut decoded = String::new();
    for piece in scan(reference) {
        match piece {
            HtmlPiece::Text(text) => decoded.push_str(&text),
            _ => return None,
        }
    }
    // legacy references decode without their semicolon, leaving a partial tail
    let unchanged = decoded == reference;
    let partial = decoded.ends_with(';') && reference != "&semi;";
    if decoded.is_empty() || unchanged || partial {
        None
    } else {
        Some(decoded)
    }
}
