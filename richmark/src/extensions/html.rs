//! HTML passthrough: classification, split-block merging and sanitization
//!
//! Only a fixed allow-list of tags survives parsing. Recognized inline tags become
//! semantic open/close tokens whose `markup` keeps the tag family (`<b>` vs
//! `<strong>`); recognized block forms become real block tokens; everything else
//! is stripped (blocks) or kept as literal text (inline).
//!
//! Pass order matters: split blocks are merged into containers first, then block
//! tokens are sanitized, then inline children.

use super::PassContext;
use crate::html_scan::{scan, HtmlPiece};
use crate::options::ParseOptions;
use crate::token::Token;
use once_cell::sync::Lazy;
use regex::Regex;

/// Semantic family of an HTML tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Strike,
    Strong,
    Emphasis,
    HardBreak,
    Code,
    Link,
    Image,
    Keyboard,
    Pre,
    Sup,
    Sub,
    Heading,
    Paragraph,
    HorizontalRule,
    Blockquote,
    ListItem,
    OrderedList,
    UnorderedList,
    Comment,
    Unknown,
}

impl TagKind {
    fn from_name(name: &str) -> TagKind {
        match name {
            "del" | "s" | "strike" => TagKind::Strike,
            "b" | "strong" => TagKind::Strong,
            "em" | "i" => TagKind::Emphasis,
            "br" => TagKind::HardBreak,
            "code" => TagKind::Code,
            "a" => TagKind::Link,
            "img" => TagKind::Image,
            "kbd" => TagKind::Keyboard,
            "pre" => TagKind::Pre,
            "sup" => TagKind::Sup,
            "sub" => TagKind::Sub,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => TagKind::Heading,
            "p" => TagKind::Paragraph,
            "hr" => TagKind::HorizontalRule,
            "blockquote" => TagKind::Blockquote,
            "li" => TagKind::ListItem,
            "ol" => TagKind::OrderedList,
            "ul" => TagKind::UnorderedList,
            _ => TagKind::Unknown,
        }
    }

    pub fn is_block(self) -> bool {
        matches!(
            self,
            TagKind::Pre
                | TagKind::Heading
                | TagKind::Paragraph
                | TagKind::HorizontalRule
                | TagKind::Blockquote
                | TagKind::ListItem
                | TagKind::OrderedList
                | TagKind::UnorderedList
        )
    }

    /// Elements that never have content
    fn is_void(self) -> bool {
        matches!(
            self,
            TagKind::HardBreak | TagKind::Image | TagKind::HorizontalRule
        )
    }

    fn allowed_attributes(self) -> &'static [&'static str] {
        match self {
            TagKind::Link => &["href", "title"],
            TagKind::Image => &["alt", "height", "src", "title", "width"],
            _ => &[],
        }
    }

    /// Token kind prefix for inline tags that become open/close pairs
    fn inline_token(self) -> Option<&'static str> {
        match self {
            TagKind::Strike => Some("s"),
            TagKind::Strong => Some("strong"),
            TagKind::Emphasis => Some("em"),
            TagKind::Code => Some("code"),
            TagKind::Link => Some("link"),
            TagKind::Keyboard => Some("kbd"),
            TagKind::Sup => Some("sup"),
            TagKind::Sub => Some("sub"),
            _ => None,
        }
    }
}

/// Classification of one raw tag string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub kind: TagKind,
    /// Lowercase tag name; `None` for comments and unparseable input
    pub name: Option<String>,
    pub is_closing: bool,
    pub is_self_closing: bool,
    pub is_block: bool,
    /// Allow-listed attributes, sorted by name
    pub attrs: Vec<(String, String)>,
    /// Attribute-free form of the tag, e.g. `<strong>`, `</em>`, `<br/>`
    pub markup: String,
}

impl TagInfo {
    fn unknown() -> TagInfo {
        TagInfo {
            kind: TagKind::Unknown,
            name: None,
            is_closing: false,
            is_self_closing: false,
            is_block: false,
            attrs: Vec::new(),
            markup: String::new(),
        }
    }

    /// The tag rebuilt from its allow-listed parts
    pub fn sanitized(&self) -> String {
        if self.attrs.is_empty() || self.is_closing {
            return self.markup.clone();
        }
        let Some(name) = &self.name else {
            return String::new();
        };
        let mut out = format!("<{name}");
        for (key, value) in &self.attrs {
            out.push_str(&format!(" {key}=\"{}\"", escape_attribute(value)));
        }
        if self.markup.ends_with("/>") {
            out.push_str(" /");
        }
        out.push('>');
        out
    }
}

/// Escape an attribute value for double quotes
pub fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Classify a raw tag string such as `<a href="x" onclick="y">`
pub fn get_tag_info(raw: &str) -> TagInfo {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.starts_with('<') {
        return TagInfo::unknown();
    }
    if trimmed.starts_with("<!--") {
        return TagInfo {
            kind: TagKind::Comment,
            ..TagInfo::unknown()
        };
    }

    let Some(HtmlPiece::Tag {
        name,
        closing,
        self_closing,
        attrs,
    }) = scan(trimmed).into_iter().next()
    else {
        return TagInfo::unknown();
    };

    let kind = TagKind::from_name(&name);
    let allowed = kind.allowed_attributes();
    let mut attrs: Vec<(String, String)> = attrs
        .into_iter()
        .filter(|(key, _)| allowed.contains(&key.as_str()))
        .collect();
    attrs.sort_by(|a, b| a.0.cmp(&b.0));

    let markup = format!(
        "<{}{}{}>",
        if closing { "/" } else { "" },
        name,
        if self_closing && !closing { "/" } else { "" }
    );

    TagInfo {
        kind,
        is_self_closing: self_closing || kind.is_void(),
        is_block: kind.is_block(),
        name: Some(name),
        is_closing: closing,
        attrs,
        markup,
    }
}

static TAG_LIKE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--[\s\S]*?-->|</?[A-Za-z][^<>]*>").expect("valid tag pattern")
});

static OPEN_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z][^<>]*>").expect("valid open tag pattern"));

static CLOSE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</[A-Za-z][^<>]*>").expect("valid close tag pattern"));

/// `<tag ...>TEXT</tag>` on one line, with no nested tags
static SIMPLE_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(<[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?>)([^<\n]*)(</[A-Za-z][A-Za-z0-9]*\s*>)$")
        .expect("valid simple pair pattern")
});

static SINGLE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>$").expect("valid single tag pattern")
});

/// Reduce every tag in `content` to its allow-listed skeleton, deleting unknown tags
pub fn sanitize_fragment(content: &str) -> String {
    TAG_LIKE_RE
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let raw = &caps[0];
            let info = get_tag_info(raw);
            match info.kind {
                TagKind::Comment => raw.to_string(),
                TagKind::Unknown => String::new(),
                TagKind::Link | TagKind::Image => info.sanitized(),
                _ => info.markup,
            }
        })
        .into_owned()
}

/// Naive count of opening and closing tags; self-closing tags and comments are ignored
fn count_tags(content: &str) -> (usize, usize) {
    let opens = OPEN_TAG_RE
        .find_iter(content)
        .filter(|found| !found.as_str().ends_with("/>"))
        .count();
    let closes = CLOSE_TAG_RE.find_iter(content).count();
    (opens, closes)
}

fn is_split_candidate(token: &Token) -> bool {
    if token.kind != "html_block" {
        return false;
    }
    let (opens, closes) = count_tags(&token.content);
    opens != closes
}

/// Reunite HTML spans the block parser split around interrupting content
///
/// Candidates pair up in order within the same parent; the blocks between a pair
/// become the children of an `html_block_container`. A candidate left without a
/// partner stays an ordinary `html_block`.
pub fn merge_split_blocks(tokens: Vec<Token>, _ctx: &mut PassContext<'_>) -> Vec<Token> {
    let pairs = find_split_pairs(&tokens);
    if pairs.is_empty() {
        return tokens;
    }

    let mut opens = vec![None; tokens.len()];
    let mut closes = vec![false; tokens.len()];
    for (open, close) in pairs {
        opens[open] = Some(close);
        closes[close] = true;
    }

    // frames: (container under construction, its children)
    let mut stack: Vec<(Token, Vec<Token>)> = Vec::new();
    let mut root = Vec::with_capacity(tokens.len());
    for (index, token) in tokens.into_iter().enumerate() {
        if opens[index].is_some() {
            let mut container = Token::new("html_block_container", "", 0);
            container.block = true;
            container.level = token.level;
            container.map = token.map;
            container.attr_set("contentOpen", token.content.trim_end());
            stack.push((container, Vec::new()));
            continue;
        }
        if closes[index] {
            if let Some((mut container, children)) = stack.pop() {
                container.attr_set("contentClose", token.content.trim_end());
                if let (Some(open), Some(close)) = (container.map, token.map) {
                    container.map = Some([open[0], close[1]]);
                }
                container.children = children;
                log::debug!("merged split html block into container");
                match stack.last_mut() {
                    Some((_, parent)) => parent.push(container),
                    None => root.push(container),
                }
            }
            continue;
        }
        match stack.last_mut() {
            Some((_, children)) => children.push(token),
            None => root.push(token),
        }
    }
    root
}

/// Index pairs of split candidates, matched in order per nesting depth
fn find_split_pairs(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut pending: Vec<Option<usize>> = vec![None];
    let mut depth = 0usize;

    for (index, token) in tokens.iter().enumerate() {
        if token.nesting < 0 {
            depth = depth.saturating_sub(1);
            // a closed parent abandons any unpaired candidate inside it
            pending.truncate(depth + 1);
        }
        if pending.len() <= depth {
            pending.resize(depth + 1, None);
        }
        if is_split_candidate(token) {
            match pending[depth].take() {
                Some(open) => pairs.push((open, index)),
                None => pending[depth] = Some(index),
            }
        }
        if token.nesting > 0 {
            depth += 1;
        }
    }
    pairs
}

fn block_token(kind: &str, tag: &str, nesting: i8, markup: &str) -> Token {
    let mut token = Token::new(kind, tag, nesting);
    token.block = true;
    token.markup = markup.to_string();
    token
}

fn inline_token(content: &str, children: Vec<Token>) -> Token {
    let mut token = Token::new("inline", "", 0);
    token.block = true;
    token.content = content.to_string();
    token.children = children;
    token
}

fn paragraph(inline: Token) -> Vec<Token> {
    vec![
        block_token("paragraph_open", "p", 1, ""),
        inline,
        block_token("paragraph_close", "p", -1, ""),
    ]
}

/// Inline token for an inline HTML tag, or `None` if the kind has no inline form
fn inline_tag_token(info: &TagInfo, raw: &str) -> Option<Token> {
    let name = info.name.as_deref()?;
    let mut token = match info.kind {
        TagKind::HardBreak => Token::new("hardbreak", "br", 0),
        TagKind::Image => {
            let mut token = Token::new("image", "img", 0);
            token.attrs = info.attrs.clone();
            if token.attr_get("src").is_none() {
                token.attr_set("src", "");
            }
            token
        }
        kind => {
            let prefix = kind.inline_token()?;
            if info.is_closing {
                Token::new(format!("{prefix}_close"), name, -1)
            } else {
                let mut token = Token::new(format!("{prefix}_open"), name, 1);
                token.attrs = info.attrs.clone();
                token
            }
        }
    };
    token.markup = info.markup.clone();
    token.meta_set("html.raw", raw);
    token.meta_set("html.name", name);
    Some(token)
}

/// `<tag>TEXT</tag>` or a lone void tag as ready-made block tokens
fn simple_block(content: &str, ctx: &mut PassContext<'_>) -> Option<Vec<Token>> {
    if let Some(caps) = SIMPLE_PAIR_RE.captures(content) {
        let open = get_tag_info(&caps[1]);
        let close = get_tag_info(&caps[3]);
        if open.kind == TagKind::Unknown || open.name != close.name || open.is_closing {
            return None;
        }
        let text = &caps[2];
        let children = ctx.md.parse_inline(text, ctx.env);
        let inline = inline_token(text, children);
        let name = open.name.clone().unwrap_or_default();

        return match open.kind {
            TagKind::Paragraph => Some(vec![
                block_token("paragraph_open", "p", 1, &open.markup),
                inline,
                block_token("paragraph_close", "p", -1, &close.markup),
            ]),
            TagKind::Heading => Some(vec![
                block_token("heading_open", &name, 1, &open.markup),
                inline,
                block_token("heading_close", &name, -1, &close.markup),
            ]),
            TagKind::Blockquote | TagKind::Pre => {
                let kind = if open.kind == TagKind::Pre { "pre" } else { "blockquote" };
                let mut tokens = vec![block_token(&format!("{kind}_open"), &name, 1, &open.markup)];
                tokens.extend(paragraph(inline));
                tokens.push(block_token(&format!("{kind}_close"), &name, -1, &close.markup));
                Some(tokens)
            }
            _ if !open.is_block && !open.kind.is_void() => {
                let mut wrapped = Vec::with_capacity(inline.children.len() + 2);
                wrapped.push(inline_tag_token(&open, &caps[1])?);
                wrapped.extend(inline.children);
                wrapped.push(inline_tag_token(&close, &caps[3])?);
                Some(paragraph(inline_token(content, wrapped)))
            }
            _ => None,
        };
    }

    if SINGLE_TAG_RE.is_match(content) {
        let info = get_tag_info(content);
        return match info.kind {
            TagKind::HorizontalRule => Some(vec![block_token("hr", "hr", 0, &info.markup)]),
            TagKind::Image => {
                let image = inline_tag_token(&info, content)?;
                Some(paragraph(inline_token(content, vec![image])))
            }
            _ => None,
        };
    }
    None
}

/// Sanitize one `html_block` into zero or more block tokens
fn sanitize_block(token: Token, ctx: &mut PassContext<'_>) -> Vec<Token> {
    let content = token.content.trim();
    if let Some(mut tokens) = simple_block(content, ctx) {
        for replacement in tokens.iter_mut() {
            replacement.map = token.map;
        }
        return tokens;
    }

    let sanitized = sanitize_fragment(content);
    if sanitized.trim().is_empty() {
        log::debug!("dropped html block with no allowed content");
        return Vec::new();
    }
    if !TAG_LIKE_RE.is_match(&sanitized) {
        let text = sanitized.trim();
        let children = ctx.md.parse_inline(text, ctx.env);
        let mut tokens = paragraph(inline_token(text, children));
        for replacement in tokens.iter_mut() {
            replacement.map = token.map;
        }
        return tokens;
    }

    let mut token = token;
    token.content = format!("{}\n", sanitized.trim_end());
    vec![token]
}

/// Sanitize `html_block` tokens and container fragments, recursing into containers
pub fn sanitize_blocks(tokens: Vec<Token>, ctx: &mut PassContext<'_>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for mut token in tokens {
        match token.kind.as_str() {
            "html_block" => out.extend(sanitize_block(token, ctx)),
            "html_block_container" => {
                let children = sanitize_blocks(std::mem::take(&mut token.children), ctx);
                let open = sanitize_fragment(token.attr_get("contentOpen").unwrap_or_default());
                let close = sanitize_fragment(token.attr_get("contentClose").unwrap_or_default());
                if open.trim().is_empty() && close.trim().is_empty() {
                    log::debug!("hoisted children of html container with no allowed tags");
                    out.extend(children);
                } else {
                    token.attr_set("contentOpen", open.trim());
                    token.attr_set("contentClose", close.trim());
                    token.children = children;
                    out.push(token);
                }
            }
            _ => out.push(token),
        }
    }
    out
}

/// Classify inline HTML, then demote tags left without a partner
pub fn sanitize_inline(tokens: Vec<Token>, ctx: &mut PassContext<'_>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for mut token in tokens {
        if token.kind == "inline" {
            let children = std::mem::take(&mut token.children);
            token.children = pair_inline_tags(classify_inline(children, &ctx.md.options));
        } else if token.kind == "html_block_container" {
            token.children = sanitize_inline(std::mem::take(&mut token.children), ctx);
        }
        out.push(token);
    }
    out
}

fn classify_inline(children: Vec<Token>, options: &ParseOptions) -> Vec<Token> {
    children
        .into_iter()
        .map(|token| {
            if token.kind != "html_inline" {
                return token;
            }
            let info = get_tag_info(&token.content);
            if info.kind == TagKind::Comment {
                return token;
            }
            let replacement = if info.is_block {
                None
            } else {
                inline_tag_token(&info, &token.content)
            };
            match replacement {
                Some(mut replacement) => {
                    replacement.level = token.level;
                    for key in ["href", "src"] {
                        if replacement
                            .attr_get(key)
                            .is_some_and(|url| !options.validate_link(url))
                        {
                            replacement.attr_set(key, "");
                        }
                    }
                    replacement
                }
                None => {
                    let mut text = Token::text(token.content.clone());
                    text.level = token.level;
                    text
                }
            }
        })
        .collect()
}

/// Match each HTML open tag with the first later unpaired close of the same name
fn pair_inline_tags(mut children: Vec<Token>) -> Vec<Token> {
    let is_html_tag = |token: &Token, nesting: i8| {
        token.nesting == nesting && token.meta_get("html.name").is_some()
    };

    let mut paired = vec![false; children.len()];
    for open in 0..children.len() {
        if !is_html_tag(&children[open], 1) {
            continue;
        }
        let name = children[open].meta_get("html.name").map(str::to_string);
        let partner = (open + 1..children.len()).find(|&close| {
            !paired[close]
                && is_html_tag(&children[close], -1)
                && children[close].meta_get("html.name").map(str::to_string) == name
        });
        if let Some(close) = partner {
            paired[open] = true;
            paired[close] = true;
        }
    }

    for (index, token) in children.iter_mut().enumerate() {
        if token.nesting != 0 && token.meta_get("html.name").is_some() && !paired[index] {
            let raw = token.meta_get("html.raw").unwrap_or_default().to_string();
            let mut demoted = Token::new("html_inline", "", 0);
            demoted.content = raw;
            demoted.level = token.level;
            *token = demoted;
        }
    }
    children
}
