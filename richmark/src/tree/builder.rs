//! Token stream to document tree
//!
//! A stack of open block frames plus the set of active marks. Each token kind maps
//! to one [`TokenSpec`]: a block that opens and closes, a leaf node, or a mark. The
//! token's `markup` always lands in the node's or mark's `markup` attribute.

use super::node::{AttrValue, Attrs, Mark, Node};
use super::schema::{add_mark, create_mark, create_node, node_type};
use crate::token::Token;

/// How a token kind (without its `_open`/`_close` suffix) becomes tree content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenSpec {
    /// Paired tokens opening a node with children
    Block(&'static str),
    /// A self-contained token becoming one node
    Node(&'static str),
    /// Paired tokens toggling a mark
    Mark(&'static str),
    Ignore,
}

static TOKEN_SPECS: &[(&str, TokenSpec)] = &[
    ("paragraph", TokenSpec::Block("paragraph")),
    ("heading", TokenSpec::Block("heading")),
    ("blockquote", TokenSpec::Block("blockquote")),
    ("spoiler", TokenSpec::Block("spoiler")),
    ("pre", TokenSpec::Block("pre")),
    ("bullet_list", TokenSpec::Block("bullet_list")),
    ("ordered_list", TokenSpec::Block("ordered_list")),
    ("list_item", TokenSpec::Block("list_item")),
    ("table", TokenSpec::Block("table")),
    ("thead", TokenSpec::Block("table_head")),
    ("tbody", TokenSpec::Block("table_body")),
    ("tr", TokenSpec::Block("table_row")),
    ("th", TokenSpec::Block("table_header")),
    ("td", TokenSpec::Block("table_cell")),
    ("tag_link", TokenSpec::Block("tagLink")),
    ("stack_snippet", TokenSpec::Block("stack_snippet")),
    ("code_block", TokenSpec::Node("code_block")),
    ("fence", TokenSpec::Node("code_block")),
    ("hr", TokenSpec::Node("horizontal_rule")),
    ("html_block", TokenSpec::Node("html_block")),
    ("html_block_container", TokenSpec::Node("html_block_container")),
    ("stack_snippet_lang", TokenSpec::Node("stack_snippet_lang")),
    ("html_inline", TokenSpec::Node("html_inline")),
    ("image", TokenSpec::Node("image")),
    ("hardbreak", TokenSpec::Node("hard_break")),
    ("softbreak", TokenSpec::Node("softbreak")),
    ("code_inline", TokenSpec::Node("code_inline")),
    ("em", TokenSpec::Mark("em")),
    ("strong", TokenSpec::Mark("strong")),
    ("s", TokenSpec::Mark("strike")),
    ("link", TokenSpec::Mark("link")),
    ("code", TokenSpec::Mark("code")),
    ("kbd", TokenSpec::Mark("kbd")),
    ("sup", TokenSpec::Mark("sup")),
    ("sub", TokenSpec::Mark("sub")),
    // folded away unless something went wrong upstream
    ("language_comment", TokenSpec::Ignore),
];

/// Spec for a token kind plus whether it opens, closes or stands alone
fn lookup(kind: &str) -> Option<(TokenSpec, i8)> {
    let find = |name: &str| {
        TOKEN_SPECS
            .iter()
            .find(|(token, _)| *token == name)
            .map(|(_, spec)| *spec)
    };
    if let Some(spec) = find(kind) {
        return Some((spec, 0));
    }
    if let Some(base) = kind.strip_suffix("_open") {
        return find(base).map(|spec| (spec, 1));
    }
    if let Some(base) = kind.strip_suffix("_close") {
        return find(base).map(|spec| (spec, -1));
    }
    None
}

fn markup_attrs(token: &Token) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("markup".to_string(), token.markup.clone().into());
    attrs
}

fn optional(value: Option<&str>) -> AttrValue {
    value.filter(|value| !value.is_empty()).into()
}

fn reference_attrs(token: &Token, attrs: &mut Attrs) {
    attrs.insert(
        "referenceLabel".to_string(),
        optional(token.meta_get("reference.label")),
    );
    attrs.insert(
        "referenceType".to_string(),
        optional(token.meta_get("reference.type")),
    );
}

/// Node attributes taken from a token
fn node_attrs(node: &str, token: &Token) -> Attrs {
    let mut attrs = markup_attrs(token);
    match node {
        "heading" => {
            let level = token
                .tag
                .strip_prefix('h')
                .and_then(|level| level.parse::<i64>().ok())
                .unwrap_or(1);
            attrs.insert("level".to_string(), level.into());
        }
        "bullet_list" | "ordered_list" => {
            attrs.insert("tight".to_string(), (token.attr_get("tight") == Some("true")).into());
            if node == "ordered_list" {
                let order = token
                    .attr_get("start")
                    .and_then(|start| start.parse::<i64>().ok())
                    .unwrap_or(1);
                attrs.insert("order".to_string(), order.into());
            }
        }
        "code_block" => {
            attrs.insert("params".to_string(), token.info.trim().into());
        }
        "html_block" | "html_inline" => {
            attrs.insert("content".to_string(), token.content.clone().into());
        }
        "html_block_container" => {
            for name in ["contentOpen", "contentClose"] {
                attrs.insert(name.to_string(), token.attr_get(name).unwrap_or("").into());
            }
        }
        "table_header" | "table_cell" => {
            attrs.insert("style".to_string(), token.attr_get("style").into());
        }
        "tagLink" => {
            attrs.insert("tagName".to_string(), token.attr_get("tagName").unwrap_or("").into());
            attrs.insert("tagType".to_string(), token.attr_get("tagType").unwrap_or("tag").into());
        }
        "stack_snippet" => {
            for (name, value) in &token.attrs {
                attrs.insert(name.clone(), value.as_str().into());
            }
        }
        "stack_snippet_lang" => {
            attrs.insert("language".to_string(), token.attr_get("language").unwrap_or("").into());
        }
        "image" => {
            let alt = token
                .attr_get("alt")
                .filter(|alt| !alt.is_empty())
                .map(str::to_string)
                .or_else(|| {
                    let text: String = token.children.iter().map(|c| c.content.as_str()).collect();
                    (!text.is_empty()).then_some(text)
                });
            attrs.insert("src".to_string(), token.attr_get("src").unwrap_or("").into());
            attrs.insert("alt".to_string(), alt.into());
            for name in ["title", "width", "height"] {
                attrs.insert(name.to_string(), optional(token.attr_get(name)));
            }
            reference_attrs(token, &mut attrs);
        }
        _ => {}
    }
    attrs
}

fn mark_attrs(mark: &str, token: &Token) -> Attrs {
    let mut attrs = markup_attrs(token);
    if mark == "link" {
        attrs.insert("href".to_string(), token.attr_get("href").unwrap_or("").into());
        attrs.insert("title".to_string(), optional(token.attr_get("title")));
        reference_attrs(token, &mut attrs);
    }
    attrs
}

struct Frame {
    kind: String,
    attrs: Attrs,
    content: Vec<Node>,
}

pub struct TreeBuilder {
    stack: Vec<Frame>,
    marks: Vec<Mark>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            stack: vec![Frame {
                kind: "doc".to_string(),
                attrs: Attrs::new(),
                content: Vec::new(),
            }],
            marks: Vec::new(),
        }
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn open(&mut self, kind: &str, attrs: Attrs) {
        self.stack.push(Frame {
            kind: kind.to_string(),
            attrs,
            content: Vec::new(),
        });
    }

    fn close(&mut self) {
        if self.stack.len() < 2 {
            log::warn!("unbalanced closing token ignored");
            return;
        }
        if let Some(frame) = self.stack.pop() {
            let node = create_node(&frame.kind, frame.attrs, frame.content);
            self.top().content.push(node);
        }
    }

    /// Push a node, carrying the active marks if it is inline
    fn push(&mut self, mut node: Node) {
        if node_type(&node.kind).is_some_and(|node_type| node_type.inline) {
            node.marks = self.marks.clone();
        }
        self.top().content.push(node);
    }

    fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let marks = self.marks.clone();
        let frame = self.top();
        if let Some(last) = frame.content.last_mut() {
            if last.is_text() && last.marks == marks {
                if let Some(existing) = last.text.as_mut() {
                    existing.push_str(text);
                    return;
                }
            }
        }
        frame.content.push(Node::text(text).with_marks(marks));
    }

    fn open_mark(&mut self, mark: Mark) {
        self.marks = add_mark(&self.marks, mark);
    }

    fn close_mark(&mut self, kind: &str) {
        self.marks.retain(|mark| mark.kind != kind);
    }

    /// Text node holding `content` without its final newline
    fn text_leaf(kind: &str, attrs: Attrs, content: &str) -> Node {
        let text = content.strip_suffix('\n').unwrap_or(content);
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        create_node(kind, attrs, children)
    }

    fn leaf(&mut self, kind: &'static str, token: &Token) {
        let attrs = node_attrs(kind, token);
        match kind {
            "code_block" | "stack_snippet_lang" => {
                let node = Self::text_leaf(kind, attrs, &token.content);
                self.push(node);
            }
            "softbreak" => {
                let node = create_node(kind, attrs, vec![Node::text(" ")]);
                self.push(node);
            }
            "code_inline" => {
                let mark = create_mark("code", markup_attrs(token));
                let marks = add_mark(&self.marks, mark);
                let node = Node::text(token.content.clone()).with_marks(marks);
                self.top().content.push(node);
            }
            "html_block_container" => {
                let mut nested = TreeBuilder::new();
                nested.tokens(&token.children);
                let node = create_node(kind, attrs, nested.finish().content);
                self.push(node);
            }
            _ => self.push(create_node(kind, attrs, Vec::new())),
        }
    }

    /// Feed a block-level token list (inline tokens are descended into)
    pub fn tokens(&mut self, tokens: &[Token]) {
        for token in tokens {
            self.token(token);
        }
    }

    fn token(&mut self, token: &Token) {
        match token.kind.as_str() {
            "inline" => return self.tokens(&token.children),
            "text" => return self.add_text(&token.content),
            _ => {}
        }
        match lookup(&token.kind) {
            Some((TokenSpec::Block(kind), 1)) => self.open(kind, node_attrs(kind, token)),
            Some((TokenSpec::Block(_), -1)) => self.close(),
            Some((TokenSpec::Node(kind), _)) => self.leaf(kind, token),
            Some((TokenSpec::Mark(kind), 1)) => self.open_mark(create_mark(kind, mark_attrs(kind, token))),
            Some((TokenSpec::Mark(kind), -1)) => self.close_mark(kind),
            Some((TokenSpec::Ignore, _)) => {}
            _ => log::warn!("no tree mapping for token '{}'", token.kind),
        }
    }

    /// Close any frames left open and return the document
    pub fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close();
        }
        let frame = self.stack.remove(0);
        create_node(&frame.kind, frame.attrs, frame.content)
    }
}

/// Build a document from a finished token stream
pub fn build(tokens: &[Token]) -> Node {
    let mut builder = TreeBuilder::new();
    builder.tokens(tokens);
    builder.finish()
}
