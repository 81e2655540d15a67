//! `markdown-it` AST → token stream
//!
//! Block nodes become `_open`/`_close` pairs (or single tokens for leaves) with line
//! maps; every inline run becomes one `inline` token whose children are the flattened
//! inline nodes. The literal syntax the AST does not keep (hard break form, setext
//! underline, image label) is read back from the source through the node's byte map.

use super::quote::Spoiler;
use super::InlineRun;
use crate::extensions::language_comment::LanguageComment;
use crate::extensions::stack_snippet::{StackSnippet, StackSnippetLang};
use crate::extensions::tag_link::TagLink;
use crate::token::Token;
use markdown_it::parser::inline::{Text, TextSpecial};
use markdown_it::plugins::cmark::block::blockquote::Blockquote;
use markdown_it::plugins::cmark::block::code::CodeBlock;
use markdown_it::plugins::cmark::block::fence::CodeFence;
use markdown_it::plugins::cmark::block::heading::ATXHeading;
use markdown_it::plugins::cmark::block::hr::ThematicBreak;
use markdown_it::plugins::cmark::block::lheading::SetextHeader;
use markdown_it::plugins::cmark::block::list::{BulletList, ListItem, OrderedList};
use markdown_it::plugins::cmark::block::paragraph::Paragraph;
use markdown_it::plugins::cmark::block::reference::Definition;
use markdown_it::plugins::cmark::inline::autolink::Autolink;
use markdown_it::plugins::cmark::inline::backticks::CodeInline;
use markdown_it::plugins::cmark::inline::emphasis::{Em, Strong};
use markdown_it::plugins::cmark::inline::image::Image;
use markdown_it::plugins::cmark::inline::link::Link;
use markdown_it::plugins::cmark::inline::newline::{Hardbreak, Softbreak};
use markdown_it::plugins::extra::linkify::Linkified;
use markdown_it::plugins::extra::strikethrough::Strikethrough;
use markdown_it::plugins::extra::tables::{
    ColumnAlignment, Table, TableBody, TableCell, TableHead, TableRow,
};
use markdown_it::plugins::html::html_block::HtmlBlock;
use markdown_it::plugins::html::html_inline::HtmlInline;
use markdown_it::Node;

/// Schemes a bare URL may use to become a link
const LINKIFY_SCHEMES: &[&str] = &["http://", "https://", "ftp://"];

/// Flatten the children of a parsed document
pub fn blocks(root: &Node, src: &str) -> Vec<Token> {
    let mut blocks = Blocks::new(src);
    for child in &root.children {
        blocks.node(child, None);
    }
    blocks.out
}

/// Flatten a list of inline nodes
pub fn inlines(nodes: &[Node], src: &str) -> Vec<Token> {
    let mut inlines = Inlines {
        src,
        out: Vec::new(),
        level: 0,
    };
    for node in nodes {
        inlines.node(node);
    }
    inlines.out
}

struct Blocks<'s> {
    src: &'s str,
    /// Byte offset of every line start
    line_starts: Vec<usize>,
    out: Vec<Token>,
    level: usize,
}

impl<'s> Blocks<'s> {
    fn new(src: &'s str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(pos, _)| pos + 1))
            .collect();
        Blocks {
            src,
            line_starts,
            out: Vec::new(),
            level: 0,
        }
    }

    fn line_of(&self, pos: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= pos).saturating_sub(1)
    }

    fn map(&self, node: &Node) -> Option<[usize; 2]> {
        let (start, end) = node.srcmap?.get_byte_offsets();
        Some([self.line_of(start), self.line_of(end) + 1])
    }

    /// Source text a node spans
    fn source(&self, node: &Node) -> &'s str {
        node.srcmap
            .and_then(|map| {
                let (start, end) = map.get_byte_offsets();
                self.src.get(start..end)
            })
            .unwrap_or_default()
    }

    fn push(&mut self, kind: &str, tag: &str, nesting: i8, map: Option<[usize; 2]>) -> &mut Token {
        if nesting < 0 {
            self.level = self.level.saturating_sub(1);
        }
        let mut token = Token::new(kind, tag, nesting);
        token.block = true;
        token.level = self.level;
        token.map = map;
        if nesting > 0 {
            self.level += 1;
        }
        self.out.push(token);
        let last = self.out.len() - 1;
        &mut self.out[last]
    }

    fn open(&mut self, kind: &str, tag: &str, markup: &str, map: Option<[usize; 2]>) -> &mut Token {
        let token = self.push(&format!("{kind}_open"), tag, 1, map);
        token.markup = markup.to_string();
        token
    }

    fn close(&mut self, kind: &str, tag: &str, markup: &str) {
        let token = self.push(&format!("{kind}_close"), tag, -1, None);
        token.markup = markup.to_string();
    }

    fn children(&mut self, node: &Node, map: Option<[usize; 2]>) {
        for child in &node.children {
            self.node(child, map);
        }
    }

    /// `inline` token for the run under `node`, or an empty one when there is none
    fn inline_of(&mut self, node: &Node, map: Option<[usize; 2]>) {
        match node.children.iter().find(|child| child.is::<InlineRun>()) {
            Some(run) => self.inline(run, map),
            None => {
                self.push("inline", "", 0, map);
            }
        }
    }

    fn inline(&mut self, run: &Node, map: Option<[usize; 2]>) {
        let source = run
            .cast::<InlineRun>()
            .map(|data| data.source.clone())
            .unwrap_or_default();
        let mut children = inlines(&run.children, self.src);
        let token = self.push("inline", "", 0, map);
        for child in children.iter_mut() {
            child.level += token.level;
        }
        token.content = source;
        token.children = children;
    }

    fn paragraph(&mut self, node: &Node, map: Option<[usize; 2]>, hidden: bool) {
        self.open("paragraph", "p", "", map).hidden = hidden;
        if node.is::<InlineRun>() {
            self.inline(node, map);
        } else {
            self.inline_of(node, map);
        }
        self.close("paragraph", "p", "");
        if let Some(close) = self.out.last_mut() {
            close.hidden = hidden;
        }
    }

    /// `parent_map` stands in for nodes without a source map of their own
    fn node(&mut self, node: &Node, parent_map: Option<[usize; 2]>) {
        let map = self.map(node).or(parent_map);

        if node.is::<Paragraph>() {
            self.paragraph(node, map, false);
        } else if node.is::<InlineRun>() {
            // a tight list item's paragraph, unwrapped by the list rule
            self.paragraph(node, map, true);
        } else if let Some(heading) = node.cast::<ATXHeading>() {
            let tag = format!("h{}", heading.level);
            let markup = "#".repeat(heading.level as usize);
            self.open("heading", &tag, &markup, map);
            self.inline_of(node, map);
            self.close("heading", &tag, &markup);
        } else if let Some(heading) = node.cast::<SetextHeader>() {
            let tag = format!("h{}", heading.level);
            let underline = self
                .source(node)
                .lines()
                .last()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            self.open("heading", &tag, &underline, map);
            self.inline_of(node, map);
            self.close("heading", &tag, &underline);
        } else if node.is::<Blockquote>() {
            self.open("blockquote", "blockquote", ">", map);
            self.children(node, map);
            self.close("blockquote", "blockquote", ">");
        } else if node.is::<Spoiler>() {
            self.open("spoiler", "blockquote", ">!", map);
            self.children(node, map);
            self.close("spoiler", "blockquote", ">!");
        } else if let Some(list) = node.cast::<BulletList>() {
            let marker = list.marker.to_string();
            self.open("bullet_list", "ul", &marker, map);
            self.items(node, &marker, None, map);
            self.close("bullet_list", "ul", &marker);
        } else if let Some(list) = node.cast::<OrderedList>() {
            let marker = list.marker.to_string();
            let start = list.start;
            let token = self.open("ordered_list", "ol", &marker, map);
            if start != 1 {
                token.attr_set("start", start.to_string());
            }
            self.items(node, &marker, Some(start), map);
            self.close("ordered_list", "ol", &marker);
        } else if let Some(code) = node.cast::<CodeBlock>() {
            let content = code.content.clone();
            self.push("code_block", "code", 0, map).content = content;
        } else if let Some(fence) = node.cast::<CodeFence>() {
            let (info, content) = (fence.info.clone(), fence.content.clone());
            let markup = fence.marker.to_string().repeat(fence.marker_len);
            let token = self.push("fence", "code", 0, map);
            token.info = info;
            token.content = content;
            token.markup = markup;
        } else if let Some(rule) = node.cast::<ThematicBreak>() {
            let markup = rule.marker.to_string().repeat(rule.marker_len);
            self.push("hr", "hr", 0, map).markup = markup;
        } else if let Some(html) = node.cast::<HtmlBlock>() {
            let content = html.content.clone();
            self.push("html_block", "", 0, map).content = content;
        } else if let Some(table) = node.cast::<Table>() {
            let alignments = table.alignments.clone();
            self.open("table", "table", "", map);
            for section in &node.children {
                let (kind, tag, cell) = if section.is::<TableHead>() {
                    ("thead", "thead", "th")
                } else if section.is::<TableBody>() {
                    ("tbody", "tbody", "td")
                } else {
                    continue;
                };
                let section_map = self.map(section).or(map);
                self.open(kind, tag, "", section_map);
                for row in section.children.iter().filter(|row| row.is::<TableRow>()) {
                    self.row(row, cell, &alignments, map);
                }
                self.close(kind, tag, "");
            }
            self.close("table", "table", "");
        } else if node.is::<Definition>() {
            // recorded in the definition table
        } else if let Some(comment) = node.cast::<LanguageComment>() {
            let (language, all) = (comment.language.clone(), comment.all);
            let content = format!("{}\n", comment.line);
            let token = self.push("language_comment", "", 0, map);
            token.attr_set("language", language);
            if all {
                token.info = "all".to_string();
            }
            token.content = content;
        } else if let Some(snippet) = node.cast::<StackSnippet>() {
            let options = snippet.options.clone();
            self.open("stack_snippet", "div", "", map).attrs = options;
            for block in &node.children {
                if let Some(lang) = block.cast::<StackSnippetLang>() {
                    let (language, code) = (lang.language.clone(), lang.code.clone());
                    let token = self.push("stack_snippet_lang", "pre", 0, map);
                    token.attr_set("language", language);
                    token.content = code;
                }
            }
            self.close("stack_snippet", "div", "");
        } else {
            log::debug!("flattening children of unhandled block node {}", node.name());
            self.children(node, map);
        }
    }

    fn items(&mut self, list: &Node, marker: &str, start: Option<u32>, map: Option<[usize; 2]>) {
        let items = list.children.iter().filter(|item| item.is::<ListItem>());
        for (index, item) in items.enumerate() {
            let item_map = self.map(item).or(map);
            let token = self.open("list_item", "li", marker, item_map);
            if let Some(start) = start {
                token.info = (start as usize + index).to_string();
            }
            self.children(item, item_map);
            self.close("list_item", "li", marker);
        }
    }

    fn row(&mut self, row: &Node, cell_tag: &str, alignments: &[ColumnAlignment], map: Option<[usize; 2]>) {
        let row_map = self.map(row).or(map);
        self.open("tr", "tr", "", row_map);
        for (index, cell) in row.children.iter().filter(|cell| cell.is::<TableCell>()).enumerate() {
            let style = match alignments.get(index) {
                Some(ColumnAlignment::Left) => Some("text-align:left"),
                Some(ColumnAlignment::Right) => Some("text-align:right"),
                Some(ColumnAlignment::Center) => Some("text-align:center"),
                _ => None,
            };
            let token = self.open(cell_tag, cell_tag, "", row_map);
            if let Some(style) = style {
                token.attr_set("style", style);
            }
            self.inline_of(cell, row_map);
            self.close(cell_tag, cell_tag, "");
        }
        self.close("tr", "tr", "");
    }
}

struct Inlines<'s> {
    src: &'s str,
    out: Vec<Token>,
    level: usize,
}

impl Inlines<'_> {
    fn push(&mut self, kind: &str, tag: &str, nesting: i8) -> &mut Token {
        if nesting < 0 {
            self.level = self.level.saturating_sub(1);
        }
        let mut token = Token::new(kind, tag, nesting);
        token.level = self.level;
        if nesting > 0 {
            self.level += 1;
        }
        self.out.push(token);
        let last = self.out.len() - 1;
        &mut self.out[last]
    }

    /// Append text, merging into a preceding text token
    fn text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        if let Some(last) = self.out.last_mut().filter(|last| last.kind == "text") {
            last.content.push_str(content);
            return;
        }
        self.push("text", "", 0).content = content.to_string();
    }

    fn wrap(&mut self, node: &Node, kind: &str, tag: &str, markup: &str) {
        self.push(&format!("{kind}_open"), tag, 1).markup = markup.to_string();
        self.children(node);
        self.push(&format!("{kind}_close"), tag, -1).markup = markup.to_string();
    }

    fn children(&mut self, node: &Node) {
        for child in &node.children {
            self.node(child);
        }
    }

    fn starts_with(&self, node: &Node, prefix: char) -> bool {
        node.srcmap
            .and_then(|map| self.src.get(map.get_byte_offsets().0..))
            .is_some_and(|rest| rest.starts_with(prefix))
    }

    /// Raw label of an image: the source between its first and last child
    fn label(&self, node: &Node) -> String {
        let first = node.children.first().and_then(|child| child.srcmap);
        let last = node.children.last().and_then(|child| child.srcmap);
        match (first, last) {
            (Some(first), Some(last)) => {
                let start = first.get_byte_offsets().0;
                let end = last.get_byte_offsets().1;
                self.src.get(start..end).unwrap_or_default().to_string()
            }
            _ => node.collect_text(),
        }
    }

    fn link(&mut self, node: &Node, href: &str, title: Option<&str>, markup: &str) {
        let token = self.push("link_open", "a", 1);
        token.attr_set("href", href);
        if let Some(title) = title {
            token.attr_set("title", title);
        }
        token.markup = markup.to_string();
        if !markup.is_empty() {
            token.info = "auto".to_string();
        }
        self.children(node);
        let token = self.push("link_close", "a", -1);
        token.markup = markup.to_string();
        if !markup.is_empty() {
            token.info = "auto".to_string();
        }
    }

    fn node(&mut self, node: &Node) {
        if let Some(text) = node.cast::<Text>() {
            self.text(&text.content);
        } else if let Some(text) = node.cast::<TextSpecial>() {
            self.text(&text.content);
        } else if node.is::<Softbreak>() {
            self.push("softbreak", "br", 0);
        } else if node.is::<Hardbreak>() {
            let info = if self.starts_with(node, '\\') { "\\\n" } else { "  \n" };
            self.push("hardbreak", "br", 0).info = info.to_string();
        } else if let Some(em) = node.cast::<Em>() {
            self.wrap(node, "em", "em", &em.marker.to_string());
        } else if let Some(strong) = node.cast::<Strong>() {
            self.wrap(node, "strong", "strong", &strong.marker.to_string().repeat(2));
        } else if let Some(strike) = node.cast::<Strikethrough>() {
            self.wrap(node, "s", "s", &strike.marker.to_string().repeat(2));
        } else if let Some(link) = node.cast::<Link>() {
            self.link(node, &link.url, link.title.as_deref(), "");
        } else if let Some(link) = node.cast::<Autolink>() {
            self.link(node, &link.url, None, "autolink");
        } else if let Some(link) = node.cast::<Linkified>() {
            let lower = link.url.to_ascii_lowercase();
            if LINKIFY_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
                self.link(node, &link.url, None, "linkify");
            } else {
                self.children(node);
            }
        } else if let Some(image) = node.cast::<Image>() {
            let children = inlines(&node.children, self.src);
            let content = self.label(node);
            let token = self.push("image", "img", 0);
            token.attr_set("src", image.url.as_str());
            token.attr_set("alt", "");
            if let Some(title) = &image.title {
                token.attr_set("title", title.as_str());
            }
            token.content = content;
            token.children = children;
        } else if let Some(code) = node.cast::<CodeInline>() {
            let markup = code.marker.to_string().repeat(code.marker_len);
            let token = self.push("code_inline", "code", 0);
            token.markup = markup;
            token.content = node.collect_text();
        } else if let Some(html) = node.cast::<HtmlInline>() {
            self.push("html_inline", "", 0).content = html.content.clone();
        } else if let Some(tag) = node.cast::<TagLink>() {
            let token = self.push("tag_link_open", "a", 1);
            token.attr_set("tagName", tag.name.as_str());
            token.attr_set("tagType", if tag.is_meta { "meta-tag" } else { "tag" });
            self.push("text", "", 0).content = tag.name.clone();
            self.push("tag_link_close", "a", -1);
        } else {
            log::debug!("flattening children of unhandled inline node {}", node.name());
            self.children(node);
        }
    }
}
