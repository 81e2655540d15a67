//! The stateful Markdown writer
//!
//! Block handlers never write separators themselves. A finished block calls
//! [`SerializerState::close_block`]; the next write then flushes the owed blank line,
//! repeating the current line prefix (`delim`) so nested quotes and list items stay
//! continuous. Inline content goes through [`SerializerState::render_inline`], which
//! diffs the mark sets of consecutive nodes and emits only the delimiters that change.

use super::{MarkSpec, NodeHandler};
use crate::error::FormatError;
use crate::tree::{Mark, Node};
use markdown_it::common::utils::normalize_reference;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

static LINE_START_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+(?:[ \t]|$)|[\-*>=])").expect("valid line start pattern"));
static LINE_START_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(#{1,6})(\s|$)").expect("valid heading start pattern"));
static LINE_START_ORDERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*\d+)([.)])(\s|$)").expect("valid ordered start pattern"));
static ENTITY_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#?[A-Za-z0-9]+;)").expect("valid entity pattern"));

/// A link reference definition owed to the trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDefinition {
    pub label: String,
    pub href: String,
    pub title: Option<String>,
}

/// Blocks written verbatim, trailing blanks included
fn is_literal(kind: &str) -> bool {
    matches!(kind, "code_block" | "stack_snippet_lang" | "html_block")
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Destination as written inside `(...)` or after a definition label
pub fn link_destination(href: &str) -> String {
    if href.is_empty() || href.contains(char::is_whitespace) {
        format!("<{}>", href.replace('<', "\\<").replace('>', "\\>"))
    } else {
        href.replace('(', "\\(").replace(')', "\\)")
    }
}

/// Wrap a title in whichever quotes it does not contain
pub fn quote(text: &str) -> String {
    let (open, close) = if !text.contains('"') {
        ('"', '"')
    } else if !text.contains('\'') {
        ('\'', '\'')
    } else {
        ('(', ')')
    };
    format!("{open}{text}{close}")
}

pub struct SerializerState<'a> {
    nodes: &'a HashMap<String, NodeHandler>,
    marks: &'a HashMap<String, MarkSpec>,
    pub out: String,
    /// Prefix repeated at the start of every line, e.g. `> ` inside a quote
    pub delim: String,
    /// Kind of the block that closed last, while its separator is still owed
    closed: Option<String>,
    /// The output ends with a literal block whose trailing blanks are content
    literal_tail: bool,
    pub in_tight_list: bool,
    pub at_block_start: bool,
    /// Text is inside a table cell, where `|` must be escaped
    pub in_table: bool,
    references: BTreeMap<String, ReferenceDefinition>,
}

impl<'a> SerializerState<'a> {
    pub fn new(nodes: &'a HashMap<String, NodeHandler>, marks: &'a HashMap<String, MarkSpec>) -> Self {
        SerializerState {
            nodes,
            marks,
            out: String::new(),
            delim: String::new(),
            closed: None,
            literal_tail: false,
            in_tight_list: false,
            at_block_start: false,
            in_table: false,
            references: BTreeMap::new(),
        }
    }

    /// Write the separator owed by a closed block: a line break, then `size - 1`
    /// prefix-only lines
    pub fn flush_close(&mut self, size: usize) {
        if self.closed.take().is_none() {
            return;
        }
        self.literal_tail = false;
        if !self.at_blank() {
            self.out.push('\n');
        }
        if size > 1 {
            let delim_min = self.delim.trim_end().to_string();
            for _ in 1..size {
                self.out.push_str(&delim_min);
                self.out.push('\n');
            }
        }
    }

    pub fn at_blank(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    pub fn ensure_new_line(&mut self) {
        if !self.at_blank() {
            self.out.push('\n');
        }
    }

    /// Write raw content, flushing separators and the line prefix first
    pub fn write(&mut self, content: &str) {
        self.flush_close(2);
        if !self.delim.is_empty() && self.at_blank() {
            let delim = self.delim.clone();
            self.out.push_str(&delim);
        }
        self.out.push_str(content);
    }

    /// End the current line inside inline content; the next write adds the prefix
    pub fn line_break(&mut self) {
        self.write("");
        self.out.push('\n');
    }

    /// Mark `node` finished; trailing spaces and tabs on its last line are dropped
    pub fn close_block(&mut self, node: &Node) {
        if is_literal(&node.kind) {
            self.literal_tail = true;
        } else if !self.literal_tail {
            self.trim_line_end();
        }
        self.closed = Some(node.kind.clone());
    }

    fn trim_line_end(&mut self) {
        let end = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(end);
    }

    /// Render `f` with `delim` added to the line prefix; `first_delim` replaces it on
    /// the first line (a list marker, for instance)
    pub fn wrap_block<F>(
        &mut self,
        delim: &str,
        first_delim: Option<&str>,
        node: &Node,
        f: F,
    ) -> Result<(), FormatError>
    where
        F: FnOnce(&mut Self) -> Result<(), FormatError>,
    {
        let old = self.delim.clone();
        self.write(first_delim.unwrap_or(delim));
        self.delim.push_str(delim);
        let result = f(self);
        self.delim = old;
        self.close_block(node);
        result
    }

    /// Write text line by line, escaping it unless `escape` is false
    pub fn text(&mut self, text: &str, escape: bool) {
        let lines: Vec<&str> = text.split('\n').collect();
        let last = lines.len() - 1;
        for (i, line) in lines.iter().enumerate() {
            self.write("");
            // a literal `!` right before a bracket would turn a link into an image
            if !escape && line.starts_with('[') && self.out.ends_with('!') && !self.out.ends_with("\\!") {
                self.out.pop();
                self.out.push_str("\\!");
            }
            if escape {
                let escaped = self.esc(line, self.at_block_start);
                self.out.push_str(&escaped);
            } else {
                self.out.push_str(line);
            }
            if i != last {
                self.out.push('\n');
            }
        }
    }

    /// Backslash-escape Markdown syntax characters in plain text
    pub fn esc(&self, text: &str, start_of_line: bool) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        for (i, &c) in chars.iter().enumerate() {
            match c {
                '`' | '*' | '\\' | '~' | '[' | ']' | '<' | '>' => out.push('\\'),
                '_' => {
                    let intraword = i > 0
                        && i + 1 < chars.len()
                        && is_word(chars[i - 1])
                        && is_word(chars[i + 1]);
                    if !intraword {
                        out.push('\\');
                    }
                }
                '|' if self.in_table => out.push('\\'),
                _ => {}
            }
            out.push(c);
        }
        let mut out = ENTITY_LIKE_RE.replace_all(&out, "\\&$1").into_owned();
        if start_of_line {
            out = LINE_START_MARKER_RE.replace(&out, "\\$1").into_owned();
            out = LINE_START_HEADING_RE.replace(&out, "$1\\$2$3").into_owned();
            out = LINE_START_ORDERED_RE.replace(&out, "$1\\$2$3").into_owned();
        }
        out
    }

    pub fn render(&mut self, node: &Node, parent: &Node, index: usize) -> Result<(), FormatError> {
        let nodes = self.nodes;
        let Some(handler) = nodes.get(&node.kind) else {
            log::error!("no serializer for node type '{}'", node.kind);
            return Err(FormatError::UnknownNodeType(node.kind.clone()));
        };
        handler(self, node, parent, index)
    }

    pub fn render_content(&mut self, parent: &Node) -> Result<(), FormatError> {
        for (index, child) in parent.content.iter().enumerate() {
            self.render(child, parent, index)?;
        }
        Ok(())
    }

    fn mark_spec(&self, mark: &Mark) -> Result<&'a MarkSpec, FormatError> {
        let marks = self.marks;
        marks.get(&mark.kind).ok_or_else(|| {
            log::error!("no serializer for mark type '{}'", mark.kind);
            FormatError::UnknownMarkType(mark.kind.clone())
        })
    }

    pub fn mark_string(
        &mut self,
        mark: &Mark,
        open: bool,
        parent: &Node,
        index: usize,
    ) -> Result<String, FormatError> {
        let spec = self.mark_spec(mark)?;
        let delim = if open { &spec.open } else { &spec.close };
        Ok(delim.render(self, mark, parent, index))
    }

    fn expels(&self, mark: &Mark) -> bool {
        self.mark_spec(mark)
            .map(|spec| spec.expel_enclosing_whitespace)
            .unwrap_or(false)
    }

    fn mixable(&self, mark: &Mark) -> bool {
        self.mark_spec(mark).map(|spec| spec.mixable).unwrap_or(false)
    }

    /// Render the inline children of a textblock
    pub fn render_inline(&mut self, parent: &Node) -> Result<(), FormatError> {
        self.at_block_start = true;
        let mut active: Vec<Mark> = Vec::new();
        let mut trailing = String::new();
        for index in 0..=parent.content.len() {
            let node = parent.content.get(index).cloned();
            self.progress(parent, node, index, &mut active, &mut trailing)?;
        }
        self.at_block_start = false;
        Ok(())
    }

    fn progress(
        &mut self,
        parent: &Node,
        mut node: Option<Node>,
        index: usize,
        active: &mut Vec<Mark>,
        trailing: &mut String,
    ) -> Result<(), FormatError> {
        let count = parent.content.len();
        let mut marks: Vec<Mark> = node.as_ref().map(|n| n.marks.clone()).unwrap_or_default();

        // a break that ends a mark's run would leave the closing delimiter stranded
        if node.as_ref().is_some_and(|n| n.kind == "hard_break") {
            let next = parent.content.get(index + 1);
            marks.retain(|mark| {
                next.is_some_and(|next| {
                    next.has_mark(mark)
                        && (!next.is_text()
                            || next.text.as_deref().is_some_and(|t| t.trim() != ""))
                })
            });
        }

        let mut leading = std::mem::take(trailing);

        // whitespace just inside an opening delimiter moves outside it
        let lead_split = node.as_ref().filter(|n| n.is_text()).and_then(|n| {
            let expel = marks
                .iter()
                .any(|mark| self.expels(mark) && !active.contains(mark));
            let text = n.text.as_deref().unwrap_or("");
            let rest = text.trim_start();
            (expel && rest.len() < text.len())
                .then(|| (text[..text.len() - rest.len()].to_string(), rest.to_string()))
        });
        if let Some((lead, rest)) = lead_split {
            leading.push_str(&lead);
            if rest.is_empty() {
                node = None;
                marks = active.clone();
            } else {
                node = node.map(|n| n.with_text(rest));
            }
        }

        // and the same for whitespace before a closing delimiter
        let trail_split = node.as_ref().filter(|n| n.is_text()).and_then(|n| {
            let expel = marks.iter().any(|mark| {
                self.expels(mark)
                    && (index + 1 == count || !parent.content[index + 1].has_mark(mark))
            });
            let text = n.text.as_deref().unwrap_or("");
            let rest = text.trim_end();
            (expel && rest.len() < text.len())
                .then(|| (text[rest.len()..].to_string(), rest.to_string()))
        });
        if let Some((trail, rest)) = trail_split {
            *trailing = trail;
            if rest.is_empty() {
                node = None;
                marks = active.clone();
            } else {
                node = node.map(|n| n.with_text(rest));
            }
        }

        let inner = marks.last().cloned();
        let no_escape = match &inner {
            Some(mark) => !self.mark_spec(mark)?.escape,
            None => false,
        };
        let len = marks.len() - usize::from(no_escape);

        // mixable marks (em, strong) may close in any order: line the new set up with
        // the active one so shared marks stay open
        let mut i = 0;
        'outer: while i < len {
            let mark = marks[i].clone();
            if !self.mixable(&mark) {
                break;
            }
            for (j, other) in active.iter().enumerate() {
                if !self.mixable(other) {
                    break;
                }
                if mark == *other {
                    let mut reordered = Vec::with_capacity(len);
                    if i > j {
                        reordered.extend_from_slice(&marks[..j]);
                        reordered.push(mark.clone());
                        reordered.extend_from_slice(&marks[j..i]);
                        reordered.extend_from_slice(&marks[i + 1..len]);
                        marks = reordered;
                    } else if j > i {
                        reordered.extend_from_slice(&marks[..i]);
                        reordered.extend_from_slice(&marks[i + 1..j]);
                        reordered.push(mark.clone());
                        reordered.extend_from_slice(&marks[j..len]);
                        marks = reordered;
                    }
                    i += 1;
                    continue 'outer;
                }
            }
            i += 1;
        }

        let mut keep = 0;
        while keep < active.len().min(len) && marks[keep] == active[keep] {
            keep += 1;
        }
        while active.len() > keep {
            if let Some(mark) = active.pop() {
                let close = self.mark_string(&mark, false, parent, index)?;
                self.text(&close, false);
            }
        }

        if !leading.is_empty() {
            self.text(&leading, true);
        }

        if let Some(node) = node {
            while active.len() < len {
                let add = marks[active.len()].clone();
                let open = self.mark_string(&add, true, parent, index)?;
                active.push(add);
                self.text(&open, false);
                self.at_block_start = false;
            }
            match (&inner, no_escape && node.is_text()) {
                (Some(inner), true) => {
                    let open = self.mark_string(inner, true, parent, index)?;
                    let close = self.mark_string(inner, false, parent, index + 1)?;
                    let body = node.text.as_deref().unwrap_or("");
                    let body = if self.in_table {
                        body.replace('|', "\\|")
                    } else {
                        body.to_string()
                    };
                    self.text(&format!("{open}{body}{close}"), false);
                }
                _ => self.render(&node, parent, index)?,
            }
            self.at_block_start = false;
        }
        Ok(())
    }

    /// Render a list, one `wrap_block` per item
    pub fn render_list<F>(&mut self, node: &Node, delim: &str, first_delim: F) -> Result<(), FormatError>
    where
        F: Fn(usize) -> String,
    {
        if self.closed.as_deref() == Some(node.kind.as_str()) {
            self.flush_close(3);
        } else if self.in_tight_list {
            self.flush_close(1);
        }

        let tight = node.attr("tight").and_then(|tight| tight.as_bool()).unwrap_or(false);
        let previous = self.in_tight_list;
        self.in_tight_list = tight;
        for (index, child) in node.content.iter().enumerate() {
            if index > 0 && tight {
                self.flush_close(1);
            }
            let first = first_delim(index);
            self.wrap_block(delim, Some(&first), node, |state| state.render(child, node, index))?;
        }
        self.in_tight_list = previous;
        Ok(())
    }

    /// Queue a definition for the trailer; the first one for a label wins
    pub fn add_reference(&mut self, label: &str, href: &str, title: Option<&str>) {
        self.references
            .entry(normalize_reference(label))
            .or_insert_with(|| ReferenceDefinition {
                label: label.to_string(),
                href: href.to_string(),
                title: title.map(str::to_string),
            });
    }

    /// The output with the reference trailer appended
    pub fn finish(self) -> String {
        let mut out = self.out;
        out.truncate(out.trim_end_matches('\n').len());
        if !self.literal_tail {
            out.truncate(out.trim_end_matches([' ', '\t']).len());
        }
        if self.references.is_empty() {
            return out;
        }
        let mut definitions: Vec<ReferenceDefinition> = self.references.into_values().collect();
        definitions.sort_by(|a, b| a.label.cmp(&b.label));

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        let lines: Vec<String> = definitions
            .iter()
            .map(|definition| {
                let mut line = format!(
                    "[{}]: {}",
                    definition.label,
                    link_destination(&definition.href)
                );
                if let Some(title) = &definition.title {
                    line.push(' ');
                    line.push_str(&quote(title));
                }
                line
            })
            .collect();
        out.push_str(&lines.join("\n"));
        out
    }
}
