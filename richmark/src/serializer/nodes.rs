//! Built-in node serializers

use super::marks::{html_tag_name, open_tag};
use super::state::{link_destination, quote, SerializerState};
use super::NodeHandler;
use crate::error::FormatError;
use crate::extensions::stack_snippet::SNIPPET_OPTIONS;
use crate::tree::Node;
use std::collections::HashMap;
use std::sync::Arc;

type HandlerFn = fn(&mut SerializerState<'_>, &Node, &Node, usize) -> Result<(), FormatError>;

/// `<name>` inline content `</name>` on one line, for blocks written as HTML
fn html_textblock(state: &mut SerializerState<'_>, name: &str, node: &Node) -> Result<(), FormatError> {
    state.write(&format!("<{name}>"));
    state.render_inline(node)?;
    state.write(&format!("</{name}>"));
    state.close_block(node);
    Ok(())
}

/// Like [`html_textblock`] for containers, rendering the inline content of each child
fn html_container(state: &mut SerializerState<'_>, name: &str, node: &Node) -> Result<(), FormatError> {
    state.write(&format!("<{name}>"));
    for (index, child) in node.content.iter().enumerate() {
        if index > 0 {
            state.line_break();
        }
        if child.kind == "paragraph" {
            state.render_inline(child)?;
        } else {
            state.text(&child.text_content(), true);
        }
    }
    state.write(&format!("</{name}>"));
    state.close_block(node);
    Ok(())
}

fn doc(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    state.render_content(node)
}

fn paragraph(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    if let Some(name) = html_tag_name(node.markup()) {
        return html_textblock(state, name, node);
    }
    state.render_inline(node)?;
    state.close_block(node);
    Ok(())
}

fn heading(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let markup = node.markup();
    if let Some(name) = html_tag_name(markup) {
        return html_textblock(state, name, node);
    }
    let level = node
        .attr("level")
        .and_then(|level| level.as_i64())
        .unwrap_or(1)
        .clamp(1, 6) as usize;

    let underline = match level {
        1 => Some('='),
        2 => Some('-'),
        _ => None,
    };
    let setext = underline
        .filter(|underline| !markup.is_empty() && markup.chars().all(|c| c == *underline))
        .map(|_| markup);
    match setext {
        Some(rule) if !node.content.is_empty() => {
            state.render_inline(node)?;
            state.ensure_new_line();
            state.write(rule);
        }
        _ => {
            state.write(&format!("{} ", "#".repeat(level)));
            state.render_inline(node)?;
        }
    }
    state.close_block(node);
    Ok(())
}

fn blockquote(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    if let Some(name) = html_tag_name(node.markup()) {
        return html_container(state, name, node);
    }
    state.wrap_block("> ", None, node, |state| state.render_content(node))
}

fn spoiler(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    state.wrap_block(">! ", None, node, |state| state.render_content(node))
}

fn pre(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let name = html_tag_name(node.markup()).unwrap_or("pre");
    html_container(state, name, node)
}

/// Whether the previous sibling is a list that would swallow indented code
fn follows_list(parent: &Node, index: usize) -> bool {
    index
        .checked_sub(1)
        .and_then(|previous| parent.content.get(previous))
        .is_some_and(|previous| previous.kind == "bullet_list" || previous.kind == "ordered_list")
}

fn code_block(state: &mut SerializerState<'_>, node: &Node, parent: &Node, index: usize) -> Result<(), FormatError> {
    let text = node.text_content();
    let params = node.attr_str("params");
    let markup = node.markup();

    let fenced = markup.starts_with('`') || markup.starts_with('~');
    if !fenced && !text.is_empty() && !follows_list(parent, index) {
        if !params.is_empty() {
            state.write(&format!("<!-- language: lang-{params} -->"));
            state.ensure_new_line();
        }
        return state.wrap_block("    ", None, node, |state| {
            state.text(&text, false);
            Ok(())
        });
    }

    let fence_char = if markup.starts_with('~') { '~' } else { '`' };
    let longest = text
        .lines()
        .map(|line| line.trim_start().chars().take_while(|c| *c == fence_char).count())
        .max()
        .unwrap_or(0);
    let fence = if fenced && markup.len() > longest {
        markup.to_string()
    } else {
        fence_char.to_string().repeat(longest.max(2) + 1)
    };

    state.write(&format!("{fence}{params}\n"));
    state.text(&text, false);
    state.ensure_new_line();
    state.write(&fence);
    state.close_block(node);
    Ok(())
}

fn horizontal_rule(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    match node.markup() {
        "" => state.write("---"),
        markup => state.write(markup),
    }
    state.close_block(node);
    Ok(())
}

fn bullet_list(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let marker = match node.markup() {
        marker @ ("-" | "*" | "+") => marker,
        _ => "-",
    };
    state.render_list(node, "  ", |_| format!("{marker} "))
}

fn ordered_list(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let start = node.attr("order").and_then(|order| order.as_i64()).unwrap_or(1);
    let separator = match node.markup() {
        ")" => ")",
        _ => ".",
    };
    let last = start + node.content.len().saturating_sub(1) as i64;
    let width = last.to_string().len();
    let delim = " ".repeat(width + 2);
    state.render_list(node, &delim, |index| {
        let number = (start + index as i64).to_string();
        format!("{}{number}{separator} ", " ".repeat(width - number.len()))
    })
}

fn list_item(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    state.render_content(node)
}

fn image(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let src = node.attr_str("src");
    let alt = node.attr_str("alt");
    let title = node.attr_str("title");
    let markup = node.markup();

    if html_tag_name(markup) == Some("img") {
        let attrs = [
            ("alt", alt),
            ("height", node.attr_str("height")),
            ("src", src),
            ("title", title),
            ("width", node.attr_str("width")),
        ];
        state.write(&open_tag("img", &attrs, markup.ends_with("/>")));
        return Ok(());
    }

    let escaped_alt = state.esc(alt, false);
    if markup == "reference" {
        let label = node.attr_str("referenceLabel");
        let suffix = match node.attr_str("referenceType") {
            "full" => Some(format!("[{label}]")),
            "collapsed" => Some("[]".to_string()),
            "shortcut" => Some(String::new()),
            _ => None,
        };
        if let (Some(suffix), false) = (suffix, label.is_empty()) {
            state.add_reference(label, src, (!title.is_empty()).then_some(title));
            state.write(&format!("![{escaped_alt}]{suffix}"));
            return Ok(());
        }
    }

    let mut out = format!("![{escaped_alt}]({}", link_destination(src));
    if !title.is_empty() {
        out.push(' ');
        out.push_str(&quote(title));
    }
    out.push(')');
    state.write(&out);
    Ok(())
}

fn hard_break(state: &mut SerializerState<'_>, node: &Node, parent: &Node, index: usize) -> Result<(), FormatError> {
    // a break with nothing after it cannot be written
    let followed = parent.content[index + 1..]
        .iter()
        .any(|sibling| sibling.kind != node.kind);
    if !followed {
        return Ok(());
    }
    match node.markup() {
        "  \n" => state.write("  \n"),
        markup if html_tag_name(markup).is_some() => state.write(markup),
        _ => state.write("\\\n"),
    }
    Ok(())
}

fn softbreak(state: &mut SerializerState<'_>, _node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    state.line_break();
    Ok(())
}

fn text(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let content = node.text.as_deref().unwrap_or("");
    // the visible text of a bare or angle-bracket URL is the URL itself
    if let Some(link) = node.mark_of_kind("link") {
        if matches!(link.markup(), "linkify" | "autolink") {
            state.text(link.attr_str("href"), false);
            return Ok(());
        }
    }
    let start_of_line = state.at_blank() || state.at_block_start;
    let escaped = state.esc(content, start_of_line);
    state.text(&escaped, false);
    Ok(())
}

fn html_inline(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    state.text(node.attr_str("content"), false);
    Ok(())
}

fn html_block(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    state.text(node.attr_str("content").trim_end_matches('\n'), false);
    state.close_block(node);
    Ok(())
}

fn html_block_container(
    state: &mut SerializerState<'_>,
    node: &Node,
    _parent: &Node,
    _index: usize,
) -> Result<(), FormatError> {
    state.text(node.attr_str("contentOpen"), false);
    state.close_block(node);
    state.render_content(node)?;
    state.text(node.attr_str("contentClose"), false);
    state.close_block(node);
    Ok(())
}

fn tag_link(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let prefix = match node.attr_str("tagType") {
        "meta-tag" => "meta-tag",
        _ => "tag",
    };
    state.text(&format!("[{prefix}:{}]", node.attr_str("tagName")), false);
    Ok(())
}

/// Separator cell for a header cell's `text-align` style
fn alignment_marker(cell: &Node) -> &'static str {
    let style = cell.attr_str("style");
    match style.split(':').nth(1).map(str::trim) {
        Some("left") => ":--",
        Some("right") => "--:",
        Some("center") => ":-:",
        _ => "---",
    }
}

fn table_cell(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    state.write("| ");
    state.render_inline(node)?;
    state.write(" ");
    Ok(())
}

fn table_row(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    for (index, cell) in node.content.iter().enumerate() {
        match cell.kind.as_str() {
            "table_cell" | "table_header" => table_cell(state, cell, node, index)?,
            other => {
                return Err(FormatError::SerializationError(format!(
                    "unexpected '{other}' in table row"
                )))
            }
        }
    }
    state.write("|");
    state.ensure_new_line();
    Ok(())
}

fn table_head(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let mut markers = Vec::new();
    for (index, row) in node.content.iter().enumerate() {
        table_row(state, row, node, index)?;
        markers = row.content.iter().map(alignment_marker).collect();
    }
    state.write("|");
    for marker in markers {
        state.write(&format!("{marker}|"));
    }
    state.ensure_new_line();
    Ok(())
}

fn table_body(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    for (index, row) in node.content.iter().enumerate() {
        table_row(state, row, node, index)?;
    }
    Ok(())
}

fn table(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let was_in_table = state.in_table;
    state.in_table = true;
    let mut result = Ok(());
    for (index, section) in node.content.iter().enumerate() {
        result = match section.kind.as_str() {
            "table_head" => table_head(state, section, node, index),
            "table_body" => table_body(state, section, node, index),
            other => Err(FormatError::SerializationError(format!(
                "unexpected '{other}' in table"
            ))),
        };
        if result.is_err() {
            break;
        }
    }
    state.in_table = was_in_table;
    state.close_block(node);
    result
}

fn stack_snippet(state: &mut SerializerState<'_>, node: &Node, _parent: &Node, _index: usize) -> Result<(), FormatError> {
    let mut begin = String::from("<!-- begin snippet: js");
    for name in SNIPPET_OPTIONS {
        if let Some(value) = node.attr(name).and_then(|value| value.as_str()) {
            begin.push_str(&format!(" {name}: {value}"));
        }
    }
    begin.push_str(" -->");
    state.write(&begin);
    state.close_block(node);
    state.render_content(node)?;
    state.write("<!-- end snippet -->");
    state.close_block(node);
    Ok(())
}

fn stack_snippet_lang(
    state: &mut SerializerState<'_>,
    node: &Node,
    _parent: &Node,
    _index: usize,
) -> Result<(), FormatError> {
    state.write(&format!("<!-- language: lang-{} -->", node.attr_str("language")));
    state.close_block(node);
    let code = node.text_content();
    state.wrap_block("    ", None, node, |state| {
        state.text(&code, false);
        Ok(())
    })
}

pub fn default_handlers() -> HashMap<String, NodeHandler> {
    let handlers: [(&str, HandlerFn); 27] = [
        ("doc", doc),
        ("paragraph", paragraph),
        ("heading", heading),
        ("blockquote", blockquote),
        ("spoiler", spoiler),
        ("pre", pre),
        ("code_block", code_block),
        ("horizontal_rule", horizontal_rule),
        ("bullet_list", bullet_list),
        ("ordered_list", ordered_list),
        ("list_item", list_item),
        ("image", image),
        ("hard_break", hard_break),
        ("softbreak", softbreak),
        ("text", text),
        ("html_inline", html_inline),
        ("html_block", html_block),
        ("html_block_container", html_block_container),
        ("tagLink", tag_link),
        ("table", table),
        ("table_head", table_head),
        ("table_body", table_body),
        ("table_row", table_row),
        ("table_cell", table_cell),
        ("table_header", table_cell),
        ("stack_snippet", stack_snippet),
        ("stack_snippet_lang", stack_snippet_lang),
    ];
    handlers
        .into_iter()
        .map(|(name, handler)| (name.to_string(), Arc::new(handler) as NodeHandler))
        .collect()
}
