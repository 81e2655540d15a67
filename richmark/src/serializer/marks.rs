//! Built-in mark serializers
//!
//! Delimiters come from the mark's `markup` when it has one. HTML-shaped markup
//! (`<b>`) closes with the matching end tag; Markdown markup (`_`, `__`, `~~`)
//! closes with itself.

use super::state::{link_destination, quote, SerializerState};
use super::{Delim, MarkSpec};
use crate::extensions::html::escape_attribute;
use crate::tree::{Mark, Node};
use std::collections::HashMap;

/// Tag name of HTML-shaped markup such as `<strong>`, `</em>` or `<br/>`
pub fn html_tag_name(markup: &str) -> Option<&str> {
    let inner = markup.strip_prefix('<')?.strip_suffix('>')?;
    let name = inner.trim_start_matches('/').trim_end_matches('/').trim();
    let valid = !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(name)
}

/// An opening tag with non-empty attributes in alphabetical order
pub fn open_tag(name: &str, attrs: &[(&str, &str)], self_closing: bool) -> String {
    let mut attrs: Vec<&(&str, &str)> = attrs.iter().filter(|(_, value)| !value.is_empty()).collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));
    let mut tag = format!("<{name}");
    for (key, value) in attrs {
        tag.push_str(&format!(" {key}=\"{}\"", escape_attribute(value)));
    }
    if self_closing {
        tag.push_str(" /");
    }
    tag.push('>');
    tag
}

fn closing_markup(markup: &str) -> String {
    match html_tag_name(markup) {
        Some(name) => format!("</{name}>"),
        None => markup.to_string(),
    }
}

fn open_or(default: &'static str) -> Delim {
    Delim::computed(move |_, mark, _, _| match mark.markup() {
        "" => default.to_string(),
        markup => markup.to_string(),
    })
}

fn close_or(default: &'static str) -> Delim {
    Delim::computed(move |_, mark, _, _| match mark.markup() {
        "" => default.to_string(),
        markup => closing_markup(markup),
    })
}

fn emphasis_like(open: &'static str, close: &'static str, mixable: bool) -> MarkSpec {
    MarkSpec {
        open: open_or(open),
        close: close_or(close),
        mixable,
        expel_enclosing_whitespace: true,
        escape: true,
    }
}

/// Backtick fence for a code span around `text`, padded when the text would
/// otherwise merge with or lose its edges
fn backticks_for(text: &str, markup: &str, open: bool) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let mut fence = if markup.starts_with('`') && markup.len() > longest {
        markup.to_string()
    } else {
        "`".repeat(longest + 1)
    };
    let pad = text.starts_with('`')
        || text.ends_with('`')
        || (text.starts_with(' ') && text.ends_with(' ') && !text.trim().is_empty());
    if pad {
        if open {
            fence.push(' ');
        } else {
            fence.insert(0, ' ');
        }
    }
    fence
}

fn code_delim(open: bool) -> Delim {
    Delim::computed(move |_, mark, parent, index| {
        let markup = mark.markup();
        if html_tag_name(markup).is_some() {
            return if open { markup.to_string() } else { closing_markup(markup) };
        }
        // a closing delimiter is requested at the node after the marked one
        let node = if open {
            parent.content.get(index)
        } else {
            index.checked_sub(1).and_then(|i| parent.content.get(i))
        };
        let text = node.and_then(|node| node.text.as_deref()).unwrap_or("");
        backticks_for(text, markup, open)
    })
}

fn link_open(_state: &mut SerializerState<'_>, mark: &Mark, _parent: &Node, _index: usize) -> String {
    match mark.markup() {
        "linkify" => String::new(),
        "autolink" => "<".to_string(),
        markup if html_tag_name(markup) == Some("a") => open_tag(
            "a",
            &[("href", mark.attr_str("href")), ("title", mark.attr_str("title"))],
            false,
        ),
        _ => "[".to_string(),
    }
}

fn link_close(state: &mut SerializerState<'_>, mark: &Mark, _parent: &Node, _index: usize) -> String {
    let href = mark.attr_str("href");
    let title = mark.attr_str("title");
    match mark.markup() {
        "linkify" => return String::new(),
        "autolink" => return ">".to_string(),
        markup if html_tag_name(markup).is_some() => return closing_markup(markup),
        "reference" => {
            let label = mark.attr_str("referenceLabel");
            let suffix = match mark.attr_str("referenceType") {
                "full" => Some(format!("][{label}]")),
                "collapsed" => Some("][]".to_string()),
                "shortcut" => Some("]".to_string()),
                _ => None,
            };
            if let (Some(suffix), false) = (suffix, label.is_empty()) {
                state.add_reference(label, href, (!title.is_empty()).then_some(title));
                return suffix;
            }
            log::debug!("reference link without a label, writing it inline");
        }
        _ => {}
    }
    let mut close = format!("]({}", link_destination(href));
    if !title.is_empty() {
        close.push(' ');
        close.push_str(&quote(title));
    }
    close.push(')');
    close
}

pub fn default_specs() -> HashMap<String, MarkSpec> {
    let mut specs = HashMap::new();
    specs.insert("em".to_string(), emphasis_like("*", "*", true));
    specs.insert("strong".to_string(), emphasis_like("**", "**", true));
    specs.insert("strike".to_string(), emphasis_like("~~", "~~", false));
    specs.insert("kbd".to_string(), emphasis_like("<kbd>", "</kbd>", false));
    specs.insert("sup".to_string(), emphasis_like("<sup>", "</sup>", false));
    specs.insert("sub".to_string(), emphasis_like("<sub>", "</sub>", false));
    specs.insert(
        "code".to_string(),
        MarkSpec {
            open: code_delim(true),
            close: code_delim(false),
            mixable: false,
            expel_enclosing_whitespace: false,
            escape: false,
        },
    );
    specs.insert(
        "link".to_string(),
        MarkSpec {
            open: Delim::computed(link_open),
            close: Delim::computed(link_close),
            mixable: false,
            expel_enclosing_whitespace: false,
            escape: true,
        },
    );
    specs
}

/// Make a caller-supplied mark spec honour `markup`
///
/// Only static delimiters can be wrapped. A computed delimiter is kept exactly as
/// given and the problem is logged.
pub fn with_markup(name: &str, spec: MarkSpec) -> MarkSpec {
    let (Delim::Static(open), Delim::Static(close)) = (spec.open.clone(), spec.close.clone()) else {
        log::error!("mark serializer '{name}' has computed delimiters; markup will not be applied");
        return spec;
    };
    MarkSpec {
        open: Delim::computed(move |_, mark, _, _| match mark.markup() {
            "" => open.clone(),
            markup => markup.to_string(),
        }),
        close: Delim::computed(move |_, mark, _, _| match mark.markup() {
            "" => close.clone(),
            markup => closing_markup(markup),
        }),
        ..spec
    }
}
