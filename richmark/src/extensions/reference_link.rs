//! Annotate links and images that came from reference syntax
//!
//! By the time this pass runs, a reference link has already been resolved to a plain
//! `link_open` carrying the definition's href. To keep `[text][label]` intact through a
//! round trip, the pass searches the source of each inline run for a bracketed label
//! whose definition has the same href, and records the label and the form it was
//! written in on the token.
//!
//! The search is textual: the first matching label in the run wins, so two references
//! with equal hrefs in one paragraph both record the first label.

use super::{for_each_inline, PassContext};
use crate::options::ReferenceTable;
use crate::token::Token;
use markdown_it::common::utils::normalize_reference;

/// How a reference was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    /// `[text][label]`
    Full,
    /// `[label][]`
    Collapsed,
    /// `[label]`
    Shortcut,
}

impl ReferenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceType::Full => "full",
            ReferenceType::Collapsed => "collapsed",
            ReferenceType::Shortcut => "shortcut",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(ReferenceType::Full),
            "collapsed" => Some(ReferenceType::Collapsed),
            "shortcut" => Some(ReferenceType::Shortcut),
            _ => None,
        }
    }
}

/// One bracketed candidate found in the source
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate<'a> {
    label: &'a str,
    kind: ReferenceType,
    end: usize,
}

/// First `]` at or after `from` with at least one character since `open`, on one line
fn closing_bracket(bytes: &[u8], open: usize, from: usize) -> Option<usize> {
    let mut pos = from.max(open + 2);
    // every byte between the brackets must be on the same line
    if bytes[open + 1..pos.min(bytes.len())].contains(&b'\n') {
        return None;
    }
    while pos < bytes.len() {
        match bytes[pos] {
            b']' => return Some(pos),
            b'\n' => return None,
            _ => pos += 1,
        }
    }
    None
}

/// Match `[text]`, not followed by `(`, then an optional `[]` or `[label]`
fn candidate_at(src: &str, open: usize) -> Option<Candidate<'_>> {
    let bytes = src.as_bytes();
    let mut close = closing_bracket(bytes, open, open + 2)?;
    // a `(` after the bracket means an inline link; try a later `]` instead
    while bytes.get(close + 1) == Some(&b'(') {
        close = closing_bracket(bytes, open, close + 1)?;
    }
    let text = &src[open + 1..close];
    let after = close + 1;

    if src[after..].starts_with("[]") {
        return Some(Candidate {
            label: text,
            kind: ReferenceType::Collapsed,
            end: after + 2,
        });
    }
    if bytes.get(after) == Some(&b'[') {
        if let Some(label_close) = closing_bracket(bytes, after, after + 2) {
            return Some(Candidate {
                label: &src[after + 1..label_close],
                kind: ReferenceType::Full,
                end: label_close + 1,
            });
        }
    }
    Some(Candidate {
        label: text,
        kind: ReferenceType::Shortcut,
        end: after,
    })
}

/// Every candidate in `src`, scanning resumes after each match
fn candidates(src: &str) -> Vec<Candidate<'_>> {
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(offset) = src[pos..].find('[') {
        let open = pos + offset;
        match candidate_at(src, open) {
            Some(candidate) => {
                pos = candidate.end;
                found.push(candidate);
            }
            None => pos = open + 1,
        }
    }
    found
}

/// The first candidate whose definition points at `href`
fn find_reference<'a>(
    src: &'a str,
    href: &str,
    references: &ReferenceTable,
) -> Option<(Candidate<'a>, Option<String>)> {
    candidates(src).into_iter().find_map(|candidate| {
        let definition = references.get(&normalize_reference(candidate.label))?;
        (definition.href == href).then(|| (candidate, definition.title.clone()))
    })
}

fn set_reference_meta(token: &mut Token, candidate: &Candidate<'_>, href: &str, title: Option<&str>) {
    token.markup = "reference".to_string();
    token.meta_set("reference.label", candidate.label);
    token.meta_set("reference.type", candidate.kind.as_str());
    token.meta_set("reference.href", href);
    if let Some(title) = title {
        token.meta_set("reference.title", title);
    }
}

/// Index of the `link_close` matching the `link_open` at `open`
fn matching_close(children: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in children.iter().enumerate().skip(open) {
        match token.kind.as_str() {
            "link_open" => depth += 1,
            "link_close" => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn annotate_children(children: &mut [Token], src: &str, references: &ReferenceTable) {
    for index in 0..children.len() {
        let kind = children[index].kind.clone();
        if kind.as_str() != "link_open" && kind.as_str() != "image" {
            continue;
        }
        if kind.as_str() == "image" {
            let content = children[index].content.clone();
            annotate_children(&mut children[index].children, &content, references);
        }
        if !children[index].markup.is_empty() {
            continue;
        }
        let attr = if kind.as_str() == "image" { "src" } else { "href" };
        let Some(href) = children[index].attr_get(attr).map(str::to_string) else {
            continue;
        };
        let Some((candidate, title)) = find_reference(src, &href, references) else {
            continue;
        };
        log::trace!("annotated reference '{}' ({})", candidate.label, candidate.kind.as_str());

        set_reference_meta(&mut children[index], &candidate, &href, title.as_deref());
        if kind.as_str() == "link_open" {
            if let Some(close) = matching_close(children, index) {
                children[close].markup = "reference".to_string();
            }
        }
    }
}

pub fn annotate(mut tokens: Vec<Token>, ctx: &mut PassContext<'_>) -> Vec<Token> {
    let references = &ctx.env.references;
    if references.is_empty() {
        return tokens;
    }
    for_each_inline(&mut tokens, &mut |inline| {
        let content = inline.content.clone();
        annotate_children(&mut inline.children, &content, references);
    });
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{LinkReference, ParseOptions};
    use crate::parse_tokens;

    fn link_meta(src: &str, host: Option<&ReferenceTable>) -> Vec<(String, String, String)> {
        let tokens = parse_tokens(src, &ParseOptions::default(), host);
        tokens
            .iter()
            .filter(|t| t.kind == "inline")
            .flat_map(|t| t.children.iter())
            .filter(|t| t.kind == "link_open" || t.kind == "image")
            .map(|t| {
                (
                    t.markup.clone(),
                    t.meta_get("reference.label").unwrap_or_default().to_string(),
                    t.meta_get("reference.type").unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_candidates() {
        let found: Vec<(&str, ReferenceType)> = candidates("[a][b] [c][] [d](x)\n[e]")
            .into_iter()
            .map(|c| (c.label, c.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("b", ReferenceType::Full),
                ("c", ReferenceType::Collapsed),
                ("e", ReferenceType::Shortcut)
            ]
        );
    }

    #[test]
    fn test_candidate_runs_past_later_bracket() {
        let found: Vec<&str> = candidates("[d](x) [e]").into_iter().map(|c| c.label).collect();
        assert_eq!(found, vec!["d](x) [e"]);
    }

    #[test]
    fn test_candidates_backtrack_past_paren() {
        let found: Vec<&str> = candidates("[a](b)]").into_iter().map(|c| c.label).collect();
        assert_eq!(found, vec!["a](b)"]);
    }

    #[test]
    fn test_candidates_stay_on_one_line() {
        assert!(candidates("[a\nb]").is_empty());
    }

    #[test]
    fn test_reference_forms() {
        let src = "[text][one] [two][] [three]\n\n[one]: /1\n[two]: /2\n[three]: /3";
        assert_eq!(
            link_meta(src, None),
            vec![
                ("reference".into(), "one".into(), "full".into()),
                ("reference".into(), "two".into(), "collapsed".into()),
                ("reference".into(), "three".into(), "shortcut".into())
            ]
        );
    }

    #[test]
    fn test_inline_link_is_not_annotated() {
        let src = "[a](/1)\n\n[a]: /1";
        assert_eq!(link_meta(src, None), vec![(String::new(), String::new(), String::new())]);
    }

    #[test]
    fn test_host_reference() {
        let mut host = ReferenceTable::new();
        host.insert("foo".to_string(), LinkReference::new("/host", Some("Host")));
        let tokens = parse_tokens("[Foo]", &ParseOptions::default(), Some(&host));
        let link = &tokens[1].children[0];
        assert_eq!(link.meta_get("reference.label"), Some("Foo"));
        assert_eq!(link.meta_get("reference.title"), Some("Host"));
        assert_eq!(tokens[1].children[2].markup, "reference");
    }

    #[test]
    fn test_image_reference() {
        let src = "![alt][img]\n\n[img]: /i.png";
        assert_eq!(
            link_meta(src, None),
            vec![("reference".into(), "img".into(), "full".into())]
        );
    }
}
