//! CSS-like selector lists: parsing, matching and querying

use anyhow::{bail, Result};
use log::warn;

use crate::dom::{Document, NodeId};

/// A comma separated list of selector chains (`"h1, h2, .intro > h3"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    groups: Vec<Vec<SelectorPart>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists(String),
    Equals(String, String),
    Prefix(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorPart {
    compound: Compound,
    // Relation to the part on the left
    combinator: Option<Combinator>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self> {
        let mut groups = Vec::new();
        for group in split_groups(input) {
            groups.push(parse_chain(group)?);
        }
        if groups.is_empty() {
            bail!("empty selector: {input:?}");
        }
        Ok(Self { groups })
    }

    /// True if the element matches any selector in the list
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.element(node).is_some() && self.groups.iter().any(|chain| matches_chain(doc, node, chain))
    }
}

/// All elements below `scope` matching the selector list, in document order
pub fn query_selector_all(doc: &Document, scope: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
    doc.descendant_elements(scope)
        .into_iter()
        .filter(|&n| selectors.matches(doc, n))
        .collect()
}

/// First element below `scope` matching the selector list
pub fn query_selector(doc: &Document, scope: NodeId, selectors: &SelectorList) -> Option<NodeId> {
    doc.descendant_elements(scope)
        .into_iter()
        .find(|&n| selectors.matches(doc, n))
}

/// Convenience lookup from the document root; an invalid selector finds nothing
pub fn select_first(doc: &Document, selector: &str) -> Option<NodeId> {
    match SelectorList::parse(selector) {
        Ok(list) => query_selector(doc, doc.root(), &list),
        Err(err) => {
            warn!("Ignoring selector: {err}");
            None
        }
    }
}

/// Convenience lookup from the document root; an invalid selector finds nothing
pub fn select_all(doc: &Document, selector: &str) -> Vec<NodeId> {
    match SelectorList::parse(selector) {
        Ok(list) => query_selector_all(doc, doc.root(), &list),
        Err(err) => {
            warn!("Ignoring selector: {err}");
            Vec::new()
        }
    }
}

fn split_groups(input: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                groups.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&input[start..]);
    groups.into_iter().map(str::trim).filter(|g| !g.is_empty()).collect()
}

fn parse_chain(group: &str) -> Result<Vec<SelectorPart>> {
    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut buffer = String::new();
    let mut in_brackets = false;

    let flush = |buffer: &mut String,
                     parts: &mut Vec<SelectorPart>,
                     pending: &mut Option<Combinator>|
     -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let compound = parse_compound(buffer)?;
        let combinator = if parts.is_empty() {
            if pending.is_some() {
                bail!("selector starts with a combinator: {group:?}");
            }
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(SelectorPart {
            compound,
            combinator,
        });
        buffer.clear();
        Ok(())
    };

    for c in group.chars() {
        match c {
            '[' => {
                in_brackets = true;
                buffer.push(c);
            }
            ']' => {
                in_brackets = false;
                buffer.push(c);
            }
            c if in_brackets => buffer.push(c),
            '>' => {
                flush(&mut buffer, &mut parts, &mut pending)?;
                if parts.is_empty() || pending.is_some() {
                    bail!("misplaced '>' in selector: {group:?}");
                }
                pending = Some(Combinator::Child);
            }
            c if c.is_whitespace() => flush(&mut buffer, &mut parts, &mut pending)?,
            c => buffer.push(c),
        }
    }
    flush(&mut buffer, &mut parts, &mut pending)?;

    if parts.is_empty() || pending.is_some() {
        bail!("incomplete selector: {group:?}");
    }
    Ok(parts)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

fn parse_compound(input: &str) -> Result<Compound> {
    let chars: Vec<char> = input.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    if chars.first() == Some(&'*') {
        i = 1;
    } else if chars.first().is_some_and(|&c| is_ident_char(c)) {
        let (tag, next) = take_ident(&chars, 0);
        compound.tag = Some(tag.to_ascii_lowercase());
        i = next;
    }

    while i < chars.len() {
        match chars[i] {
            '#' | '.' => {
                let (ident, next) = take_ident(&chars, i + 1);
                if ident.is_empty() {
                    bail!("missing name after {:?} in selector {input:?}", chars[i]);
                }
                if chars[i] == '#' {
                    compound.id = Some(ident);
                } else {
                    compound.classes.push(ident);
                }
                i = next;
            }
            '[' => {
                let Some(len) = chars[i..].iter().position(|&c| c == ']') else {
                    bail!("unterminated attribute selector: {input:?}");
                };
                let body: String = chars[i + 1..i + len].iter().collect();
                compound.attrs.push(parse_attr_condition(&body)?);
                i += len + 1;
            }
            other => bail!("unsupported character {other:?} in selector {input:?}"),
        }
    }

    Ok(compound)
}

fn parse_attr_condition(body: &str) -> Result<AttrCondition> {
    let unquote = |v: &str| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
    if let Some((name, value)) = body.split_once("^=") {
        return Ok(AttrCondition::Prefix(name.trim().to_ascii_lowercase(), unquote(value)));
    }
    if let Some((name, value)) = body.split_once('=') {
        return Ok(AttrCondition::Equals(name.trim().to_ascii_lowercase(), unquote(value)));
    }
    let name = body.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        bail!("invalid attribute selector: [{body}]");
    }
    Ok(AttrCondition::Exists(name.to_ascii_lowercase()))
}

fn matches_compound(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if element.name != *tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if element.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|c| element.has_class(c)) {
        return false;
    }
    compound.attrs.iter().all(|cond| match cond {
        AttrCondition::Exists(name) => element.attr(name).is_some(),
        AttrCondition::Equals(name, value) => element.attr(name) == Some(value.as_str()),
        AttrCondition::Prefix(name, value) => {
            element.attr(name).is_some_and(|v| v.starts_with(value.as_str()))
        }
    })
}

fn matches_chain(doc: &Document, node: NodeId, parts: &[SelectorPart]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    if !matches_compound(doc, node, &last.compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match last.combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => doc
            .parent(node)
            .is_some_and(|parent| matches_chain(doc, parent, rest)),
        // Backtracks over every matching ancestor so `a b > c` finds the right `b`
        Combinator::Descendant => doc
            .ancestors(node)
            .any(|ancestor| matches_chain(doc, ancestor, rest)),
    }
}
