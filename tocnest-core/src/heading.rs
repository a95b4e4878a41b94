//! Heading selection: find the headings of a content region in document order

use log::{debug, warn};
use std::collections::HashSet;

use crate::dom::{Document, NodeId};
use crate::selector::{query_selector, query_selector_all, SelectorList};

/// A heading found in the document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingRecord {
    /// Value of the element's `id` attribute (empty if it has none)
    pub id: String,
    /// Trimmed text content
    pub text: String,
    /// 1 for `h1` through 6 for `h6`
    pub level: u8,
    /// Upper-case tag name, e.g. `H2`
    pub tag: String,
    /// Handle of the heading element
    pub node: NodeId,
}

/// Heading level of a tag name (`h1`..`h6`)
pub fn heading_level(tag: &str) -> Option<u8> {
    let bytes = tag.as_bytes();
    if bytes.len() == 2 && bytes[0].eq_ignore_ascii_case(&b'h') && (b'1'..=b'6').contains(&bytes[1]) {
        Some(bytes[1] - b'0')
    } else {
        None
    }
}

/// Select the headings of the first element matching `content_selector`.
///
/// Results follow document order, not the order of the selector list. A
/// missing content region or an invalid selector yields no headings.
pub fn select_headings(
    doc: &Document,
    content_selector: &str,
    heading_selector: &str,
) -> Vec<HeadingRecord> {
    select_headings_excluding(doc, content_selector, heading_selector, None)
}

/// Like [`select_headings`], dropping headings that match `ignore_selector`
pub fn select_headings_excluding(
    doc: &Document,
    content_selector: &str,
    heading_selector: &str,
    ignore_selector: Option<&str>,
) -> Vec<HeadingRecord> {
    let (content, headings) = match (
        SelectorList::parse(content_selector),
        SelectorList::parse(heading_selector),
    ) {
        (Ok(content), Ok(headings)) => (content, headings),
        (Err(err), _) | (_, Err(err)) => {
            warn!("No headings selected: {err}");
            return Vec::new();
        }
    };
    let ignore = ignore_selector
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| match SelectorList::parse(s) {
            Ok(list) => Some(list),
            Err(err) => {
                warn!("Ignore selector disabled: {err}");
                None
            }
        });

    let Some(region) = query_selector(doc, doc.root(), &content) else {
        debug!("No element matches content selector {content_selector:?}");
        return Vec::new();
    };

    query_selector_all(doc, region, &headings)
        .into_iter()
        .filter(|&node| !ignore.as_ref().is_some_and(|list| list.matches(doc, node)))
        .filter_map(|node| heading_record(doc, node))
        .collect()
}

/// Build a record for a heading element; `None` for non-heading elements
pub fn heading_record(doc: &Document, node: NodeId) -> Option<HeadingRecord> {
    let tag = doc.tag_name(node)?;
    let level = heading_level(tag)?;
    Some(HeadingRecord {
        id: doc.attr(node, "id").unwrap_or_default().to_string(),
        text: doc.text_content(node).trim().to_string(),
        level,
        tag: tag.to_ascii_uppercase(),
        node,
    })
}

/// Give every heading without an id a unique anchor derived from its text.
///
/// Writes the id onto the heading element and into the record. Returns the
/// number of ids assigned.
pub fn assign_missing_ids(doc: &mut Document, headings: &mut [HeadingRecord]) -> usize {
    let mut taken: HashSet<String> = doc
        .descendant_elements(doc.root())
        .into_iter()
        .filter_map(|n| doc.attr(n, "id").map(str::to_string))
        .collect();

    let mut assigned = 0;
    for heading in headings.iter_mut().filter(|h| h.id.is_empty()) {
        let base = match make_anchor(&heading.text) {
            anchor if anchor.is_empty() => "section".to_string(),
            anchor => anchor,
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while taken.contains(&candidate) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        doc.set_attr(heading.node, "id", candidate.clone());
        taken.insert(candidate.clone());
        heading.id = candidate;
        assigned += 1;
    }
    assigned
}

/// Create an anchor from heading text: lower case, words joined by `-`
pub fn make_anchor(text: &str) -> String {
    let mut anchor = String::with_capacity(text.len());
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            anchor.push(c);
        } else if (c.is_whitespace() || c == '-' || c == '_') && !anchor.ends_with('-') {
            anchor.push('-');
        }
    }
    anchor.trim_matches('-').to_string()
}
