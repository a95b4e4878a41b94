//! Active heading tracking and TOC highlighting

use crate::dom::{Document, NodeId};
use crate::options::Options;

/// Extra pixels a heading must be below the adjusted scroll position before
/// it stops counting as reached
pub const ACTIVE_SLACK: f64 = 10.0;

/// Index of the active heading given each heading's top offset.
///
/// The active heading is the one before the first heading still below
/// `scroll_top + headings_offset + ACTIVE_SLACK`, the first one when even that
/// is below, and the last one when every heading has been passed.
pub fn find_active(tops: &[f64], scroll_top: f64, headings_offset: f64) -> Option<usize> {
    let threshold = scroll_top + headings_offset + ACTIVE_SLACK;
    match tops.iter().position(|&top| top > threshold) {
        Some(index) => Some(index.saturating_sub(1)),
        None => tops.len().checked_sub(1),
    }
}

/// Mark the TOC link pointing at `heading_id` as active.
///
/// Every link and item loses its active class and every collapsible list is
/// collapsed again. Then the matching link and its list item are marked, and
/// the link's own sub-list plus all collapsible ancestor lists are expanded.
/// Returns the active link, if one points at `heading_id`.
pub fn highlight(
    doc: &mut Document,
    container: NodeId,
    heading_id: Option<&str>,
    options: &Options,
) -> Option<NodeId> {
    let elements = doc.descendant_elements(container);
    for &node in &elements {
        doc.remove_class(node, &options.active_link_class);
        doc.remove_class(node, &options.active_list_item_class);
        if doc.has_class(node, &options.collapsible_class) {
            doc.add_class(node, &options.is_collapsed_class);
        }
    }

    let href = format!("#{}", heading_id?);
    let link = elements.into_iter().find(|&node| {
        doc.tag_name(node) == Some("a") && doc.attr(node, "href") == Some(href.as_str())
    })?;

    doc.add_class(link, &options.active_link_class);
    if let Some(item) = doc.parent(link).filter(|&p| doc.tag_name(p) == Some("li")) {
        doc.add_class(item, &options.active_list_item_class);
    }
    if let Some(sublist) = doc.next_element_sibling(link) {
        if doc.has_class(sublist, &options.collapsible_class) {
            doc.remove_class(sublist, &options.is_collapsed_class);
        }
    }

    let expanded: Vec<NodeId> = doc
        .ancestors(link)
        .take_while(|&node| node != container)
        .filter(|&node| doc.has_class(node, &options.collapsible_class))
        .collect();
    for list in expanded {
        doc.remove_class(list, &options.is_collapsed_class);
    }

    Some(link)
}
