//! Rendering the TOC tree as nested list markup

use log::debug;

use crate::dom::{Document, NodeId};
use crate::nest::TocNode;
use crate::options::Options;
use crate::selector::select_first;

/// Render `root` into the first element matching `toc_selector`.
///
/// The container's previous children are replaced by a single list. Returns
/// the container, or `None` (leaving the document untouched) when no element
/// matches.
pub fn render(
    doc: &mut Document,
    toc_selector: &str,
    root: &TocNode,
    options: &Options,
) -> Option<NodeId> {
    let Some(container) = select_first(doc, toc_selector) else {
        debug!("No element matches TOC selector {toc_selector:?}");
        return None;
    };
    let list = build_list(doc, root, options);
    doc.remove_children(container);
    doc.append_child(container, list);
    Some(container)
}

/// Build the detached top-level list for `root` inside `doc`
pub fn build_list(doc: &mut Document, root: &TocNode, options: &Options) -> NodeId {
    let list = create_list(doc, false, options);
    for child in &root.children {
        append_item(doc, list, child, options);
    }
    list
}

/// Render `root` to a standalone markup fragment
pub fn render_to_string(root: &TocNode, options: &Options) -> String {
    let mut doc = Document::new();
    let list = build_list(&mut doc, root, options);
    doc.outer_html(list)
}

fn create_list(doc: &mut Document, collapsed: bool, options: &Options) -> NodeId {
    let list = doc.create_element(options.list_tag());
    doc.set_attr(list, "class", options.list_classes(collapsed));
    list
}

fn append_item(doc: &mut Document, parent_list: NodeId, node: &TocNode, options: &Options) {
    let Some(heading) = &node.heading else {
        return;
    };

    let item = doc.create_element("li");
    if !options.list_item_class.is_empty() {
        doc.set_attr(item, "class", options.list_item_class.as_str());
    }

    let link = doc.create_element("a");
    doc.set_attr(link, "href", format!("#{}", heading.id));
    doc.set_attr(link, "class", options.link_classes(&heading.tag));
    doc.set_text_content(link, &heading.text);
    doc.append_child(item, link);

    if !node.children.is_empty() {
        let collapsed = heading.level >= options.collapse_depth;
        let sublist = create_list(doc, collapsed, options);
        for child in &node.children {
            append_item(doc, sublist, child, options);
        }
        doc.append_child(item, sublist);
    }

    doc.append_child(parent_list, item);
}

/// Render `root` as a Markdown bullet list of anchor links
pub fn render_markdown(root: &TocNode) -> String {
    let mut out = String::new();
    for child in &root.children {
        append_markdown(&mut out, child, 0);
    }
    out
}

fn append_markdown(out: &mut String, node: &TocNode, indent: usize) {
    if let Some(heading) = &node.heading {
        out.push_str(&"  ".repeat(indent));
        out.push_str(&format!(
            "- [{}](#{})\n",
            escape_link_text(&heading.text),
            heading.id
        ));
    }
    for child in &node.children {
        append_markdown(out, child, indent + 1);
    }
}

/// Backslash-escape the characters that would end or nest a link label
fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
