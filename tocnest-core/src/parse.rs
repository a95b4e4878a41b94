//! Lenient HTML parsing on top of the quick-xml event reader

use log::warn;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::dom::{is_void_element, Document, Element, NodeId};

/// Parse an HTML string into a [`Document`].
///
/// This is not a standards-compliant HTML5 parser. It accepts well-formed markup,
/// void elements without a closing slash, valueless attributes, mismatched or
/// stray end tags and the common named entities. Parsing never fails: on a
/// reader error the tree built so far is kept and a warning is logged.
pub fn parse_html(html: &str) -> Document {
    let mut doc = Document::new();
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut open: Vec<NodeId> = vec![doc.root()];

    loop {
        let current = *open.last().unwrap_or(&doc.root());
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = element_from(&e);
                let void = is_void_element(&element.name);
                let node = doc.create_element_from(element);
                doc.append_child(current, node);
                if !void {
                    open.push(node);
                }
            }
            Ok(Event::Empty(e)) => {
                let node = doc.create_element_from(element_from(&e));
                doc.append_child(current, node);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                close_element(&doc, &mut open, &name);
            }
            Ok(Event::Text(e)) => {
                let raw = String::from_utf8_lossy(&e);
                let text = decode_entities(&raw);
                if !text.is_empty() {
                    let node = doc.create_text(text);
                    doc.append_child(current, node);
                }
            }
            Ok(Event::CData(e)) => {
                let node = doc.create_text(String::from_utf8_lossy(&e).into_owned());
                doc.append_child(current, node);
            }
            Ok(Event::Comment(e)) => {
                let node = doc.create_comment(String::from_utf8_lossy(&e).into_owned());
                doc.append_child(current, node);
            }
            Ok(Event::DocType(e)) => {
                doc.set_doctype(String::from_utf8_lossy(&e).trim().to_string());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(
                    "HTML parsing stopped at byte {}: {err}",
                    reader.error_position()
                );
                break;
            }
        }
    }

    doc
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(&name);
    for attr in start.html_attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attr.value);
        element.set_attr(&key, decode_entities(&value));
    }
    element
}

/// Pop open elements up to and including the nearest one named `name`.
/// End tags without a matching open element are ignored.
fn close_element(doc: &Document, open: &mut Vec<NodeId>, name: &str) {
    if let Some(pos) = open
        .iter()
        .skip(1)
        .rposition(|&n| doc.tag_name(n) == Some(name))
    {
        open.truncate(pos + 1);
    }
}

/// Decode character references, leaving the raw text on malformed input
pub fn decode_entities(raw: &str) -> String {
    match unescape_with(raw, resolve_html_entity) {
        Ok(text) => text.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    let value = match entity {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "hellip" => "\u{2026}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "middot" => "\u{b7}",
        _ => return None,
    };
    Some(value)
}
