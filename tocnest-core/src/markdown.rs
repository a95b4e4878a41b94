//! Markdown to HTML conversion with heading anchors

use pulldown_cmark::{html, CowStr, Event, Options as ParserOptions, Parser, Tag, TagEnd};
use std::collections::HashSet;

use crate::heading::make_anchor;

/// Convert Markdown to HTML, giving every heading an `id`.
///
/// Explicit `{#id}` attributes are kept; other headings get an anchor made
/// from their text, suffixed `-1`, `-2` on repeats.
pub fn markdown_to_html(source: &str) -> String {
    let mut options = ParserOptions::empty();
    options.insert(ParserOptions::ENABLE_TABLES);
    options.insert(ParserOptions::ENABLE_STRIKETHROUGH);
    options.insert(ParserOptions::ENABLE_HEADING_ATTRIBUTES);

    let mut events: Vec<Event> = Parser::new_ext(source, options).collect();
    assign_heading_ids(&mut events);

    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn assign_heading_ids(events: &mut [Event]) {
    let mut taken: HashSet<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();

    for start in 0..events.len() {
        if !matches!(&events[start], Event::Start(Tag::Heading { id: None, .. })) {
            continue;
        }

        let mut text = String::new();
        for event in &events[start + 1..] {
            match event {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
        }

        let base = match make_anchor(&text) {
            anchor if anchor.is_empty() => "section".to_string(),
            anchor => anchor,
        };
        let mut anchor = base.clone();
        let mut suffix = 1;
        while taken.contains(&anchor) {
            anchor = format!("{base}-{suffix}");
            suffix += 1;
        }
        taken.insert(anchor.clone());

        if let Event::Start(Tag::Heading { id, .. }) = &mut events[start] {
            *id = Some(CowStr::from(anchor));
        }
    }
}
