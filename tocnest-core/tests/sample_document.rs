// Pipeline tests against a fixed sample page
use anyhow::Result;
use std::fs;
use tocnest_core::active::{find_active, highlight};
use tocnest_core::{
    nest_headings, render, render_markdown, render_to_string, select_headings, Document, Options,
};

const ALL_HEADINGS: [&str; 19] = [
    "Bacon",
    "Brisket",
    "Flank",
    "Pork",
    "Capicola",
    "Drumstick",
    "Pastrami",
    "Meatloaf",
    "Sirloin",
    "Pork belly",
    "Bresaola shankle",
    "Cow pancetta",
    "Turducken",
    "Alcatra",
    "Chuck",
    "Spare ribs",
    "Swine venison chicken",
    "Landjaeger",
    "Kevin capicola shank",
];

fn sample() -> Result<Document> {
    let html = fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/sample.html"))?;
    Ok(Document::parse(&html))
}

/// Reference markup with the whitespace between tags removed
fn reference() -> Result<String> {
    let html = fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/rendered.html"))?;
    Ok(html.lines().map(str::trim).collect())
}

#[test]
fn test_default_selector_returns_all_headings() -> Result<()> {
    let doc = sample()?;
    let options = Options::default();
    let headings = select_headings(&doc, &options.content_selector, &options.heading_selector);
    let texts: Vec<_> = headings.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(texts, ALL_HEADINGS);
    Ok(())
}

#[test]
fn test_custom_selector_returns_subset_in_order() -> Result<()> {
    let doc = sample()?;
    let headings = select_headings(&doc, ".js-toc-content", "h2, h1");
    let texts: Vec<_> = headings.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Bacon",
            "Brisket",
            "Flank",
            "Capicola",
            "Sirloin",
            "Pork belly",
            "Bresaola shankle",
            "Cow pancetta",
            "Swine venison chicken",
            "Landjaeger",
        ]
    );
    Ok(())
}

#[test]
fn test_nested_structure() -> Result<()> {
    let doc = sample()?;
    let headings = select_headings(&doc, ".js-toc-content", "h1, h2, h3");
    let nested = nest_headings(&headings);

    let top: Vec<_> = nested
        .root
        .children
        .iter()
        .filter_map(|n| n.heading.as_ref().map(|h| h.text.as_str()))
        .collect();
    assert_eq!(top, vec!["Bacon", "Sirloin", "Swine venison chicken"]);
    assert_eq!(nested.root.children[0].children.len(), 3);
    assert_eq!(nested.root.children[1].children[2].children.len(), 4);
    assert_eq!(nested.root.len(), 19);
    assert_eq!(nested.root.depth(), 3);
    assert_eq!(nested.headings, headings);
    Ok(())
}

#[test]
fn test_render_matches_reference() -> Result<()> {
    let mut doc = sample()?;
    let options = Options::default();
    let headings = select_headings(&doc, &options.content_selector, &options.heading_selector);
    let nested = nest_headings(&headings);

    let container = render(&mut doc, &options.toc_selector, &nested.root, &options)
        .expect("sample has a TOC container");
    let markup = doc.inner_html(container);
    assert!(!markup.is_empty());
    assert!(reference()?.contains(&markup));
    assert_eq!(markup, render_to_string(&nested.root, &options));
    Ok(())
}

#[test]
fn test_render_twice_is_identical() -> Result<()> {
    let mut doc = sample()?;
    let options = Options::default();
    let headings = select_headings(&doc, &options.content_selector, &options.heading_selector);
    let nested = nest_headings(&headings);

    let first = render(&mut doc, ".js-toc", &nested.root, &options).map(|c| doc.inner_html(c));
    let second = render(&mut doc, ".js-toc", &nested.root, &options).map(|c| doc.inner_html(c));
    assert!(first.is_some());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_markdown_outline() -> Result<()> {
    let doc = sample()?;
    let headings = select_headings(&doc, ".js-toc-content", "h1");
    let outline = render_markdown(&nest_headings(&headings).root);
    assert_eq!(
        outline,
        "- [Bacon](#bacon)\n- [Sirloin](#sirloin)\n- [Swine venison chicken](#swine-venison-chicken)\n"
    );
    Ok(())
}

#[test]
fn test_highlight_on_sample() -> Result<()> {
    let mut doc = sample()?;
    let options = Options::default();
    let headings = select_headings(&doc, &options.content_selector, &options.heading_selector);
    let nested = nest_headings(&headings);
    let container = render(&mut doc, ".js-toc", &nested.root, &options).expect("container");

    // One heading every 100px
    let tops: Vec<f64> = (0..headings.len()).map(|i| i as f64 * 100.0).collect();
    let active = find_active(&tops, 1050.0, options.headings_offset).expect("active heading");
    assert_eq!(headings[active].text, "Bresaola shankle");

    let link = highlight(&mut doc, container, Some(headings[active].id.as_str()), &options)
        .expect("active link");
    assert_eq!(doc.text_content(link), "Bresaola shankle");
    let open_lists = doc
        .descendant_elements(container)
        .into_iter()
        .filter(|&n| doc.has_class(n, "is-collapsible") && !doc.has_class(n, "is-collapsed"))
        .count();
    assert_eq!(open_lists, 1);
    Ok(())
}
