//! Lifecycle tests for the table of contents controller
//!
//! These drive a page the way a browser would: listeners, scroll positions,
//! clicks and the passage of time.

use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::fs;
use std::rc::Rc;
use tocnest_core::{
    nest_headings, render_to_string, select_headings, Document, NodeId, Options,
};
use tocnest_runtime::{EventKind, Hooks, Page, State, TableOfContents};

/// Sample page with an estimated layout, 100px per block
fn sample_page() -> Result<Page> {
    let html = fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../tocnest-core/tests/data/sample.html"
    ))?;
    let page = Page::from_html(&html);
    page.layout_flow(100.0);
    Ok(page)
}

fn heading_top(page: &Page, id: &str) -> f64 {
    let node = page
        .with_document(|doc| doc.get_element_by_id(id))
        .expect("heading exists");
    page.offset_top(node)
}

/// The TOC link pointing at `#id`
fn toc_link(page: &Page, toc: &TableOfContents, id: &str) -> NodeId {
    let container = toc.container().expect("TOC rendered");
    let href = format!("#{id}");
    page.with_document(|doc| {
        doc.descendant_elements(container)
            .into_iter()
            .find(|&n| doc.attr(n, "href") == Some(href.as_str()))
    })
    .expect("link exists")
}

fn has_class(page: &Page, node: NodeId, class: &str) -> bool {
    page.with_document(|doc| doc.has_class(node, class))
}

fn active_id(toc: &TableOfContents) -> Option<String> {
    toc.active_heading().map(|h| h.id)
}

#[test]
fn test_init_adds_four_listeners() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    assert_eq!(toc.state(), State::Uninitialized);

    toc.init(Options::default());
    assert_eq!(toc.state(), State::Active);
    assert_eq!(page.listener_count(), 4);
    assert_eq!(
        page.listener_kinds(),
        vec![
            EventKind::Scroll,
            EventKind::Resize,
            EventKind::Click,
            EventKind::Click
        ]
    );
    Ok(())
}

#[test]
fn test_init_without_smooth_scroll_adds_three() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options {
        scroll_smooth: false,
        ..Default::default()
    });
    assert_eq!(page.listener_count(), 3);
    assert_eq!(page.listener_count_for(EventKind::Click), 1);
    Ok(())
}

#[test]
fn test_destroy_removes_exactly_its_listeners() -> Result<()> {
    let page = sample_page()?;
    let user_clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&user_clicks);
    let _user = page.subscribe(
        EventKind::Click,
        Rc::new(move |_: &tocnest_runtime::Event| counter.set(counter.get() + 1)),
    );
    let baseline = page.listener_kinds();

    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());
    assert_eq!(page.listener_count(), baseline.len() + 4);

    toc.destroy();
    assert_eq!(toc.state(), State::Destroyed);
    assert_eq!(page.listener_kinds(), baseline);

    let container = page
        .with_document(|doc| tocnest_core::selector::select_first(doc, ".js-toc"))
        .expect("container");
    assert_eq!(page.with_document(|doc| doc.inner_html(container)), "");

    // The page's own listener still works
    page.click(container);
    assert_eq!(user_clicks.get(), 1);
    Ok(())
}

#[test]
fn test_destroy_is_idempotent() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);

    toc.destroy();
    assert_eq!(toc.state(), State::Uninitialized);

    toc.init(Options::default());
    toc.destroy();
    toc.destroy();
    assert_eq!(toc.state(), State::Destroyed);
    assert_eq!(page.listener_count(), 0);
    assert_eq!(page.pending_timers(), 0);

    // Destroyed is not terminal
    toc.init(Options::default());
    assert_eq!(toc.state(), State::Active);
    assert_eq!(page.listener_count(), 4);
    Ok(())
}

#[test]
fn test_init_twice_replaces_session() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());
    toc.init(Options {
        heading_selector: "h1".into(),
        ..Default::default()
    });
    assert_eq!(page.listener_count(), 4);
    assert_eq!(toc.headings().len(), 3);
    Ok(())
}

#[test]
fn test_renders_sample_toc() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());

    let headings = toc.headings();
    assert_eq!(headings.len(), 19);
    assert_eq!(headings[0].text, "Bacon");

    let expected = page.with_document(|doc| {
        let headings = select_headings(doc, ".js-toc-content", "h1, h2, h3");
        render_to_string(&nest_headings(&headings).root, &Options::default())
    });
    let container = toc.container().expect("container");
    let rendered = page.with_document(|doc| doc.inner_html(container));
    // The initial pass marks the first heading active
    assert!(rendered.contains("is-active-link"));
    assert_eq!(
        rendered
            .replace(" is-active-link", "")
            .replace(" is-active-li", "")
            .replace("toc-list is-collapsible\"", "toc-list is-collapsible is-collapsed\""),
        expected
    );
    assert_eq!(active_id(&toc).as_deref(), Some("bacon"));
    Ok(())
}

#[test]
fn test_refresh_only_when_active() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.refresh();
    assert_eq!(toc.state(), State::Uninitialized);
    assert!(toc.headings().is_empty());

    toc.init(Options::default());
    page.with_document_mut(|doc| {
        let content = tocnest_core::selector::select_first(doc, ".js-toc-content")
            .expect("content");
        let heading = doc.create_element("h2");
        doc.set_text_content(heading, "Tri tip");
        doc.append_child(content, heading);
    });
    toc.refresh();
    assert_eq!(page.listener_count(), 4);
    let headings = toc.headings();
    assert_eq!(headings.len(), 20);
    assert_eq!(headings[19].id, "tri-tip");
    toc_link(&page, &toc, "tri-tip");

    toc.destroy();
    toc.refresh();
    assert!(toc.headings().is_empty());
    Ok(())
}

#[test]
fn test_scroll_highlights_and_expands() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());

    page.scroll_to(heading_top(&page, "pastrami"));
    assert_eq!(active_id(&toc).as_deref(), Some("pastrami"));

    let pastrami = toc_link(&page, &toc, "pastrami");
    assert!(has_class(&page, pastrami, "is-active-link"));
    let bacon = toc_link(&page, &toc, "bacon");
    assert!(!has_class(&page, bacon, "is-active-link"));

    let container = toc.container().expect("container");
    let open: Vec<String> = page.with_document(|doc| {
        doc.descendant_elements(container)
            .into_iter()
            .filter(|&n| doc.has_class(n, "is-collapsible") && !doc.has_class(n, "is-collapsed"))
            .filter_map(|list| doc.parent(list))
            .filter_map(|li| doc.children(li).first().copied())
            .map(|link| doc.text_content(link))
            .collect()
    });
    assert_eq!(open, vec!["Bacon", "Capicola"]);
    Ok(())
}

#[test]
fn test_throttle_defers_trailing_update() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());

    page.scroll_to(heading_top(&page, "flank"));
    assert_eq!(active_id(&toc).as_deref(), Some("flank"));

    page.advance_time(10);
    page.scroll_to(heading_top(&page, "sirloin"));
    assert_eq!(active_id(&toc).as_deref(), Some("flank"));

    page.advance_time(50);
    assert_eq!(active_id(&toc).as_deref(), Some("sirloin"));
    Ok(())
}

#[test]
fn test_resize_updates_highlight() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());
    assert_eq!(active_id(&toc).as_deref(), Some("bacon"));

    // Everything reflows above the fold
    for heading in toc.headings() {
        page.set_offset_top(heading.node, 0.0);
    }
    page.resize(640.0, 480.0);
    assert_eq!(active_id(&toc).as_deref(), Some("kevin-capicola-shank"));
    Ok(())
}

#[test]
fn test_smooth_scroll_click() -> Result<()> {
    let page = sample_page()?;
    let clicked = Rc::new(RefCell::new(Vec::new()));
    let scroll_ends = Rc::new(Cell::new(0));
    let hooks = Hooks {
        on_click: Some({
            let clicked = Rc::clone(&clicked);
            Rc::new(move |node: NodeId| clicked.borrow_mut().push(node))
        }),
        on_scroll_end: Some({
            let scroll_ends = Rc::clone(&scroll_ends);
            Rc::new(move || scroll_ends.set(scroll_ends.get() + 1))
        }),
        ..Default::default()
    };

    let mut toc = TableOfContents::new(&page);
    toc.init_with_hooks(Options::default(), hooks);

    let link = toc_link(&page, &toc, "sirloin");
    page.click(link);
    assert_eq!(*clicked.borrow(), vec![link]);
    assert!(!toc.is_highlighting());

    // Mid-animation the highlight stays put
    page.advance_time(200);
    let midway = page.scroll_top();
    assert!(midway > 0.0 && midway < heading_top(&page, "sirloin"));
    assert_eq!(active_id(&toc).as_deref(), Some("bacon"));

    page.flush_timers()?;
    assert_eq!(page.scroll_top(), heading_top(&page, "sirloin"));
    assert_eq!(page.location_hash(), "#sirloin");
    assert!(toc.is_highlighting());
    assert_eq!(scroll_ends.get(), 1);
    assert_eq!(active_id(&toc).as_deref(), Some("sirloin"));
    assert!(has_class(&page, link, "is-active-link"));
    Ok(())
}

#[test]
fn test_activate_hook_fires_on_change() -> Result<()> {
    let page = sample_page()?;
    let activated = Rc::new(RefCell::new(Vec::new()));
    let hooks = Hooks {
        on_activate: Some({
            let activated = Rc::clone(&activated);
            Rc::new(move |heading: &tocnest_core::HeadingRecord| {
                activated.borrow_mut().push(heading.id.clone())
            })
        }),
        ..Default::default()
    };

    let mut toc = TableOfContents::new(&page);
    toc.init_with_hooks(Options::default(), hooks);
    page.advance_time(100);
    page.scroll_to(1.0);
    page.advance_time(100);
    page.scroll_to(heading_top(&page, "chuck"));
    assert_eq!(*activated.borrow(), vec!["bacon", "chuck"]);
    Ok(())
}

#[test]
fn test_position_fixed_class() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options {
        position_fixed_selector: Some(".toc".into()),
        fixed_sidebar_offset: Some(250.0),
        ..Default::default()
    });
    let nav = toc.container().expect("container");
    assert!(!has_class(&page, nav, "is-position-fixed"));

    page.scroll_to(300.0);
    assert!(has_class(&page, nav, "is-position-fixed"));
    page.advance_time(100);
    page.scroll_to(100.0);
    assert!(!has_class(&page, nav, "is-position-fixed"));
    Ok(())
}

#[test]
fn test_multiple_instances_share_a_page() -> Result<()> {
    let page = Page::from_html(
        "<nav class=\"first\"></nav><nav class=\"second\"></nav>\
         <main class=\"js-toc-content\"><h1 id=\"a\">A</h1><h2 id=\"b\">B</h2></main>",
    );
    let mut first = TableOfContents::new(&page);
    let mut second = TableOfContents::new(&page);
    first.init(Options {
        toc_selector: ".first".into(),
        ..Default::default()
    });
    second.init(Options {
        toc_selector: ".second".into(),
        heading_selector: "h1".into(),
        scroll_smooth: false,
        ..Default::default()
    });
    assert_eq!(page.listener_count(), 7);

    first.destroy();
    assert_eq!(page.listener_count(), 3);
    assert_eq!(second.state(), State::Active);

    let first_nav = first.container();
    assert!(first_nav.is_none());
    let second_nav = second.container().expect("second container");
    let markup = page.with_document(|doc| doc.inner_html(second_nav));
    assert!(markup.contains("href=\"#a\""));
    assert!(!markup.contains("href=\"#b\""));
    Ok(())
}

#[test]
fn test_missing_elements_give_empty_toc() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options {
        toc_selector: ".absent".into(),
        ..Default::default()
    });
    assert_eq!(toc.state(), State::Active);
    assert!(toc.container().is_none());
    page.scroll_to(500.0);
    assert!(toc.active_heading().is_none());

    toc.init(Options {
        content_selector: ".absent".into(),
        ..Default::default()
    });
    assert!(toc.headings().is_empty());
    let container = toc.container().expect("container");
    assert_eq!(
        page.with_document(|doc| doc.inner_html(container)),
        "<ol class=\"toc-list\"></ol>"
    );
    Ok(())
}

#[test]
fn test_missing_ids_are_generated() -> Result<()> {
    let page = Page::from_html(
        "<nav class=\"js-toc\"></nav>\
         <div class=\"js-toc-content\"><h1>Pork Loin</h1><h2 class=\"js-toc-ignore\">Skip</h2><h2>Pork Loin</h2></div>",
    );
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());
    let ids: Vec<String> = toc.headings().into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec!["pork-loin", "pork-loin-1"]);
    toc_link(&page, &toc, "pork-loin-1");
    Ok(())
}

#[test]
fn test_dropping_the_handle_detaches_listeners() -> Result<()> {
    let page = sample_page()?;
    {
        let mut toc = TableOfContents::new(&page);
        toc.init(Options::default());
        page.scroll_to(300.0);
        page.scroll_to(400.0);
    }
    assert_eq!(page.listener_count(), 0);
    // A trailing update left behind finds no session
    page.flush_timers()?;
    Ok(())
}

const SHORT_PAGE: &str = "<nav class=\"js-toc\"></nav>\
     <div class=\"js-toc-content\"><h1 id=\"only\">Only</h1><p>Text</p></div>";

#[test]
fn test_replaced_document_is_left_alone_until_refresh() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());
    assert_eq!(active_id(&toc).as_deref(), Some("bacon"));

    page.replace_document(Document::parse(SHORT_PAGE));
    let untouched = page.to_html();
    page.scroll_to(500.0);
    page.resize(640.0, 480.0);
    page.flush_timers()?;
    assert_eq!(active_id(&toc).as_deref(), Some("bacon"));
    assert_eq!(page.to_html(), untouched);

    toc.destroy();
    assert_eq!(toc.state(), State::Destroyed);
    assert_eq!(page.listener_count(), 0);
    assert_eq!(page.to_html(), untouched);
    Ok(())
}

#[test]
fn test_refresh_after_replacing_document() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());

    page.replace_document(Document::parse(SHORT_PAGE));
    page.layout_flow(100.0);
    toc.refresh();
    let ids: Vec<String> = toc.headings().into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec!["only"]);
    assert_eq!(active_id(&toc).as_deref(), Some("only"));

    let link = toc_link(&page, &toc, "only");
    assert!(has_class(&page, link, "is-active-link"));
    toc.destroy();
    let container = page
        .with_document(|doc| tocnest_core::selector::select_first(doc, ".js-toc"))
        .expect("container");
    assert_eq!(page.with_document(|doc| doc.inner_html(container)), "");
    Ok(())
}

#[test]
fn test_no_active_heading_without_layout() -> Result<()> {
    let html = fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../tocnest-core/tests/data/sample.html"
    ))?;
    let page = Page::from_html(&html);
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());
    assert_eq!(toc.headings().len(), 19);
    assert!(toc.active_heading().is_none());

    let container = toc.container().expect("container");
    let markup = page.with_document(|doc| doc.inner_html(container));
    assert!(!markup.contains("is-active-link"));
    assert!(!markup.contains("is-active-li"));

    page.layout_flow(100.0);
    page.scroll_to(0.0);
    assert_eq!(active_id(&toc).as_deref(), Some("bacon"));
    Ok(())
}

#[test]
fn test_second_click_during_short_scroll_keeps_highlighting() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options {
        scroll_smooth_duration: 20,
        ..Default::default()
    });

    page.click(toc_link(&page, &toc, "chuck"));
    assert!(!toc.is_highlighting());
    page.advance_time(10);
    // Lands inside the click throttle window, so its update is deferred
    page.click(toc_link(&page, &toc, "sirloin"));
    page.advance_time(200);
    assert!(toc.is_highlighting());
    assert_eq!(page.location_hash(), "#sirloin");

    page.scroll_to(heading_top(&page, "flank"));
    page.advance_time(200);
    assert_eq!(active_id(&toc).as_deref(), Some("flank"));
    Ok(())
}

#[test]
fn test_scroll_to_top_resumes_highlighting() -> Result<()> {
    let page = sample_page()?;
    let mut toc = TableOfContents::new(&page);
    toc.init(Options::default());

    page.click(toc_link(&page, &toc, "sirloin"));
    assert!(!toc.is_highlighting());

    // The user drags back to the top before the animation moved anything
    page.scroll_to(0.0);
    assert!(toc.is_highlighting());
    assert_eq!(active_id(&toc).as_deref(), Some("bacon"));
    Ok(())
}

#[test]
fn test_click_outside_toc_skips_click_hook() -> Result<()> {
    let page = sample_page()?;
    let clicks = Rc::new(Cell::new(0));
    let hooks = Hooks {
        on_click: Some({
            let clicks = Rc::clone(&clicks);
            Rc::new(move |_: NodeId| clicks.set(clicks.get() + 1))
        }),
        ..Default::default()
    };
    let mut toc = TableOfContents::new(&page);
    toc.init_with_hooks(Options::default(), hooks);

    let content = page
        .with_document(|doc| tocnest_core::selector::select_first(doc, ".js-toc-content"))
        .expect("content");
    page.click(content);
    page.flush_timers()?;
    assert_eq!(clicks.get(), 0);
    assert!(toc.is_highlighting());

    page.advance_time(100);
    page.click(toc_link(&page, &toc, "chuck"));
    assert_eq!(clicks.get(), 1);
    Ok(())
}
