//! tocnest - build a nested table of contents for an HTML or Markdown page

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;
use tocnest_core::{nest_headings, render_markdown, render_to_string, Options, SourceDocument};
use tocnest_runtime::{Page, TableOfContents};

/// Height given to each block when laying out a page for `--scroll-to`
const LAYOUT_BLOCK_HEIGHT: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Nested list markup
    Html,
    /// Bullet list of anchor links
    Markdown,
}

/// Build a nested table of contents from a page's headings
#[derive(Parser, Debug)]
#[command(name = "tocnest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an HTML or Markdown file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Options file to use instead of the user config
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Comma separated heading tags, e.g. "h1, h2, h3"
    #[arg(long, value_name = "SELECTOR")]
    heading_selector: Option<String>,

    /// Element holding the headings
    #[arg(long, value_name = "SELECTOR")]
    content_selector: Option<String>,

    /// Element the table of contents is rendered into
    #[arg(long, value_name = "SELECTOR")]
    toc_selector: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    format: OutputFormat,

    /// Print the whole page with the table of contents rendered into it
    #[arg(long)]
    inject: bool,

    /// Scroll to this offset before printing, so the active heading is marked
    #[arg(long, value_name = "PX")]
    scroll_to: Option<f64>,

    /// Keep running and print again whenever the file changes
    #[cfg(feature = "watch")]
    #[arg(long)]
    watch: bool,
}

impl Args {
    /// Options for `source`: config file, then front matter, then flags
    fn options_for(&self, base: &Options, source: &SourceDocument) -> Result<Options> {
        let mut options = match source.option_overrides()? {
            Some(overrides) => {
                debug!("Front matter overrides: {overrides:?}");
                base.merged(overrides)?
            }
            None => base.clone(),
        };
        if let Some(selector) = &self.heading_selector {
            options.heading_selector = selector.clone();
        }
        if let Some(selector) = &self.content_selector {
            options.content_selector = selector.clone();
        }
        if let Some(selector) = &self.toc_selector {
            options.toc_selector = selector.clone();
        }
        Ok(options)
    }

    fn prepare_layout(&self, page: &Page) {
        if self.scroll_to.is_some() {
            let height = page.layout_flow(LAYOUT_BLOCK_HEIGHT);
            debug!("Laid out page, {height}px tall");
        }
    }

    fn apply_scroll(&self, page: &Page) -> Result<()> {
        if let Some(top) = self.scroll_to {
            page.scroll_to(top);
            page.flush_timers().context("Page did not settle after scrolling")?;
        }
        Ok(())
    }

    fn output(&self, toc: &TableOfContents) -> String {
        let page = toc.page();
        if self.inject {
            return page.to_html();
        }
        let nested = nest_headings(&toc.headings());
        match self.format {
            OutputFormat::Markdown => render_markdown(&nested.root),
            OutputFormat::Html => match toc.container() {
                Some(container) => page.with_document(|doc| doc.inner_html(container)),
                None => {
                    let options = toc.options().cloned().unwrap_or_default();
                    render_to_string(&nested.root, &options)
                }
            },
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Load configuration
    let base = match &args.config {
        Some(path) => Options::load_from(path),
        None => Options::load(),
    }
    .context("Failed to load configuration")?;

    // Load document
    #[allow(unused_mut)]
    let mut source = SourceDocument::load(&args.file)
        .with_context(|| format!("Failed to load document: {}", args.file.display()))?;

    let options = args.options_for(&base, &source)?;
    let page = Page::new(source.to_document()?);
    args.prepare_layout(&page);

    let mut toc = TableOfContents::new(&page);
    toc.init(options);
    args.apply_scroll(&page)?;
    info!("{} headings in {}", toc.headings().len(), source.path.display());
    println!("{}", args.output(&toc));

    #[cfg(feature = "watch")]
    {
        if args.watch {
            watch(&args, &base, &mut source, &mut toc)?;
        }
    }

    Ok(())
}

#[cfg(feature = "watch")]
fn watch(
    args: &Args,
    base: &Options,
    source: &mut SourceDocument,
    toc: &mut TableOfContents,
) -> Result<()> {
    use log::warn;
    use std::time::Duration;
    use tocnest_runtime::watcher::SourceWatcher;

    const DEBOUNCE_MS: u64 = 200;

    let mut watcher = SourceWatcher::new(&source.path)?;
    info!("Watching {} for changes", source.path.display());

    loop {
        if !watcher.wait_changed(DEBOUNCE_MS, Duration::from_secs(1))? {
            continue;
        }
        if watcher.is_removed() {
            warn!("{} was removed, waiting for it to return", source.path.display());
            continue;
        }
        if let Err(err) = rebuild(args, base, source, toc) {
            warn!("Skipping update: {err:#}");
            continue;
        }
        println!("{}", args.output(toc));
    }
}

#[cfg(feature = "watch")]
fn rebuild(
    args: &Args,
    base: &Options,
    source: &mut SourceDocument,
    toc: &mut TableOfContents,
) -> Result<()> {
    source.reload()?;
    let options = args.options_for(base, source)?;
    let document = source.to_document()?;

    // The old container belongs to the old document
    let reinit = toc.options() != Some(&options);
    if reinit {
        info!("Options changed, reinitializing");
        toc.destroy();
    }
    let page = toc.page().clone();
    page.replace_document(document);
    args.prepare_layout(&page);

    if reinit {
        toc.init(options);
    } else {
        toc.refresh();
    }
    args.apply_scroll(&page)?;
    debug!("Rebuilt revision {}", source.rev);
    Ok(())
}
