//! Source documents: HTML or Markdown files loaded from disk

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::dom::Document;
use crate::front_matter::{detect_front_matter, toc_overrides};

/// How the file's text is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Html,
    Markdown,
}

impl SourceFormat {
    /// Guess from the file extension; anything that is not HTML is Markdown
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("html" | "htm" | "xhtml") => SourceFormat::Html,
            _ => SourceFormat::Markdown,
        }
    }
}

/// A document file and the text it had when last read
#[derive(Clone, Debug)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub text: String,
    pub loaded_mtime: Option<SystemTime>,
    pub rev: u64,
}

impl SourceDocument {
    /// Load a document from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize path: {}", path.display()))?;

        let text = fs::read_to_string(&abs_path)
            .with_context(|| format!("Failed to read file: {}", abs_path.display()))?;

        Ok(Self {
            format: SourceFormat::from_path(&abs_path),
            loaded_mtime: modified(&abs_path),
            path: abs_path,
            text,
            rev: 1,
        })
    }

    /// Build a document from text that did not come from disk
    pub fn from_text(path: impl Into<PathBuf>, format: SourceFormat, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format,
            text: text.into(),
            loaded_mtime: None,
            rev: 1,
        }
    }

    /// Reload the document from disk
    pub fn reload(&mut self) -> Result<()> {
        self.text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to reload file: {}", self.path.display()))?;
        self.loaded_mtime = modified(&self.path);
        self.rev += 1;
        Ok(())
    }

    /// True if the file's modification time differs from the one last loaded
    pub fn changed_on_disk(&self) -> bool {
        modified(&self.path) != self.loaded_mtime
    }

    /// Option overrides from the front matter `toc` table, Markdown only
    pub fn option_overrides(&self) -> Result<Option<toml::Table>> {
        if self.format != SourceFormat::Markdown {
            return Ok(None);
        }
        match detect_front_matter(&self.text) {
            Some(fm) => toc_overrides(&fm)
                .with_context(|| format!("Invalid front matter in {}", self.path.display())),
            None => Ok(None),
        }
    }

    /// The page as HTML. Markdown is converted and wrapped in a shell with an
    /// empty `.js-toc` container and a `.js-toc-content` article.
    pub fn to_html(&self) -> Result<String> {
        match self.format {
            SourceFormat::Html => Ok(self.text.clone()),
            SourceFormat::Markdown => markdown_page(&self.text),
        }
    }

    /// Parse the page into a document tree
    pub fn to_document(&self) -> Result<Document> {
        Ok(Document::parse(&self.to_html()?))
    }
}

#[cfg(feature = "markdown")]
fn markdown_page(text: &str) -> Result<String> {
    let body = crate::markdown::markdown_to_html(crate::front_matter::strip_front_matter(text));
    Ok(format!(
        "<nav class=\"js-toc\"></nav>\n<article class=\"js-toc-content\">\n{body}</article>\n"
    ))
}

#[cfg(not(feature = "markdown"))]
fn markdown_page(_text: &str) -> Result<String> {
    anyhow::bail!("Markdown input requires the `markdown` feature")
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}
