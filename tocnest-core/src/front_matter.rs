//! Front matter detection and per-document option overrides.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::fmt;

/// Types of front matter markers that tocnest recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontMatterKind {
    Yaml,
    Toml,
    Json,
}

impl FrontMatterKind {
    fn as_str(&self) -> &'static str {
        match self {
            FrontMatterKind::Yaml => "yaml",
            FrontMatterKind::Toml => "toml",
            FrontMatterKind::Json => "json",
        }
    }
}

impl fmt::Display for FrontMatterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A front matter block found at the top of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    pub kind: FrontMatterKind,
    /// Text between the markers
    pub content: &'a str,
    /// Everything after the closing marker line
    pub body: &'a str,
}

struct FrontMatterMarker {
    kind: FrontMatterKind,
    start: &'static str,
    end: &'static str,
}

const FRONT_MATTER_MARKERS: [FrontMatterMarker; 4] = [
    FrontMatterMarker {
        kind: FrontMatterKind::Yaml,
        start: "---",
        end: "---",
    },
    FrontMatterMarker {
        kind: FrontMatterKind::Toml,
        start: "+++",
        end: "+++",
    },
    FrontMatterMarker {
        kind: FrontMatterKind::Json,
        start: "===",
        end: "===",
    },
    FrontMatterMarker {
        kind: FrontMatterKind::Json,
        start: "{/",
        end: "/}",
    },
];

/// Detects front matter at the top of a document.
///
/// A block without a closing marker is not front matter.
pub fn detect_front_matter(text: &str) -> Option<FrontMatter<'_>> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    let marker = FRONT_MATTER_MARKERS
        .iter()
        .find(|marker| normalize_line(first) == marker.start)?;

    let content_start = first.len();
    let mut offset = content_start;
    for line in lines {
        if normalize_line(line) == marker.end {
            return Some(FrontMatter {
                kind: marker.kind,
                content: &text[content_start..offset],
                body: &text[offset + line.len()..],
            });
        }
        offset += line.len();
    }

    None
}

/// The document without its front matter block
pub fn strip_front_matter(text: &str) -> &str {
    detect_front_matter(text).map_or(text, |fm| fm.body)
}

#[derive(Debug, Default, Deserialize)]
struct Header {
    #[serde(default)]
    toc: Option<toml::Table>,
}

/// Option overrides from the `toc` table of a YAML or TOML front matter block.
///
/// Returns `Ok(None)` when there is no `toc` table or the block is JSON.
pub fn toc_overrides(front_matter: &FrontMatter<'_>) -> Result<Option<toml::Table>> {
    let header: Header = match front_matter.kind {
        FrontMatterKind::Yaml if front_matter.content.trim().is_empty() => Header::default(),
        FrontMatterKind::Yaml => serde_yaml::from_str(front_matter.content)
            .context("Failed to parse YAML front matter")?,
        FrontMatterKind::Toml => {
            toml::from_str(front_matter.content).context("Failed to parse TOML front matter")?
        }
        FrontMatterKind::Json => {
            debug!("Skipping option overrides in {} front matter", front_matter.kind);
            Header::default()
        }
    };
    Ok(header.toc)
}

fn normalize_line(line: &str) -> &str {
    line.trim().trim_start_matches('\u{feff}')
}
