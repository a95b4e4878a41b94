//! tocnest core - headings in, nested table of contents out
//!
//! This crate holds the parts that need no event loop:
//! - An arena document model with a lenient HTML parser
//! - Selector matching and heading selection
//! - Nesting headings into a tree and rendering it as list markup
//! - Active heading detection and TOC highlighting
//! - Options, front matter overrides and source files

pub mod active;
pub mod dom;
pub mod front_matter;
pub mod heading;
#[cfg(feature = "markdown")]
pub mod markdown;
pub mod nest;
pub mod options;
pub mod parse;
pub mod render;
pub mod selector;
pub mod source;

// Re-export commonly used types
pub use dom::{Document, NodeId};
pub use heading::{select_headings, select_headings_excluding, HeadingRecord};
pub use nest::{nest_headings, NestedHeadings, TocNode};
pub use options::Options;
pub use render::{render, render_markdown, render_to_string};
pub use source::{SourceDocument, SourceFormat};
