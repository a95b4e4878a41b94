//! Options: selectors, class names, offsets and toggles for a TOC session

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Region whose headings make up the TOC
    pub content_selector: String,
    /// Container the rendered list is inserted into
    pub toc_selector: String,
    pub heading_selector: String,
    /// Headings matching this are left out
    pub ignore_selector: String,

    pub link_class: String,
    pub extra_link_classes: String,
    pub active_link_class: String,
    pub list_class: String,
    pub extra_list_classes: String,
    pub is_collapsed_class: String,
    pub collapsible_class: String,
    pub list_item_class: String,
    pub active_list_item_class: String,

    /// Nested lists under headings at or below this level start collapsed
    pub collapse_depth: u8,
    /// Render `ol` instead of `ul`
    pub ordered_list: bool,

    /// Pixels added to the scroll position when picking the active heading
    pub headings_offset: f64,
    pub scroll_smooth: bool,
    /// Milliseconds
    pub scroll_smooth_duration: u64,
    pub scroll_smooth_offset: f64,
    /// Milliseconds between scroll/resize/click updates
    pub throttle_timeout: u64,

    pub position_fixed_selector: Option<String>,
    pub position_fixed_class: String,
    /// Scroll position after which the fixed class applies; unset means the
    /// element's own offset
    pub fixed_sidebar_offset: Option<f64>,

    /// Derive ids for headings that have none
    pub generate_missing_ids: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            content_selector: ".js-toc-content".to_string(),
            toc_selector: ".js-toc".to_string(),
            heading_selector: "h1, h2, h3".to_string(),
            ignore_selector: ".js-toc-ignore".to_string(),
            link_class: "toc-link".to_string(),
            extra_link_classes: String::new(),
            active_link_class: "is-active-link".to_string(),
            list_class: "toc-list".to_string(),
            extra_list_classes: String::new(),
            is_collapsed_class: "is-collapsed".to_string(),
            collapsible_class: "is-collapsible".to_string(),
            list_item_class: "toc-list-item".to_string(),
            active_list_item_class: "is-active-li".to_string(),
            collapse_depth: 0,
            ordered_list: true,
            headings_offset: 1.0,
            scroll_smooth: true,
            scroll_smooth_duration: 420,
            scroll_smooth_offset: 0.0,
            throttle_timeout: 50,
            position_fixed_selector: None,
            position_fixed_class: "is-position-fixed".to_string(),
            fixed_sidebar_offset: None,
            generate_missing_ids: true,
        }
    }
}

impl Options {
    /// Get the platform-specific options file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tocnest")
            .map(|proj_dirs| proj_dirs.config_dir().join("tocnest.toml"))
    }

    /// Load options from the platform config file, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse options file: {}", path.display()))
    }

    /// Parse TOML; keys that are not present keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Lay `overrides` over these options, key by key
    pub fn merged(&self, overrides: toml::Table) -> Result<Self> {
        let mut table = match toml::Value::try_from(self).context("Failed to serialize options")? {
            toml::Value::Table(table) => table,
            other => bail!("Options serialized to a {} instead of a table", other.type_str()),
        };
        table.extend(overrides);
        toml::Value::Table(table)
            .try_into()
            .context("Failed to apply option overrides")
    }

    /// Class attribute for a list element
    pub fn list_classes(&self, collapsed: bool) -> String {
        let mut classes = vec![self.list_class.as_str(), self.extra_list_classes.as_str()];
        if collapsed {
            classes.push(&self.collapsible_class);
            classes.push(&self.is_collapsed_class);
        }
        join_classes(&classes)
    }

    /// Class attribute for a link to a heading with the given tag (`H2`)
    pub fn link_classes(&self, tag: &str) -> String {
        let node_name = format!("node-name--{tag}");
        join_classes(&[
            self.link_class.as_str(),
            node_name.as_str(),
            self.extra_link_classes.as_str(),
        ])
    }

    pub fn list_tag(&self) -> &'static str {
        if self.ordered_list {
            "ol"
        } else {
            "ul"
        }
    }
}

fn join_classes(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
