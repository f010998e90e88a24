//! Render configuration.
//!
//! Loaded from a TOML file with per-field defaults, so an empty file (or
//! no file at all) yields [`RenderConfig::default`].

use std::path::Path;

use serde::Deserialize;

use crate::error::{BrowseError, Result};

/// Layout knobs shared by the plain-text and markup renderers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    /// Initial viewport width in terminal columns.
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Narrowest width a render pass will accept.
    #[serde(default = "default_min_columns")]
    pub min_columns: usize,
    /// Tab stop interval used when expanding `\t`.
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
    /// Indentation added per nested list level.
    #[serde(default = "default_indent")]
    pub list_indent: usize,
    /// Indentation added per `<blockquote>` / `<dd>` level.
    #[serde(default = "default_indent")]
    pub quote_indent: usize,
    /// Unordered list bullets, cycled by nesting depth.
    #[serde(default = "default_bullets")]
    pub bullets: Vec<String>,
    /// Character repeated across the width for `<hr>`.
    #[serde(default = "default_rule_char")]
    pub rule_char: char,
    /// Placeholder shown for an image without alt text.
    #[serde(default = "default_image_placeholder")]
    pub image_placeholder: String,
    /// Width of a text field when the markup gives no `size`.
    #[serde(default = "default_text_input_width")]
    pub text_input_width: usize,
    /// Rows of a `<textarea>` without a `rows` attribute.
    #[serde(default = "default_textarea_rows")]
    pub textarea_rows: usize,
    /// Upper bound on the rows a `<textarea>` may ask for.
    #[serde(default = "default_max_textarea_rows")]
    pub max_textarea_rows: usize,
    /// Columns of a `<textarea>` without a `cols` attribute.
    #[serde(default = "default_textarea_cols")]
    pub textarea_cols: usize,
}

fn default_columns() -> usize {
    80
}
fn default_min_columns() -> usize {
    1
}
fn default_tab_width() -> usize {
    8
}
fn default_indent() -> usize {
    2
}
fn default_bullets() -> Vec<String> {
    vec!["*".to_string(), "+".to_string(), "-".to_string()]
}
fn default_rule_char() -> char {
    '-'
}
fn default_image_placeholder() -> String {
    "IMG".to_string()
}
fn default_text_input_width() -> usize {
    20
}
fn default_textarea_rows() -> usize {
    3
}
fn default_max_textarea_rows() -> usize {
    100
}
fn default_textarea_cols() -> usize {
    20
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            min_columns: default_min_columns(),
            tab_width: default_tab_width(),
            list_indent: default_indent(),
            quote_indent: default_indent(),
            bullets: default_bullets(),
            rule_char: default_rule_char(),
            image_placeholder: default_image_placeholder(),
            text_input_width: default_text_input_width(),
            textarea_rows: default_textarea_rows(),
            max_textarea_rows: default_max_textarea_rows(),
            textarea_cols: default_textarea_cols(),
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: RenderConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("loading render config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Reject values no render pass can work with.
    pub fn validate(&self) -> Result<()> {
        if self.tab_width == 0 {
            return Err(BrowseError::Config("tab_width must be positive".into()));
        }
        if self.bullets.is_empty() {
            return Err(BrowseError::Config("bullets must not be empty".into()));
        }
        Ok(())
    }

    /// Clamp a requested width to the configured floor (never below 1).
    pub fn clamp_columns(&self, columns: usize) -> usize {
        let floor = self.min_columns.max(1);
        if columns < floor {
            log::warn!("width {columns} below minimum, using {floor}");
        }
        columns.max(floor)
    }

    /// Bullet for an unordered list at the given nesting depth (0-based).
    pub fn bullet(&self, depth: usize) -> &str {
        match self.bullets.len() {
            0 => "*",
            n => &self.bullets[depth % n],
        }
    }
}
