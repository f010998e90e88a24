//! Plain-text renderer.
//!
//! Each source line is tab-expanded and wrapped on its own. Links,
//! images, forms and sections never appear in plain text.

use termweb_types::RenderConfig;

use super::wrap::{expand_tabs, wrap_preserving};
use crate::document::{BufferLine, BufferNode, DocumentModel};

/// Fill `model` with `source` wrapped to `columns`.
pub fn render(model: &mut DocumentModel, source: &str, columns: usize, config: &RenderConfig) {
    for line in source.lines() {
        let expanded = expand_tabs(line, config.tab_width);
        for row in wrap_preserving(&expanded, columns) {
            let mut out = BufferLine::default();
            if !row.is_empty() {
                out.nodes.push(BufferNode::new(row));
            }
            model.push_line(out);
        }
    }
}
