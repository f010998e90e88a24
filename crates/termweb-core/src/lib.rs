//! termweb core: markup and plain-text documents laid out for a
//! fixed-width terminal.
//!
//! Input is parsed into a [`tree::Tree`] (or kept as plain text), then
//! rendered into a [`document::DocumentModel`]: rows of styled runs
//! plus indices of links, images, forms, inputs and section anchors.
//! A [`document::Document`] keeps its source so it can be re-rendered
//! at any width.

pub use termweb_types::config;
pub use termweb_types::error;

pub mod document;
pub mod html;
pub mod render;
pub mod tree;
pub mod url;

pub use document::{
    BufferIndex, BufferLine, BufferNode, Document, DocumentModel, Form, FormInput, FormMethod,
    InputType, Reference, Source, SourceKind, Style,
};
pub use termweb_types::{BrowseError, RenderConfig, Result};
pub use tree::{Label, NodeId, Tree};

#[cfg(test)]
mod tests;
