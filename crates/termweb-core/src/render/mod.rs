//! Renderers that project a source into a [`DocumentModel`].
//!
//! [`DocumentModel`]: crate::document::DocumentModel

pub mod markup;
pub mod text;
pub mod wrap;
