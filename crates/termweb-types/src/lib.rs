//! Foundation types for termweb.
//!
//! Shared by every crate in the workspace: the error enum with its
//! `Result` alias, and the render configuration loaded from TOML.

pub mod config;
pub mod error;

pub use config::RenderConfig;
pub use error::{BrowseError, Result};
