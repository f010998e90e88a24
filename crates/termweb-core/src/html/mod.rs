//! HTML tokenizer, tolerant parser, and entity decoding.

pub mod entities;
pub mod parser;
pub mod tokenizer;

pub use parser::{TokenSink, TreeSink, parse, parse_bytes, parse_events};
pub use tokenizer::{Token, Tokenizer};
