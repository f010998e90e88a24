//! Stack-based HTML parser.
//!
//! Consumes the token stream and reports a *balanced* sequence of
//! element events to a [`TokenSink`]: every `start_tag` is eventually
//! matched by an `end_tag`, whatever the input looked like. Missing end
//! tags are implied, stray ones are dropped, and a handful of elements
//! close their open siblings (`<li>`, `<p>`, table cells, ...).
//!
//! [`TreeSink`] materializes the events into a [`Tree`].

use super::tokenizer::{Token, Tokenizer};
use crate::tree::{Attribute, Label, NodeId, Tree};

// ------------------------------------------------------------------
// Element classes
// ------------------------------------------------------------------

/// Elements with no content; they never stay open.
pub fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Block elements whose start implicitly closes an open `<p>`.
fn closes_paragraph(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "center"
            | "details"
            | "dir"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "summary"
            | "table"
            | "ul"
    )
}

/// Elements an implied close never reaches past.
fn is_scope_boundary(name: &str) -> bool {
    matches!(
        name,
        "table" | "td" | "th" | "caption" | "button" | "object" | "template" | "marquee"
    )
}

// ------------------------------------------------------------------
// Sink
// ------------------------------------------------------------------

/// Receiver of balanced parse events.
pub trait TokenSink {
    fn start_tag(&mut self, name: &str, attributes: Vec<Attribute>);
    fn end_tag(&mut self, name: &str);
    fn text(&mut self, text: &str);
}

/// Builds a [`Tree`] under a [`Label::Root`] node.
pub struct TreeSink {
    tree: Tree,
    current: NodeId,
}

impl TreeSink {
    pub fn new() -> Self {
        let mut tree = Tree::new();
        let current = tree.create_root(Label::Root, None);
        Self { tree, current }
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }
}

impl Default for TreeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSink for TreeSink {
    fn start_tag(&mut self, name: &str, attributes: Vec<Attribute>) {
        let id = match self
            .tree
            .append_child(self.current, Label::element(name), None)
        {
            Ok(id) => id,
            Err(err) => {
                log::error!("tree sink lost its insertion point: {err}");
                return;
            },
        };
        for attr in attributes {
            if let Err(err) = self.tree.set_attribute(id, attr.name, attr.value) {
                log::error!("tree sink dropped an attribute on <{name}>: {err}");
            }
        }
        self.current = id;
    }

    fn end_tag(&mut self, _name: &str) {
        if let Some(parent) = self.tree.parent(self.current) {
            self.current = parent;
        }
    }

    fn text(&mut self, text: &str) {
        let last = self.tree.children(self.current).last().copied();
        if let Some(last) = last
            && self.tree.get(last).is_some_and(|n| n.label().is_text())
        {
            if let Err(err) = self.tree.push_text(last, text) {
                log::error!("tree sink dropped text: {err}");
            }
            return;
        }
        if let Err(err) = self
            .tree
            .append_child(self.current, Label::Text, Some(text.to_string()))
        {
            log::error!("tree sink lost its insertion point: {err}");
        }
    }
}

// ------------------------------------------------------------------
// Parser
// ------------------------------------------------------------------

/// Drives a [`TokenSink`] from a token stream.
pub struct Parser<S: TokenSink> {
    sink: S,
    /// Names of open elements, innermost last.
    open: Vec<String>,
}

impl<S: TokenSink> Parser<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            open: Vec::new(),
        }
    }

    /// Process one token.
    pub fn feed(&mut self, token: Token) {
        match token {
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => self.start_tag(name, attributes, self_closing),
            Token::EndTag { name } => self.end_tag(&name),
            Token::Text(text) => {
                if !text.is_empty() {
                    self.sink.text(&text);
                }
            },
        }
    }

    /// Close everything still open and hand back the sink.
    pub fn finish(mut self) -> S {
        while let Some(name) = self.open.pop() {
            self.sink.end_tag(&name);
        }
        self.sink
    }

    fn start_tag(&mut self, name: String, attributes: Vec<Attribute>, self_closing: bool) {
        self.close_implied(&name);
        self.sink.start_tag(&name, attributes);
        if is_void(&name) || self_closing {
            self.sink.end_tag(&name);
        } else {
            self.open.push(name);
        }
    }

    fn end_tag(&mut self, name: &str) {
        match self.open.iter().rposition(|open| open == name) {
            Some(pos) => self.pop_to(pos),
            None => log::trace!("ignoring stray </{name}>"),
        }
    }

    /// Pop the open stack down to and including `pos`.
    fn pop_to(&mut self, pos: usize) {
        while self.open.len() > pos {
            let Some(name) = self.open.pop() else { break };
            if self.open.len() > pos {
                log::trace!("implicitly closing <{name}>");
            }
            self.sink.end_tag(&name);
        }
    }

    /// Innermost open element named in `targets`, unless a boundary
    /// element (or one of `stops`) sits above it.
    fn find_in_scope(&self, targets: &[&str], stops: &[&str]) -> Option<usize> {
        for (pos, open) in self.open.iter().enumerate().rev() {
            if targets.contains(&open.as_str()) {
                return Some(pos);
            }
            if is_scope_boundary(open) || stops.contains(&open.as_str()) {
                return None;
            }
        }
        None
    }

    fn close_in_scope(&mut self, targets: &[&str], stops: &[&str]) {
        if let Some(pos) = self.find_in_scope(targets, stops) {
            self.pop_to(pos);
        }
    }

    /// Apply the implied-end rules for an incoming start tag.
    fn close_implied(&mut self, name: &str) {
        if closes_paragraph(name) {
            self.close_in_scope(&["p"], &[]);
        }
        match name {
            "li" => self.close_in_scope(&["li"], &["ul", "ol", "menu", "dir"]),
            "dt" | "dd" => self.close_in_scope(&["dt", "dd"], &["dl"]),
            "option" | "optgroup" => self.close_in_scope(&["option"], &["select"]),
            "tr" => self.close_rows(&["tr"]),
            "td" | "th" => self.close_rows(&["td", "th"]),
            "thead" | "tbody" | "tfoot" => self.close_rows(&["thead", "tbody", "tfoot"]),
            _ => {},
        }
    }

    /// Table-part closing: searches up to the nearest `<table>`, passing
    /// through open cells.
    fn close_rows(&mut self, targets: &[&str]) {
        for (pos, open) in self.open.iter().enumerate().rev() {
            if targets.contains(&open.as_str()) {
                self.pop_to(pos);
                return;
            }
            if open == "table" {
                return;
            }
        }
    }
}

// ------------------------------------------------------------------
// Entry points
// ------------------------------------------------------------------

/// Parse `input`, reporting events to `sink`, and return the sink.
pub fn parse_events<S: TokenSink>(input: &str, sink: S) -> S {
    let mut parser = Parser::new(sink);
    for token in Tokenizer::new(input) {
        parser.feed(token);
    }
    parser.finish()
}

/// Parse `input` into a tree rooted at a [`Label::Root`] node.
pub fn parse(input: &str) -> Tree {
    let tree = parse_events(input, TreeSink::new()).into_tree();
    log::debug!("parsed {} bytes into {} nodes", input.len(), tree.len());
    tree
}

/// Parse raw bytes, replacing invalid UTF-8 sequences.
pub fn parse_bytes(bytes: &[u8]) -> Tree {
    parse(&String::from_utf8_lossy(bytes))
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------
