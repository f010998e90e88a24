//! Markup renderer.
//!
//! Walks a parsed [`Tree`] depth-first and lays it out into rows of at
//! most `columns` cells. Block elements request line breaks that are
//! applied lazily, when the next visible content arrives, so the buffer
//! never starts with blank rows or carries two blank rows in a row.
//! Inline elements only change the attributes of the runs they cover.
//!
//! Every run that shows a link, image or form input records its start
//! position on the matching reference, which is how the navigation
//! layer maps a cell back to its target.

use termweb_types::RenderConfig;

use super::wrap::{char_width, display_width, expand_tabs, split_at_width, split_at_width_forced};
use crate::document::{
    BufferIndex, BufferLine, BufferNode, DocumentModel, FormInput, FormMethod, InputType, Style,
};
use crate::tree::{Edge, Label, Node, NodeId, Tree, TreeWalker};
use crate::url::{Url, resolve_target};

/// Inputs to one render pass.
pub struct Context<'a> {
    pub columns: usize,
    pub config: &'a RenderConfig,
    /// Base for resolving link, image and form targets.
    pub base: Option<&'a Url>,
    /// Action of the implicit form that collects inputs outside `<form>`.
    pub document_url: &'a str,
}

/// Lay out `tree` into `model`. The model is expected to be empty.
pub fn render(model: &mut DocumentModel, tree: &Tree, ctx: &Context<'_>) {
    let Some(root) = tree.root() else {
        return;
    };
    let title = tree
        .find_first("title")
        .map(|id| collapse_whitespace(&tree.text_content(id)))
        .filter(|t| !t.is_empty());
    model.set_title(title);

    let mut layout = Layout::new(model, tree, ctx);
    layout.run(root);
    layout.finish();
}

// ------------------------------------------------------------------
// Policy tables
// ------------------------------------------------------------------

/// Subtrees that never produce output.
fn is_skipped(name: &str) -> bool {
    matches!(name, "head" | "script" | "style" | "template" | "title")
}

/// Break requested before and after an element: 0 none, 1 line, 2 blank.
fn block_break(name: &str, in_list: bool) -> u8 {
    match name {
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "blockquote" | "table" => 2,
        "ul" | "ol" | "dl" | "menu" | "dir" => {
            if in_list {
                1
            } else {
                2
            }
        },
        "div" | "li" | "dt" | "dd" | "tr" | "form" | "caption" | "section" | "article"
        | "header" | "footer" | "nav" | "aside" | "main" | "address" | "center" | "fieldset"
        | "figure" | "figcaption" | "details" | "summary" | "hgroup" | "legend" => 1,
        _ => 0,
    }
}

/// Styles an element applies to the runs inside it.
fn element_styles(name: &str) -> &'static [Style] {
    match name {
        "b" | "strong" | "th" => &[Style::Bold],
        "i" | "em" | "cite" | "var" | "dfn" => &[Style::Italic],
        "u" | "ins" => &[Style::Underline],
        "s" | "strike" | "del" => &[Style::Strike],
        "code" | "tt" | "kbd" | "samp" => &[Style::Code],
        "h1" => &[Style::Heading(1), Style::Bold],
        "h2" => &[Style::Heading(2), Style::Bold],
        "h3" => &[Style::Heading(3), Style::Bold],
        "h4" => &[Style::Heading(4), Style::Bold],
        "h5" => &[Style::Heading(5), Style::Bold],
        "h6" => &[Style::Heading(6), Style::Bold],
        _ => &[],
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_size(value: Option<&str>) -> Option<usize> {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// `[value___]`: `shown` cut or padded to exactly `size` cells.
fn field(shown: &str, size: usize, pad: char) -> String {
    let (visible, _) = split_at_width(shown, size);
    let fill = size.saturating_sub(display_width(visible));
    let mut out = String::with_capacity(size + 2);
    out.push('[');
    out.push_str(visible);
    out.extend(std::iter::repeat_n(pad, fill));
    out.push(']');
    out
}

// ------------------------------------------------------------------
// Layout state
// ------------------------------------------------------------------

/// A link or image target plus the sequence number of the element that
/// introduced it. Two adjacent anchors to the same URL stay separate runs.
#[derive(Debug, Clone)]
struct Target {
    url: String,
    seq: usize,
}

/// Attributes that must match for two pieces of text to share a run.
#[derive(Debug, Clone, Default, PartialEq)]
struct RunKey {
    styles: Vec<Style>,
    link: Option<usize>,
    image: Option<usize>,
    input: Option<usize>,
}

#[derive(Debug)]
struct List {
    ordered: bool,
    next: i64,
}

/// What to undo when an element closes.
#[derive(Debug, Default)]
struct Frame {
    styles: usize,
    link: Option<Option<Target>>,
    list: bool,
    indent: usize,
    form: bool,
    pre: bool,
    hang: Option<usize>,
    after: u8,
}

struct Layout<'a> {
    model: &'a mut DocumentModel,
    tree: &'a Tree,
    ctx: &'a Context<'a>,
    columns: usize,

    line_width: usize,
    line_has_content: bool,
    pending_break: u8,
    pending_space: bool,
    last_run: Option<RunKey>,

    indent: usize,
    hang: usize,
    prefix: Option<String>,
    lists: Vec<List>,
    pre_depth: usize,
    pre_start: bool,
    pre_newlines: usize,

    styles: Vec<Style>,
    link: Option<Target>,
    image: Option<Target>,
    input: Option<(usize, usize)>,
    seq: usize,

    sections: Vec<String>,
    forms: Vec<usize>,
    implicit_form: Option<usize>,
    frames: Vec<Frame>,
}

impl<'a> Layout<'a> {
    fn new(model: &'a mut DocumentModel, tree: &'a Tree, ctx: &'a Context<'a>) -> Self {
        Self {
            model,
            tree,
            ctx,
            columns: ctx.columns.max(1),
            line_width: 0,
            line_has_content: false,
            pending_break: 0,
            pending_space: false,
            last_run: None,
            indent: 0,
            hang: 0,
            prefix: None,
            lists: Vec::new(),
            pre_depth: 0,
            pre_start: false,
            pre_newlines: 0,
            styles: Vec::new(),
            link: None,
            image: None,
            input: None,
            seq: 0,
            sections: Vec::new(),
            forms: Vec::new(),
            implicit_form: None,
            frames: Vec::new(),
        }
    }

    fn run(&mut self, root: NodeId) {
        let tree = self.tree;
        let mut walker = TreeWalker::new(root);
        while let Some(edge) = walker.next(tree) {
            match edge {
                Edge::Open(id) => {
                    let frame = self.open(id, &mut walker);
                    self.frames.push(frame);
                },
                Edge::Close(_) => {
                    if let Some(frame) = self.frames.pop() {
                        self.close(frame);
                    }
                },
            }
        }
    }

    fn finish(&mut self) {
        self.mark_sections();
        for index in self.model.normalize_radio_groups() {
            log::trace!("radio input {index} unchecked: a later radio in its group is checked");
        }
    }

    fn next_seq(&mut self) -> usize {
        self.seq += 1;
        self.seq
    }

    // -- elements -----------------------------------------------------------

    fn open(&mut self, id: NodeId, walker: &mut TreeWalker) -> Frame {
        let tree = self.tree;
        let mut frame = Frame::default();
        let Some(node) = tree.get(id) else {
            return frame;
        };
        let name = match node.label() {
            Label::Element(name) => name.as_str(),
            Label::Text => {
                if let Some(text) = node.text() {
                    self.text(text);
                }
                return frame;
            },
            Label::Root => return frame,
        };
        if is_skipped(name) {
            walker.skip_children();
            return frame;
        }

        if let Some(anchor) = node.attribute("id").filter(|v| !v.is_empty()) {
            self.sections.push(anchor.to_string());
        }
        if name == "a"
            && let Some(anchor) = node.attribute("name").filter(|v| !v.is_empty())
        {
            self.sections.push(anchor.to_string());
        }

        frame.after = block_break(name, !self.lists.is_empty());
        self.request_break(frame.after);
        let styles = element_styles(name);
        self.styles.extend_from_slice(styles);
        frame.styles = styles.len();

        let config = self.ctx.config;
        match name {
            "br" => self.line_break(),
            "hr" => self.rule(),
            "img" => self.image(node),
            "input" => self.input(id, node),
            "select" => {
                walker.skip_children();
                self.select(id, node);
            },
            "textarea" => {
                walker.skip_children();
                self.textarea(id, node);
            },
            "button" => {
                walker.skip_children();
                self.button(id, node);
            },
            "a" => {
                if let Some(href) = node.attribute("href") {
                    let target = Target {
                        url: resolve_target(self.ctx.base, href),
                        seq: self.next_seq(),
                    };
                    frame.link = Some(self.link.replace(target));
                }
            },
            "form" => {
                let action = match node.attribute("action") {
                    Some(action) => resolve_target(self.ctx.base, action),
                    None => self.ctx.document_url.to_string(),
                };
                let method = FormMethod::from_attr(node.attribute("method"));
                let form = self.model.emplace_form(action, method);
                self.forms.push(form);
                frame.form = true;
            },
            "ul" | "ol" | "menu" | "dir" => {
                let ordered = name == "ol";
                let next = if ordered {
                    node.attribute("start")
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(1)
                } else {
                    1
                };
                self.lists.push(List { ordered, next });
                frame.list = true;
                frame.indent = config.list_indent;
            },
            "li" => {
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(list) if list.ordered => {
                        let n = list.next;
                        list.next = n.saturating_add(1);
                        format!("{n}. ")
                    },
                    _ => format!("{} ", config.bullet(depth)),
                };
                self.prefix = Some(marker);
                frame.hang = Some(std::mem::take(&mut self.hang));
            },
            "blockquote" | "dd" => frame.indent = config.quote_indent,
            "pre" => {
                self.pre_depth += 1;
                self.pre_start = true;
                frame.pre = true;
            },
            "td" | "th" => {
                if self.line_has_content && self.pending_break == 0 {
                    self.pending_space = true;
                }
            },
            _ => {},
        }
        self.indent += frame.indent;
        frame
    }

    fn close(&mut self, frame: Frame) {
        let keep = self.styles.len().saturating_sub(frame.styles);
        self.styles.truncate(keep);
        if let Some(previous) = frame.link {
            self.link = previous;
        }
        if frame.list {
            self.lists.pop();
        }
        self.indent = self.indent.saturating_sub(frame.indent);
        if frame.form {
            self.forms.pop();
        }
        if frame.pre {
            self.pre_depth = self.pre_depth.saturating_sub(1);
            self.pre_newlines = 0;
            self.pre_start = false;
        }
        if let Some(hang) = frame.hang {
            self.hang = hang;
            self.prefix = None;
        }
        self.request_break(frame.after);
    }

    fn image(&mut self, node: &Node) {
        let alt = collapse_whitespace(node.attribute("alt").unwrap_or(""));
        let previous = self.image.take();
        if let Some(src) = node.attribute("src").filter(|s| !s.trim().is_empty()) {
            self.image = Some(Target {
                url: resolve_target(self.ctx.base, src),
                seq: self.next_seq(),
            });
        }
        if alt.is_empty() {
            let placeholder = format!("[{}]", self.ctx.config.image_placeholder);
            self.word(&placeholder);
        } else {
            self.text(&alt);
        }
        self.image = previous;
    }

    // -- forms --------------------------------------------------------------

    fn current_form(&mut self) -> usize {
        if let Some(&form) = self.forms.last() {
            return form;
        }
        match self.implicit_form {
            Some(form) => form,
            None => {
                let form = self
                    .model
                    .emplace_form(self.ctx.document_url.to_string(), FormMethod::Get);
                self.implicit_form = Some(form);
                form
            },
        }
    }

    fn register_input(&mut self, input: FormInput) -> Option<usize> {
        let form = self.current_form();
        match self.model.emplace_form_input(form, input) {
            Ok(index) => Some(index),
            Err(err) => {
                log::error!("dropping form input: {err}");
                None
            },
        }
    }

    /// Emit `label` as one unit tagged with input `index`.
    fn placeholder(&mut self, index: usize, label: &str) {
        let seq = self.next_seq();
        let previous = self.input.replace((index, seq));
        self.word(label);
        self.input = previous;
    }

    fn field_size(&self, requested: Option<usize>, default: usize) -> usize {
        requested
            .unwrap_or(default)
            .min(self.columns.saturating_sub(2))
            .max(1)
    }

    fn input(&mut self, id: NodeId, node: &Node) {
        let kind = InputType::from_attr(node.attribute("type"));
        let checked = node.has_attribute("checked");
        let name = node.attribute("name").unwrap_or("").to_string();
        let value = match node.attribute("value") {
            Some(v) => v.to_string(),
            None if matches!(kind, InputType::Checkbox | InputType::Radio) => "on".to_string(),
            None => String::new(),
        };
        let active = match kind {
            InputType::Checkbox | InputType::Radio => checked,
            k => !k.is_control(),
        };
        let size = self.field_size(
            parse_size(node.attribute("size")),
            self.ctx.config.text_input_width,
        );
        let or = |v: &str, fallback: &str| {
            if v.is_empty() {
                fallback.to_string()
            } else {
                v.to_string()
            }
        };
        let label = match kind {
            InputType::Hidden => None,
            InputType::Checkbox => Some(if checked { "[x]" } else { "[ ]" }.to_string()),
            InputType::Radio => Some(if checked { "(*)" } else { "( )" }.to_string()),
            InputType::Submit => Some(format!("[{}]", or(&value, "Submit"))),
            InputType::Reset => Some(format!("[{}]", or(&value, "Reset"))),
            InputType::Button => Some(format!("[{value}]")),
            InputType::Image => {
                let alt = node.attribute("alt").unwrap_or("");
                Some(format!("[{}]", or(alt, &or(&value, "Submit"))))
            },
            InputType::Password => {
                let masked: String = value.chars().map(|_| '*').collect();
                Some(field(&masked, size, '_'))
            },
            _ => Some(field(&value, size, '_')),
        };

        let input = FormInput::new(kind, Some(id), name, value, active);
        if let Some(index) = self.register_input(input)
            && let Some(label) = label
        {
            self.placeholder(index, &label);
        }
    }

    fn select(&mut self, id: NodeId, node: &Node) {
        let tree = self.tree;
        let name = node.attribute("name").unwrap_or("").to_string();
        let multiple = node.has_attribute("multiple");

        struct Choice {
            node: NodeId,
            label: String,
            value: String,
            selected: bool,
        }
        let choices: Vec<Choice> = tree
            .descendants(id)
            .filter(|&o| tree.get(o).and_then(Node::name) == Some("option"))
            .map(|o| {
                let label = collapse_whitespace(&tree.text_content(o));
                let value = tree
                    .attribute(o, "value")
                    .map_or_else(|| label.clone(), str::to_string);
                let selected = tree.get(o).is_some_and(|n| n.has_attribute("selected"));
                Choice {
                    node: o,
                    label,
                    value,
                    selected,
                }
            })
            .collect();

        let active: Vec<bool> = if multiple {
            choices.iter().map(|c| c.selected).collect()
        } else {
            let pick = choices
                .iter()
                .rposition(|c| c.selected)
                .or((!choices.is_empty()).then_some(0));
            (0..choices.len()).map(|i| Some(i) == pick).collect()
        };
        let (label, value) = active
            .iter()
            .position(|&a| a)
            .map(|i| (choices[i].label.clone(), choices[i].value.clone()))
            .unwrap_or_default();

        let container = FormInput::new(InputType::Select, Some(id), name.clone(), value, false);
        let Some(index) = self.register_input(container) else {
            return;
        };
        self.placeholder(index, &format!("[{label}]"));
        for (choice, active) in choices.into_iter().zip(active) {
            let option = FormInput::new(
                InputType::Option,
                Some(choice.node),
                name.clone(),
                choice.value,
                active,
            );
            self.register_input(option);
        }
    }

    fn textarea(&mut self, id: NodeId, node: &Node) {
        let config = self.ctx.config;
        let rows = parse_size(node.attribute("rows"))
            .unwrap_or(config.textarea_rows)
            .min(config.max_textarea_rows.max(1));
        let cols = self.field_size(parse_size(node.attribute("cols")), config.textarea_cols);
        let raw = self.tree.text_content(id);
        let value = raw.strip_prefix('\n').unwrap_or(&raw).to_string();
        let name = node.attribute("name").unwrap_or("").to_string();

        let input = FormInput::new(InputType::Textarea, Some(id), name, value.clone(), true);
        let Some(index) = self.register_input(input) else {
            return;
        };
        let seq = self.next_seq();
        let previous = self.input.replace((index, seq));
        let mut lines = value.lines();
        for _ in 0..rows {
            let line = expand_tabs(lines.next().unwrap_or(""), config.tab_width);
            self.request_break(1);
            self.word(&field(&line, cols, ' '));
        }
        self.input = previous;
        self.request_break(1);
    }

    fn button(&mut self, id: NodeId, node: &Node) {
        let kind = match node.attribute("type").map(str::to_ascii_lowercase).as_deref() {
            Some("reset") => InputType::Reset,
            Some("button") => InputType::Button,
            _ => InputType::Submit,
        };
        let mut label = collapse_whitespace(&self.tree.text_content(id));
        if label.is_empty() {
            label = match kind {
                InputType::Reset => "Reset".to_string(),
                InputType::Submit => "Submit".to_string(),
                _ => String::new(),
            };
        }
        let name = node.attribute("name").unwrap_or("").to_string();
        let value = node.attribute("value").unwrap_or("").to_string();
        if let Some(index) = self.register_input(FormInput::new(kind, Some(id), name, value, false)) {
            self.placeholder(index, &format!("[{label}]"));
        }
    }

    // -- breaks and lines ---------------------------------------------------

    fn request_break(&mut self, level: u8) {
        if self.model.line_count() > 0 {
            self.pending_break = self.pending_break.max(level.min(2));
        }
    }

    fn line_break(&mut self) {
        if self.pre_depth > 0 {
            self.pre_newlines += 1;
        } else if self.model.line_count() > 0 {
            self.pending_break = (self.pending_break + 1).min(2);
        }
    }

    fn cursor(&self) -> BufferIndex {
        BufferIndex::new(self.model.line_count().saturating_sub(1), self.line_width)
    }

    fn push_node(&mut self, node: BufferNode) {
        if self.model.line_count() == 0 {
            self.model.push_line(BufferLine::default());
        }
        if let Some(line) = self.model.last_line_mut() {
            line.nodes.push(node);
        }
    }

    /// Start a fresh row, indented by the current block indent plus the
    /// list-item hang, capped at half the width.
    fn start_line(&mut self) {
        self.model.push_line(BufferLine::default());
        self.line_width = 0;
        self.line_has_content = false;
        self.pending_space = false;
        self.last_run = None;
        let lead = (self.indent + self.hang).min(self.columns / 2);
        if lead > 0 {
            self.push_node(BufferNode::reserved(" ".repeat(lead)));
            self.line_width = lead;
        }
    }

    /// Apply pending breaks and list markers before visible content.
    fn open_content(&mut self) {
        if self.model.line_count() == 0 {
            self.start_line();
        } else if self.pending_break > 0 {
            if self.pending_break > 1 {
                self.model.push_line(BufferLine::default());
            }
            self.start_line();
        }
        self.pending_break = 0;

        if let Some(prefix) = self.prefix.take() {
            let width = display_width(&prefix);
            if !self.line_has_content && self.line_width + width <= self.columns / 2 {
                self.push_node(BufferNode::reserved(prefix));
                self.line_width += width;
                self.hang = width;
            }
        }
    }

    fn mark_sections(&mut self) {
        if self.sections.is_empty() {
            return;
        }
        let at = self.cursor();
        for id in self.sections.drain(..) {
            self.model.add_section(id, at);
        }
    }

    fn rule(&mut self) {
        self.request_break(1);
        self.open_content();
        self.mark_sections();
        let cell = char_width(self.ctx.config.rule_char).max(1);
        let count = self.columns.saturating_sub(self.line_width) / cell;
        let rule: String = std::iter::repeat_n(self.ctx.config.rule_char, count).collect();
        self.line_width += count * cell;
        self.push_node(BufferNode::reserved(rule));
        self.line_has_content = true;
        self.last_run = None;
        self.request_break(1);
    }

    // -- runs ---------------------------------------------------------------

    fn run_key(&self) -> RunKey {
        let mut styles: Vec<Style> = Vec::with_capacity(self.styles.len());
        for style in &self.styles {
            if !styles.contains(style) {
                styles.push(*style);
            }
        }
        RunKey {
            styles,
            link: self.link.as_ref().map(|t| t.seq),
            image: self.image.as_ref().map(|t| t.seq),
            input: self.input.map(|(_, seq)| seq),
        }
    }

    /// Append `text` to the current row, extending the last run when its
    /// attributes match.
    fn emit_run(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let key = self.run_key();
        let at = self.cursor();
        let merged = self.last_run.as_ref() == Some(&key)
            && match self.model.last_line_mut().and_then(|l| l.nodes.last_mut()) {
                Some(node) if !node.reserved => {
                    node.text.push_str(text);
                    true
                },
                _ => false,
            };
        if !merged {
            let mut node = BufferNode::new(text);
            node.styles = key.styles.clone();
            if let Some(link) = &self.link {
                node.link = Some(self.model.emplace_link(&link.url, at));
                node.styles.push(Style::Link);
            }
            if let Some(image) = &self.image {
                node.image = Some(self.model.emplace_image(&image.url, at));
                node.styles.push(Style::Image);
            }
            if let Some((input, _)) = self.input {
                node.input = Some(input);
                self.model.add_input_referer(input, at);
                node.styles.push(Style::Input);
            }
            self.push_node(node);
            self.last_run = Some(key);
        }
        self.line_width += display_width(text);
        self.line_has_content = true;
    }

    /// A single inter-word space. It joins the previous run unless that
    /// run belongs to a different link, image or input.
    fn emit_space(&mut self) {
        let key = self.run_key();
        let same_run = self.last_run.as_ref() == Some(&key);
        let joined = match self.model.last_line_mut().and_then(|l| l.nodes.last_mut()) {
            Some(node)
                if !node.reserved
                    && (same_run
                        || (node.link.is_none() && node.image.is_none() && node.input.is_none())) =>
            {
                node.text.push(' ');
                true
            },
            _ => false,
        };
        if !joined {
            self.push_node(BufferNode::new(" "));
            self.last_run = Some(RunKey::default());
        }
        self.line_width += 1;
    }

    fn wrap_line(&mut self) {
        self.start_line();
    }

    /// Place one unbreakable unit, wrapping before it if it does not fit
    /// and hard-breaking it if it is wider than a whole row.
    fn word(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        self.open_content();
        let space = self.pending_space && self.line_has_content;
        self.pending_space = false;
        let width = display_width(word);
        if self.line_has_content && self.line_width + usize::from(space) + width > self.columns {
            self.wrap_line();
        } else if space {
            self.emit_space();
        }
        self.mark_sections();

        let mut rest = word;
        loop {
            let avail = self.columns.saturating_sub(self.line_width);
            let (head, tail) = split_at_width(rest, avail);
            if tail.is_empty() {
                self.emit_run(head);
                return;
            }
            if head.is_empty() && self.line_has_content {
                self.wrap_line();
                continue;
            }
            let (head, tail) = split_at_width_forced(rest, avail);
            self.emit_run(head);
            if tail.is_empty() {
                return;
            }
            self.wrap_line();
            rest = tail;
        }
    }

    fn text(&mut self, text: &str) {
        if self.pre_depth > 0 {
            self.preformatted(text);
            return;
        }
        if text.starts_with(|c: char| c.is_ascii_whitespace()) {
            self.pending_space = true;
        }
        for (i, word) in text.split_ascii_whitespace().enumerate() {
            if i > 0 {
                self.pending_space = true;
            }
            self.word(word);
        }
        if text.ends_with(|c: char| c.is_ascii_whitespace()) {
            self.pending_space = true;
        }
    }

    /// Text inside `<pre>`: newlines are kept, nothing collapses, and
    /// rows are only broken at the width boundary.
    fn preformatted(&mut self, text: &str) {
        let mut text = text;
        if std::mem::take(&mut self.pre_start) {
            text = text
                .strip_prefix("\r\n")
                .or_else(|| text.strip_prefix('\n'))
                .unwrap_or(text);
        }
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                self.pre_newlines += 1;
            }
            let segment = segment.strip_suffix('\r').unwrap_or(segment);
            if segment.is_empty() {
                continue;
            }
            let expanded = expand_tabs(segment, self.ctx.config.tab_width);
            self.pre_segment(&expanded);
        }
    }

    fn pre_segment(&mut self, segment: &str) {
        self.open_content();
        for _ in 0..std::mem::take(&mut self.pre_newlines) {
            self.start_line();
        }
        self.mark_sections();
        let mut rest = segment;
        while !rest.is_empty() {
            let avail = self.columns.saturating_sub(self.line_width);
            if avail == 0 {
                self.start_line();
                continue;
            }
            let (head, tail) = split_at_width_forced(rest, avail);
            self.emit_run(head);
            rest = tail;
            if !rest.is_empty() {
                self.start_line();
            }
        }
    }
}
