//! Document model: the positional buffer and its reference indices.
//!
//! A render pass fills a [`DocumentModel`] from scratch: rows of styled
//! [`BufferNode`]s plus the link, image, form, input and section
//! collections they point into. Buffer nodes hold plain indices into
//! those collections, which only grow during a pass and are wiped
//! together by [`DocumentModel::clear`].
//!
//! [`Document`] pairs a model with the source it was rendered from, so
//! a resize re-renders from the original text or tree.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::ops::Deref;

use termweb_types::{BrowseError, RenderConfig, Result};

use crate::render::{markup, text, wrap};
use crate::tree::{Label, NodeId, Tree};
use crate::url::Url;

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// `(line, column)` position in the rendered buffer. Columns count
/// terminal cells, not bytes or characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferIndex {
    pub line: usize,
    pub column: usize,
}

impl BufferIndex {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Presentation tag on a buffer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Heading(u8),
    Link,
    Image,
    Input,
}

/// One styled run of text inside a line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferNode {
    pub text: String,
    /// Structural filler (indentation, list markers, rules).
    pub reserved: bool,
    pub styles: Vec<Style>,
    pub link: Option<usize>,
    pub image: Option<usize>,
    pub input: Option<usize>,
}

impl BufferNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn reserved(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reserved: true,
            ..Self::default()
        }
    }

    /// Width in terminal cells.
    pub fn width(&self) -> usize {
        wrap::display_width(&self.text)
    }

    pub fn has_style(&self, style: Style) -> bool {
        self.styles.contains(&style)
    }
}

/// A rendered row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferLine {
    pub nodes: Vec<BufferNode>,
}

impl BufferLine {
    pub fn width(&self) -> usize {
        self.nodes.iter().map(BufferNode::width).sum()
    }

    /// Concatenated text of every node.
    pub fn text(&self) -> String {
        self.nodes.iter().map(|n| n.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// References and forms
// ---------------------------------------------------------------------------

/// A link or image target and every position that displays it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub url: String,
    pub referers: Vec<BufferIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMethod {
    #[default]
    Get,
    Post,
}

impl FormMethod {
    /// Parse a `method` attribute; anything but `post` means GET.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("post") => Self::Post,
            _ => Self::Get,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Text,
    Password,
    Checkbox,
    Radio,
    Submit,
    Reset,
    Button,
    Hidden,
    Image,
    File,
    Textarea,
    Select,
    Option,
}

impl InputType {
    /// Map an `<input type=...>` value. Unknown and missing types are
    /// text fields.
    pub fn from_attr(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Text;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "password" => Self::Password,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "submit" => Self::Submit,
            "reset" => Self::Reset,
            "button" => Self::Button,
            "hidden" => Self::Hidden,
            "image" => Self::Image,
            "file" => Self::File,
            _ => Self::Text,
        }
    }

    /// Controls that only trigger actions and never carry a value into
    /// a submission.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            Self::Submit | Self::Reset | Self::Button | Self::Image | Self::Select
        )
    }
}

/// A single interactive field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInput {
    kind: InputType,
    form: usize,
    node: Option<NodeId>,
    name: String,
    value: String,
    active: bool,
    buffer_nodes: Vec<BufferIndex>,
}

impl FormInput {
    pub fn new(
        kind: InputType,
        node: Option<NodeId>,
        name: impl Into<String>,
        value: impl Into<String>,
        active: bool,
    ) -> Self {
        Self {
            kind,
            form: 0,
            node,
            name: name.into(),
            value: value.into(),
            active,
            buffer_nodes: Vec::new(),
        }
    }

    pub fn kind(&self) -> InputType {
        self.kind
    }

    /// Index of the owning form.
    pub fn form(&self) -> usize {
        self.form
    }

    /// Tree node this input was rendered from.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Positions of the buffer nodes that display this input.
    pub fn buffer_nodes(&self) -> &[BufferIndex] {
        &self.buffer_nodes
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// A form and the inputs that belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub action: String,
    pub method: FormMethod,
    inputs_by_name: BTreeMap<String, Vec<usize>>,
    inputs: Vec<usize>,
}

impl Form {
    pub fn new(action: impl Into<String>, method: FormMethod) -> Self {
        Self {
            action: action.into(),
            method,
            inputs_by_name: BTreeMap::new(),
            inputs: Vec::new(),
        }
    }

    /// Input indices in document order.
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    /// Input indices sharing `name`.
    pub fn inputs_named(&self, name: &str) -> &[usize] {
        self.inputs_by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names that have at least one input.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inputs_by_name.keys().map(String::as_str)
    }

    /// `(name, value)` pairs that a submission would carry: active,
    /// named, non-control inputs, in document order.
    pub fn values(&self, inputs: &[FormInput]) -> Vec<(String, String)> {
        self.inputs
            .iter()
            .filter_map(|&i| inputs.get(i))
            .filter(|input| input.active && !input.name.is_empty() && !input.kind.is_control())
            .map(|input| (input.name.clone(), input.value.clone()))
            .collect()
    }

    fn add(&mut self, index: usize, name: &str) {
        self.inputs.push(index);
        self.group_insert(index, name);
    }

    fn group_insert(&mut self, index: usize, name: &str) {
        if !name.is_empty() {
            self.inputs_by_name
                .entry(name.to_string())
                .or_default()
                .push(index);
        }
    }

    fn group_remove(&mut self, index: usize, name: &str) {
        if let Some(group) = self.inputs_by_name.get_mut(name) {
            group.retain(|&i| i != index);
            if group.is_empty() {
                self.inputs_by_name.remove(name);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentModel
// ---------------------------------------------------------------------------

/// Format-independent render result.
#[derive(Debug, Clone, Default)]
pub struct DocumentModel {
    buffer: Vec<BufferLine>,
    links: Vec<Reference>,
    images: Vec<Reference>,
    link_by_url: HashMap<String, usize>,
    image_by_url: HashMap<String, usize>,
    forms: Vec<Form>,
    inputs: Vec<FormInput>,
    sections: HashMap<String, BufferIndex>,
    title: Option<String>,
}

fn out_of_range(what: &str, index: usize) -> BrowseError {
    BrowseError::invalid(format!("no {what} with index {index}"))
}

impl DocumentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every line, reference, form, input and section.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.links.clear();
        self.images.clear();
        self.link_by_url.clear();
        self.image_by_url.clear();
        self.forms.clear();
        self.inputs.clear();
        self.sections.clear();
        self.title = None;
    }

    pub fn lines(&self) -> &[BufferLine] {
        &self.buffer
    }

    pub fn line(&self, index: usize) -> Option<&BufferLine> {
        self.buffer.get(index)
    }

    pub fn links(&self) -> &[Reference] {
        &self.links
    }

    pub fn images(&self) -> &[Reference] {
        &self.images
    }

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    pub fn inputs(&self) -> &[FormInput] {
        &self.inputs
    }

    pub fn link(&self, index: usize) -> Result<&Reference> {
        self.links.get(index).ok_or_else(|| out_of_range("link", index))
    }

    pub fn image(&self, index: usize) -> Result<&Reference> {
        self.images.get(index).ok_or_else(|| out_of_range("image", index))
    }

    pub fn form(&self, index: usize) -> Result<&Form> {
        self.forms.get(index).ok_or_else(|| out_of_range("form", index))
    }

    pub fn input(&self, index: usize) -> Result<&FormInput> {
        self.inputs.get(index).ok_or_else(|| out_of_range("form input", index))
    }

    /// Index of the link with this exact target, if registered.
    pub fn link_index(&self, url: &str) -> Option<usize> {
        self.link_by_url.get(url).copied()
    }

    /// Position of a named anchor, or `None` if the document has none.
    pub fn get_section_index(&self, id: &str) -> Option<BufferIndex> {
        self.sections.get(id).copied()
    }

    pub fn sections(&self) -> &HashMap<String, BufferIndex> {
        &self.sections
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Submission pairs of one form.
    pub fn form_values(&self, form: usize) -> Result<Vec<(String, String)>> {
        Ok(self.form(form)?.values(&self.inputs))
    }

    /// The whole buffer as text, one row per line.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.buffer.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.text());
        }
        out
    }

    // -- position lookup ----------------------------------------------------

    /// Buffer node covering `pos`.
    pub fn node_at(&self, pos: BufferIndex) -> Option<&BufferNode> {
        let line = self.buffer.get(pos.line)?;
        let mut start = 0;
        for node in &line.nodes {
            let end = start + node.width();
            if pos.column >= start && pos.column < end {
                return Some(node);
            }
            start = end;
        }
        None
    }

    pub fn link_at(&self, pos: BufferIndex) -> Option<usize> {
        self.node_at(pos).and_then(|n| n.link)
    }

    pub fn image_at(&self, pos: BufferIndex) -> Option<usize> {
        self.node_at(pos).and_then(|n| n.image)
    }

    pub fn input_at(&self, pos: BufferIndex) -> Option<usize> {
        self.node_at(pos).and_then(|n| n.input)
    }

    // -- render-side factories ----------------------------------------------

    pub(crate) fn push_line(&mut self, line: BufferLine) {
        self.buffer.push(line);
    }

    pub(crate) fn last_line_mut(&mut self) -> Option<&mut BufferLine> {
        self.buffer.last_mut()
    }

    pub(crate) fn line_count(&self) -> usize {
        self.buffer.len()
    }

    /// Register (or reuse) the link for `url` and record `at` as a referer.
    pub(crate) fn emplace_link(&mut self, url: &str, at: BufferIndex) -> usize {
        Self::emplace_reference(&mut self.links, &mut self.link_by_url, url, at)
    }

    /// Register (or reuse) the image for `url` and record `at` as a referer.
    pub(crate) fn emplace_image(&mut self, url: &str, at: BufferIndex) -> usize {
        Self::emplace_reference(&mut self.images, &mut self.image_by_url, url, at)
    }

    fn emplace_reference(
        refs: &mut Vec<Reference>,
        by_url: &mut HashMap<String, usize>,
        url: &str,
        at: BufferIndex,
    ) -> usize {
        let index = *by_url.entry(url.to_string()).or_insert_with(|| {
            refs.push(Reference {
                url: url.to_string(),
                referers: Vec::new(),
            });
            refs.len() - 1
        });
        refs[index].referers.push(at);
        index
    }

    pub(crate) fn emplace_form(&mut self, action: String, method: FormMethod) -> usize {
        self.forms.push(Form::new(action, method));
        self.forms.len() - 1
    }

    /// Append `input` to form `form` and return its index.
    pub(crate) fn emplace_form_input(&mut self, form: usize, mut input: FormInput) -> Result<usize> {
        let index = self.inputs.len();
        let owner = self
            .forms
            .get_mut(form)
            .ok_or_else(|| out_of_range("form", form))?;
        owner.add(index, &input.name);
        input.form = form;
        self.inputs.push(input);
        Ok(index)
    }

    pub(crate) fn add_input_referer(&mut self, input: usize, at: BufferIndex) {
        if let Some(input) = self.inputs.get_mut(input) {
            input.buffer_nodes.push(at);
        }
    }

    /// Record an anchor; the first occurrence of an id wins.
    pub(crate) fn add_section(&mut self, id: String, at: BufferIndex) {
        self.sections.entry(id).or_insert(at);
    }

    pub(crate) fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> Result<&mut FormInput> {
        self.inputs
            .get_mut(index)
            .ok_or_else(|| out_of_range("form input", index))
    }

    /// Move an input to another name group of its form.
    pub(crate) fn rename_input(&mut self, index: usize, name: &str) -> Result<()> {
        let input = self.input_mut(index)?;
        let old = std::mem::replace(&mut input.name, name.to_string());
        let form = input.form;
        let owner = self
            .forms
            .get_mut(form)
            .ok_or_else(|| out_of_range("form", form))?;
        owner.group_remove(index, &old);
        owner.group_insert(index, name);
        Ok(())
    }

    /// Radios of the same group in the same form, other than `index`.
    pub(crate) fn radio_siblings(&self, index: usize) -> Result<Vec<usize>> {
        let input = self.input(index)?;
        let form = self.form(input.form)?;
        Ok(form
            .inputs_named(&input.name)
            .iter()
            .copied()
            .filter(|&i| i != index && self.inputs[i].kind == InputType::Radio)
            .collect())
    }

    /// Leave at most one active radio per group: the last checked one.
    pub(crate) fn normalize_radio_groups(&mut self) -> Vec<usize> {
        let mut deactivated = Vec::new();
        for form in &self.forms {
            for group in form.inputs_by_name.values() {
                let mut checked = group
                    .iter()
                    .copied()
                    .filter(|&i| self.inputs[i].kind == InputType::Radio && self.inputs[i].active);
                let Some(mut keep) = checked.next() else { continue };
                for later in checked {
                    deactivated.push(keep);
                    keep = later;
                }
            }
        }
        for &i in &deactivated {
            self.inputs[i].active = false;
        }
        deactivated
    }

    /// Drop every referer of link `index` and unmark its buffer nodes.
    pub(crate) fn clear_link(&mut self, index: usize) -> Result<()> {
        let link = self
            .links
            .get_mut(index)
            .ok_or_else(|| out_of_range("link", index))?;
        link.referers.clear();
        self.nodes_mut()
            .filter(|n| n.link == Some(index))
            .for_each(|n| {
                n.link = None;
                n.styles.retain(|s| *s != Style::Link);
            });
        Ok(())
    }

    /// Drop every referer of image `index` and unmark its buffer nodes.
    pub(crate) fn clear_image(&mut self, index: usize) -> Result<()> {
        let image = self
            .images
            .get_mut(index)
            .ok_or_else(|| out_of_range("image", index))?;
        image.referers.clear();
        self.nodes_mut()
            .filter(|n| n.image == Some(index))
            .for_each(|n| {
                n.image = None;
                n.styles.retain(|s| *s != Style::Image);
            });
        Ok(())
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut BufferNode> {
        self.buffer.iter_mut().flat_map(|line| line.nodes.iter_mut())
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// What a [`Document`] re-renders from.
#[derive(Debug, Clone)]
pub enum Source {
    PlainText(String),
    Markup { tree: Tree, base: Option<Url> },
}

/// How raw input should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    PlainText,
    Html,
}

/// A rendered document together with its retained source.
#[derive(Debug, Clone)]
pub struct Document {
    model: DocumentModel,
    source: Source,
    uri: Option<String>,
    config: RenderConfig,
    columns: usize,
}

impl Deref for Document {
    type Target = DocumentModel;

    fn deref(&self) -> &DocumentModel {
        &self.model
    }
}

impl Document {
    /// A plain-text document. Nothing is rendered until [`Document::redraw`].
    pub fn plain_text(text: impl Into<String>, config: RenderConfig) -> Self {
        Self {
            model: DocumentModel::new(),
            source: Source::PlainText(text.into()),
            uri: None,
            columns: 0,
            config,
        }
    }

    /// A markup document over an already-parsed tree.
    ///
    /// Relative targets are resolved against `uri`, or against the
    /// document's `<base href>` when it has one.
    pub fn markup(tree: Tree, uri: Option<&str>, config: RenderConfig) -> Self {
        let origin = uri.and_then(Url::parse);
        let base = tree
            .find_first("base")
            .and_then(|id| tree.attribute(id, "href"))
            .and_then(|href| match &origin {
                Some(origin) => origin.resolve(href),
                None => Url::parse(href),
            })
            .or(origin);
        Self {
            model: DocumentModel::new(),
            source: Source::Markup { tree, base },
            uri: uri.map(str::to_string),
            columns: 0,
            config,
        }
    }

    /// Parse `input` as HTML.
    pub fn html(input: &str, uri: Option<&str>, config: RenderConfig) -> Self {
        Self::markup(crate::html::parse(input), uri, config)
    }

    /// Read a whole stream and build a document of the given kind.
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn from_reader<R: Read>(
        mut reader: R,
        kind: SourceKind,
        uri: Option<&str>,
        config: RenderConfig,
    ) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = String::from_utf8_lossy(&bytes);
        let mut doc = match kind {
            SourceKind::PlainText => Self::plain_text(text.into_owned(), config),
            SourceKind::Html => Self::html(&text, uri, config),
        };
        doc.uri = uri.map(str::to_string);
        Ok(doc)
    }

    pub fn model(&self) -> &DocumentModel {
        &self.model
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Width of the last render pass (0 before the first).
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Re-render the buffer and every index from the retained source.
    pub fn redraw(&mut self, columns: usize) {
        let columns = self.config.clamp_columns(columns);
        self.model.clear();
        match &self.source {
            Source::PlainText(source) => {
                text::render(&mut self.model, source, columns, &self.config);
            },
            Source::Markup { tree, base } => {
                let ctx = markup::Context {
                    columns,
                    config: &self.config,
                    base: base.as_ref(),
                    document_url: self.uri.as_deref().unwrap_or(""),
                };
                markup::render(&mut self.model, tree, &ctx);
            },
        }
        self.columns = columns;
        log::debug!(
            "rendered {} lines at width {columns}: {} links, {} images, {} forms, {} inputs",
            self.model.line_count(),
            self.model.links.len(),
            self.model.images.len(),
            self.model.forms.len(),
            self.model.inputs.len(),
        );
    }

    pub fn clear(&mut self) {
        self.model.clear();
    }

    pub fn form_values(&self, form: usize) -> Result<Vec<(String, String)>> {
        self.model.form_values(form)
    }

    // -- form editing -------------------------------------------------------

    fn tree_mut(&mut self) -> Option<&mut Tree> {
        match &mut self.source {
            Source::Markup { tree, .. } => Some(tree),
            Source::PlainText(_) => None,
        }
    }

    /// Change an input's value. The originating tree node is updated too,
    /// so the edit survives the next redraw.
    pub fn set_input_value(&mut self, index: usize, value: &str) -> Result<()> {
        let input = self.model.input_mut(index)?;
        input.set_value(value);
        let kind = input.kind;
        let node = input.node;
        let (Some(node), Some(tree)) = (node, self.tree_mut()) else {
            return Ok(());
        };
        match kind {
            InputType::Textarea => {
                for child in tree.children(node).to_vec() {
                    tree.remove_child(node, child)?;
                }
                if !value.is_empty() {
                    tree.append_child(node, Label::Text, Some(value.to_string()))?;
                }
            },
            InputType::Select | InputType::Option => {},
            _ => tree.set_attribute(node, "value", value)?,
        }
        Ok(())
    }

    /// Include or exclude an input from submission. Checkbox, radio and
    /// option state is mirrored into the tree.
    pub fn set_input_active(&mut self, index: usize, active: bool) -> Result<()> {
        let input = self.model.input_mut(index)?;
        input.set_active(active);
        let kind = input.kind;
        let node = input.node;
        let attr = match kind {
            InputType::Checkbox | InputType::Radio => "checked",
            InputType::Option => "selected",
            _ => return Ok(()),
        };
        if let (Some(node), Some(tree)) = (node, self.tree_mut()) {
            if active {
                tree.set_attribute(node, attr, "")?;
            } else {
                tree.remove_attribute(node, attr)?;
            }
        }
        Ok(())
    }

    /// Activate one radio and deactivate the rest of its group.
    pub fn check_radio(&mut self, index: usize) -> Result<()> {
        if self.model.input(index)?.kind != InputType::Radio {
            return Err(BrowseError::invalid(format!("input {index} is not a radio button")));
        }
        for sibling in self.model.radio_siblings(index)? {
            self.set_input_active(sibling, false)?;
        }
        self.set_input_active(index, true)
    }

    /// Give an input a new name, moving it between name groups.
    pub fn rename_input(&mut self, index: usize, name: &str) -> Result<()> {
        self.model.rename_input(index, name)?;
        let node = self.model.input(index)?.node;
        if let (Some(node), Some(tree)) = (node, self.tree_mut()) {
            tree.set_attribute(node, "name", name)?;
        }
        Ok(())
    }

    pub fn clear_link(&mut self, index: usize) -> Result<()> {
        self.model.clear_link(index)
    }

    pub fn clear_image(&mut self, index: usize) -> Result<()> {
        self.model.clear_image(index)
    }
}
