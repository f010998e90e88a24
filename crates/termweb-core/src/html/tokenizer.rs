//! Lenient HTML tokenizer.
//!
//! Turns markup into a stream of start tags, end tags and text. It is a
//! practical subset of the HTML tokenization rules: enough for pages
//! found in the wild, not a conformance target. Comments, `<!DOCTYPE>`
//! and `<?...?>` directives are consumed and dropped. `<script>` and
//! `<style>` bodies are raw text; `<title>` and `<textarea>` bodies are
//! raw text with character references decoded.
//!
//! The tokenizer never fails. An attribute quote that never closes ends
//! its value at the next whitespace or `>`; a tag still open at end of
//! input after that is given back as literal text.

use super::entities;
use crate::tree::Attribute;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

/// A single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text(String),
}

// ---------------------------------------------------------------------------
// Internal types
// ---------------------------------------------------------------------------

/// Tag scanner states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueQuoted(char),
    AttributeValueUnquoted,
}

/// Builder used while assembling a tag token.
#[derive(Debug, Default)]
struct TagBuilder {
    name: String,
    attributes: Vec<Attribute>,
    self_closing: bool,
    is_end_tag: bool,
    attr_name: String,
    attr_value: String,
}

impl TagBuilder {
    fn new(is_end_tag: bool) -> Self {
        Self {
            is_end_tag,
            ..Self::default()
        }
    }

    /// Push the pending attribute. A repeated name keeps its first value.
    fn finish_attribute(&mut self) {
        let name = std::mem::take(&mut self.attr_name);
        let value = std::mem::take(&mut self.attr_value);
        if name.is_empty() || self.attributes.iter().any(|a| a.name == name) {
            return;
        }
        let value = entities::decode(&value).into_owned();
        self.attributes.push(Attribute { name, value });
    }

    fn into_token(mut self) -> Token {
        self.finish_attribute();
        if self.is_end_tag {
            Token::EndTag { name: self.name }
        } else {
            Token::StartTag {
                name: self.name,
                attributes: self.attributes,
                self_closing: self.self_closing,
            }
        }
    }
}

/// Raw-text element currently being scanned.
#[derive(Debug)]
struct RawText {
    end_tag: String,
    decode: bool,
}

fn raw_text_kind(name: &str) -> Option<bool> {
    match name {
        "script" | "style" | "xmp" => Some(false),
        "title" | "textarea" => Some(true),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Iterator of [`Token`]s over a string slice.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw: Option<RawText>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// True if `<` at the start of `s` opens something the tokenizer
    /// treats as markup rather than text.
    fn opens_markup(s: &str) -> bool {
        let mut chars = s.chars();
        if chars.next() != Some('<') {
            return false;
        }
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => true,
            Some('!' | '?') => true,
            Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
            _ => false,
        }
    }

    /// Text up to the next markup-opening `<`.
    fn scan_text(&mut self) -> Token {
        let rest = self.rest();
        let mut end = rest.len();
        for (i, _) in rest.match_indices('<').filter(|&(i, _)| i > 0) {
            if Self::opens_markup(&rest[i..]) {
                end = i;
                break;
            }
        }
        self.pos += end;
        Token::Text(entities::decode(&rest[..end]).into_owned())
    }

    /// Body of a raw-text element up to its end tag (or end of input).
    fn scan_raw_text(&mut self, raw: &RawText) -> Option<Token> {
        let rest = self.rest();
        let mut end = rest.len();
        for (i, _) in rest.match_indices("</") {
            let after = &rest[i + 2..];
            let Some(candidate) = after.get(..raw.end_tag.len()) else {
                continue;
            };
            let terminated = after[raw.end_tag.len()..]
                .chars()
                .next()
                .is_none_or(|c| c == '>' || c == '/' || c.is_ascii_whitespace());
            if candidate.eq_ignore_ascii_case(&raw.end_tag) && terminated {
                end = i;
                break;
            }
        }
        self.pos += end;
        if end == 0 {
            return None;
        }
        let body = &rest[..end];
        let text = if raw.decode {
            entities::decode(body).into_owned()
        } else {
            body.to_string()
        };
        Some(Token::Text(text))
    }

    /// Skip `<!-- ... -->`, `<!...>` or `<?...>`. An unterminated
    /// comment runs to end of input.
    fn skip_directive(&mut self) -> bool {
        let rest = self.rest();
        if let Some(body) = rest.strip_prefix("<!--") {
            self.pos += match body.find("-->") {
                Some(i) => 4 + i + 3,
                None => rest.len(),
            };
            return true;
        }
        match rest.find('>') {
            Some(i) => {
                self.pos += i + 1;
                true
            },
            None => false,
        }
    }

    /// Scan a tag starting at `<`. Returns `None` if input ends before
    /// the closing `>`.
    ///
    /// A quoted attribute value still open at end of input is scanned
    /// again as an unquoted value, ending at whitespace or `>`.
    fn scan_tag(&mut self) -> Option<Token> {
        let mut unquoted = Vec::new();
        loop {
            match self.scan_tag_with(&unquoted) {
                Ok(token) => return Some(token),
                Err(Some(quote_at)) => {
                    log::trace!("unterminated attribute quote, value ends at whitespace or '>'");
                    unquoted.push(quote_at);
                },
                Err(None) => return None,
            }
        }
    }

    /// One scanning attempt. Quotes at the offsets in `unquoted` open an
    /// unquoted value. On failure, returns the offset of the quote left
    /// open at end of input, if that is why the tag did not close.
    fn scan_tag_with(&mut self, unquoted: &[usize]) -> Result<Token, Option<usize>> {
        let rest = self.rest();
        let is_end_tag = rest.starts_with("</");
        let skip = if is_end_tag { 2 } else { 1 };
        let mut tag = TagBuilder::new(is_end_tag);
        let mut state = State::TagName;
        let mut chars = rest[skip..].char_indices().peekable();
        let mut quote_at = 0;

        while let Some((i, c)) = chars.next() {
            match state {
                State::TagName => match c {
                    '>' => return self.finish_tag(tag, skip + i + 1),
                    '/' if chars.peek().is_some_and(|&(_, n)| n == '>') => {
                        tag.self_closing = true;
                    },
                    c if c.is_ascii_whitespace() || c == '/' => {
                        state = State::BeforeAttributeName;
                    },
                    c => tag.name.extend(c.to_lowercase()),
                },
                State::BeforeAttributeName => match c {
                    '>' => return self.finish_tag(tag, skip + i + 1),
                    '/' if chars.peek().is_some_and(|&(_, n)| n == '>') => {
                        tag.self_closing = true;
                    },
                    c if c.is_ascii_whitespace() || c == '/' || c == '=' => {},
                    c => {
                        tag.attr_name.extend(c.to_lowercase());
                        state = State::AttributeName;
                    },
                },
                State::AttributeName => match c {
                    '>' => return self.finish_tag(tag, skip + i + 1),
                    '=' => state = State::BeforeAttributeValue,
                    '/' => {
                        tag.finish_attribute();
                        if chars.peek().is_some_and(|&(_, n)| n == '>') {
                            tag.self_closing = true;
                        }
                        state = State::BeforeAttributeName;
                    },
                    c if c.is_ascii_whitespace() => state = State::AfterAttributeName,
                    c => tag.attr_name.extend(c.to_lowercase()),
                },
                State::AfterAttributeName => match c {
                    '>' => return self.finish_tag(tag, skip + i + 1),
                    '=' => state = State::BeforeAttributeValue,
                    c if c.is_ascii_whitespace() => {},
                    '/' => {
                        tag.finish_attribute();
                        if chars.peek().is_some_and(|&(_, n)| n == '>') {
                            tag.self_closing = true;
                        }
                        state = State::BeforeAttributeName;
                    },
                    c => {
                        tag.finish_attribute();
                        tag.attr_name.extend(c.to_lowercase());
                        state = State::AttributeName;
                    },
                },
                State::BeforeAttributeValue => match c {
                    '>' => return self.finish_tag(tag, skip + i + 1),
                    '"' | '\'' if unquoted.contains(&i) => state = State::AttributeValueUnquoted,
                    '"' | '\'' => {
                        quote_at = i;
                        state = State::AttributeValueQuoted(c);
                    },
                    c if c.is_ascii_whitespace() => {},
                    c => {
                        tag.attr_value.push(c);
                        state = State::AttributeValueUnquoted;
                    },
                },
                State::AttributeValueQuoted(quote) => {
                    if c == quote {
                        tag.finish_attribute();
                        state = State::BeforeAttributeName;
                    } else {
                        tag.attr_value.push(c);
                    }
                },
                State::AttributeValueUnquoted => match c {
                    '>' => return self.finish_tag(tag, skip + i + 1),
                    c if c.is_ascii_whitespace() => {
                        tag.finish_attribute();
                        state = State::BeforeAttributeName;
                    },
                    c => tag.attr_value.push(c),
                },
            }
        }
        match state {
            State::AttributeValueQuoted(_) => Err(Some(quote_at)),
            _ => Err(None),
        }
    }

    fn finish_tag(&mut self, tag: TagBuilder, len: usize) -> Result<Token, Option<usize>> {
        self.pos += len;
        if !tag.is_end_tag
            && !tag.self_closing
            && let Some(decode) = raw_text_kind(&tag.name)
        {
            self.raw = Some(RawText {
                end_tag: tag.name.clone(),
                decode,
            });
        }
        Ok(tag.into_token())
    }

    /// Consume the rest of the input as literal text.
    fn literal_rest(&mut self) -> Token {
        let rest = self.rest();
        self.pos = self.input.len();
        log::trace!("unterminated tag at end of input, kept as text");
        Token::Text(entities::decode(rest).into_owned())
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if self.pos >= self.input.len() {
                return None;
            }
            if let Some(raw) = self.raw.take()
                && let Some(token) = self.scan_raw_text(&raw)
            {
                return Some(token);
            }

            let rest = self.rest();
            if !Self::opens_markup(rest) {
                return Some(self.scan_text());
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                if self.skip_directive() {
                    continue;
                }
                return Some(self.literal_rest());
            }
            return match self.scan_tag() {
                Some(token) => Some(token),
                None => Some(self.literal_rest()),
            };
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(input: &str) -> Vec<Token> {
        Tokenizer::new(input).collect()
    }

    fn start(name: &str, attrs: &[(&str, &str)], self_closing: bool) -> Token {
        Token::StartTag {
            name: name.into(),
            attributes: attrs
                .iter()
                .map(|(n, v)| Attribute {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            self_closing,
        }
    }

    fn end(name: &str) -> Token {
        Token::EndTag { name: name.into() }
    }

    fn text(s: &str) -> Token {
        Token::Text(s.into())
    }

    // -- tags ---------------------------------------------------------------

    #[test]
    fn basic_paragraph() {
        assert_eq!(
            tok("<p>Hello</p>"),
            vec![start("p", &[], false), text("Hello"), end("p")]
        );
    }

    #[test]
    fn names_are_lowercased() {
        assert_eq!(
            tok("<DIV CLASS=x></Div>"),
            vec![start("div", &[("class", "x")], false), end("div")]
        );
    }

    #[test]
    fn self_closing() {
        assert_eq!(tok("<br/>"), vec![start("br", &[], true)]);
        assert_eq!(
            tok("<img src=\"a.png\" />"),
            vec![start("img", &[("src", "a.png")], true)]
        );
    }

    #[test]
    fn attribute_quoting_styles() {
        assert_eq!(
            tok("<a href=\"/d\" title='s q' rel=bare>"),
            vec![start(
                "a",
                &[("href", "/d"), ("title", "s q"), ("rel", "bare")],
                false
            )]
        );
    }

    #[test]
    fn unquoted_value_keeps_slashes() {
        assert_eq!(
            tok("<a href=/x/y/>"),
            vec![start("a", &[("href", "/x/y/")], false)]
        );
    }

    #[test]
    fn boolean_and_duplicate_attributes() {
        assert_eq!(
            tok("<input checked name=a name=b disabled>"),
            vec![start(
                "input",
                &[("checked", ""), ("name", "a"), ("disabled", "")],
                false
            )]
        );
    }

    #[test]
    fn attribute_spacing_around_equals() {
        assert_eq!(
            tok("<td colspan = 2>"),
            vec![start("td", &[("colspan", "2")], false)]
        );
    }

    #[test]
    fn char_ref_in_attribute() {
        assert_eq!(
            tok("<a href=\"?a=1&amp;b=2\">"),
            vec![start("a", &[("href", "?a=1&b=2")], false)]
        );
    }

    #[test]
    fn stray_equals_skipped() {
        assert_eq!(tok("<p =x>"), vec![start("p", &[("x", "")], false)]);
    }

    // -- text ---------------------------------------------------------------

    #[test]
    fn text_entities_decoded() {
        assert_eq!(tok("a &amp; b &lt;"), vec![text("a & b <")]);
        assert_eq!(tok("&#65;&bogus;"), vec![text("A&bogus;")]);
    }

    #[test]
    fn bare_less_than_is_text() {
        assert_eq!(tok("a < b <3"), vec![text("a < b <3")]);
        assert_eq!(tok("x </ y"), vec![text("x </ y")]);
    }

    #[test]
    fn empty_input() {
        assert!(tok("").is_empty());
    }

    // -- discarded constructs -----------------------------------------------

    #[test]
    fn comments_doctype_and_pi_dropped() {
        assert_eq!(
            tok("<!DOCTYPE html><?xml version=\"1.0\"?><!-- c -->x<!---->y"),
            vec![text("x"), text("y")]
        );
    }

    #[test]
    fn unterminated_comment_runs_to_end() {
        assert_eq!(tok("a<!-- never closed <p>"), vec![text("a")]);
    }

    // -- raw text -----------------------------------------------------------

    #[test]
    fn script_body_is_raw() {
        assert_eq!(
            tok("<script>if (1 < 2 && x) {}</script>z"),
            vec![
                start("script", &[], false),
                text("if (1 < 2 && x) {}"),
                end("script"),
                text("z"),
            ]
        );
    }

    #[test]
    fn style_end_tag_case_insensitive() {
        assert_eq!(
            tok("<style>p{}</STYLE>"),
            vec![start("style", &[], false), text("p{}"), end("style")]
        );
    }

    #[test]
    fn script_ignores_other_end_tags() {
        assert_eq!(
            tok("<script>\"</p>\"</scripts></script>"),
            vec![
                start("script", &[], false),
                text("\"</p>\"</scripts>"),
                end("script"),
            ]
        );
    }

    #[test]
    fn title_decodes_references() {
        assert_eq!(
            tok("<title>A &amp; <b></title>"),
            vec![start("title", &[], false), text("A & <b>"), end("title")]
        );
    }

    #[test]
    fn empty_raw_text() {
        assert_eq!(
            tok("<textarea></textarea>"),
            vec![start("textarea", &[], false), end("textarea")]
        );
    }

    #[test]
    fn unclosed_script_runs_to_end() {
        assert_eq!(
            tok("<script>x < y"),
            vec![start("script", &[], false), text("x < y")]
        );
    }

    // -- malformed input ----------------------------------------------------

    #[test]
    fn unterminated_tag_is_literal_text() {
        assert_eq!(
            tok("ok <a href=\"x"),
            vec![text("ok "), text("<a href=\"x")]
        );
    }

    #[test]
    fn unclosed_quote_ends_value_at_gt() {
        assert_eq!(
            tok("<a href=\"foo>link</a> <b>x</b>"),
            vec![
                start("a", &[("href", "foo")], false),
                text("link"),
                end("a"),
                text(" "),
                start("b", &[], false),
                text("x"),
                end("b"),
            ]
        );
    }

    #[test]
    fn unclosed_quote_ends_value_at_whitespace() {
        assert_eq!(
            tok("<img alt='a b src=c.png>"),
            vec![start("img", &[("alt", "a"), ("b", ""), ("src", "c.png")], false)]
        );
    }

    #[test]
    fn unclosed_element() {
        assert_eq!(tok("<p>hello"), vec![start("p", &[], false), text("hello")]);
    }

    #[test]
    fn unicode_text_and_attribute() {
        assert_eq!(
            tok("<p title=\"\u{00E9}t\u{00E9}\">\u{65E5}\u{672C}</p>"),
            vec![
                start("p", &[("title", "\u{00E9}t\u{00E9}")], false),
                text("\u{65E5}\u{672C}"),
                end("p"),
            ]
        );
    }
}
