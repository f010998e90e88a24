//! End-to-end checks across parsing, layout and the document indices.

use std::io::Cursor;

use crate::document::{BufferIndex, BufferLine, Document, SourceKind, Style};
use crate::render::wrap::display_width;
use crate::{InputType, RenderConfig};

fn html(input: &str, columns: usize) -> Document {
    let mut doc = Document::html(input, Some("http://example.com/dir/page.html"), RenderConfig::default());
    doc.redraw(columns);
    doc
}

fn rows(doc: &Document) -> Vec<String> {
    doc.lines().iter().map(BufferLine::text).collect()
}

/// Every recorded referer must land on a node carrying the same index.
fn assert_indices_consistent(doc: &Document) {
    for (i, link) in doc.links().iter().enumerate() {
        for &pos in &link.referers {
            assert_eq!(doc.link_at(pos), Some(i), "link {i} at {pos:?}");
        }
    }
    for (i, image) in doc.images().iter().enumerate() {
        for &pos in &image.referers {
            assert_eq!(doc.image_at(pos), Some(i), "image {i} at {pos:?}");
        }
    }
    for (i, input) in doc.inputs().iter().enumerate() {
        for &pos in input.buffer_nodes() {
            assert_eq!(doc.input_at(pos), Some(i), "input {i} at {pos:?}");
        }
    }
}

const PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <title>Release notes</title>
  <base href="/docs/">
</head>
<body>
  <h1 id="top">Release notes</h1>
  <p>Read the <a href="guide.html">guide</a> or jump to <a href="#changes">changes</a>.</p>
  <h2 id="changes">Changes</h2>
  <ul>
    <li>Faster <b>layout</b></li>
    <li>See <a href="guide.html">the guide</a> again</li>
  </ul>
  <pre>
fn main() {
    run();
}
</pre>
  <form action="search" method="post">
    <input name="q" value="wrap" size="8">
    <input type="checkbox" name="exact" checked>
    <input type="submit" value="Go">
  </form>
  <p><img src="logo.png" alt="logo"> &copy; 2024</p>
</body>
</html>
"##;

#[test]
fn full_page_layout() {
    let doc = html(PAGE, 40);
    assert_eq!(
        rows(&doc),
        vec![
            "Release notes",
            "",
            "Read the guide or jump to changes.",
            "",
            "Changes",
            "",
            "  * Faster layout",
            "  * See the guide again",
            "",
            "fn main() {",
            "    run();",
            "}",
            "",
            "[wrap____] [x] [Go]",
            "",
            "logo \u{a9} 2024",
        ]
    );
    assert_eq!(doc.title(), Some("Release notes"));
    assert_indices_consistent(&doc);
}

#[test]
fn full_page_references() {
    let doc = html(PAGE, 40);
    let urls: Vec<&str> = doc.links().iter().map(|l| l.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "http://example.com/docs/guide.html",
            "http://example.com/docs/#changes",
        ]
    );
    assert_eq!(doc.links()[0].referers.len(), 2);
    assert_eq!(doc.images()[0].url, "http://example.com/docs/logo.png");
    assert_eq!(doc.get_section_index("top"), Some(BufferIndex::new(0, 0)));
    assert_eq!(doc.get_section_index("changes"), Some(BufferIndex::new(4, 0)));
}

#[test]
fn full_page_form() {
    let doc = html(PAGE, 40);
    assert_eq!(doc.forms().len(), 1);
    let form = &doc.forms()[0];
    assert_eq!(form.action, "http://example.com/docs/search");
    let kinds: Vec<InputType> = doc.inputs().iter().map(|i| i.kind()).collect();
    assert_eq!(
        kinds,
        vec![InputType::Text, InputType::Checkbox, InputType::Submit]
    );
    assert_eq!(
        doc.form_values(0).unwrap(),
        vec![
            ("q".to_string(), "wrap".to_string()),
            ("exact".to_string(), "on".to_string()),
        ]
    );
}

#[test]
fn narrow_redraw_keeps_indices_consistent() {
    let mut doc = html(PAGE, 40);
    doc.redraw(12);
    for line in doc.lines() {
        assert!(line.width() <= 12, "{:?}", line.text());
    }
    assert_indices_consistent(&doc);
    assert_eq!(doc.columns(), 12);
}

#[test]
fn redraw_is_idempotent() {
    let mut doc = html(PAGE, 30);
    let first = doc.lines().to_vec();
    let links = doc.links().to_vec();
    doc.redraw(30);
    assert_eq!(doc.lines(), first.as_slice());
    assert_eq!(doc.links(), links.as_slice());
}

#[test]
fn resize_matches_fresh_render() {
    let mut doc = html(PAGE, 80);
    doc.redraw(25);
    let fresh = html(PAGE, 25);
    assert_eq!(doc.lines(), fresh.lines());
    assert_eq!(doc.inputs(), fresh.inputs());
}

#[test]
fn from_reader_plain_and_markup() {
    let text = Document::from_reader(
        Cursor::new(b"<b>not markup</b>\n\tindented".to_vec()),
        SourceKind::PlainText,
        None,
        RenderConfig::default(),
    )
    .map(|mut d| {
        d.redraw(80);
        rows(&d)
    })
    .unwrap();
    assert_eq!(text, vec!["<b>not markup</b>", "        indented"]);

    let mut doc = Document::from_reader(
        Cursor::new(b"<b>bold</b> \xff".to_vec()),
        SourceKind::Html,
        Some("file:///tmp/x.html"),
        RenderConfig::default(),
    )
    .unwrap();
    doc.redraw(80);
    assert_eq!(rows(&doc), vec!["bold \u{fffd}"]);
    assert!(doc.lines()[0].nodes[0].has_style(Style::Bold));
    assert_eq!(doc.uri(), Some("file:///tmp/x.html"));
}

#[test]
fn plain_text_has_no_references() {
    let mut doc = Document::plain_text("see <a href=x>here</a>", RenderConfig::default());
    doc.redraw(80);
    assert!(doc.links().is_empty());
    assert!(doc.forms().is_empty());
    assert_eq!(doc.title(), None);
}

#[test]
fn clear_drops_everything() {
    let mut doc = html(PAGE, 40);
    doc.clear();
    assert!(doc.lines().is_empty());
    assert!(doc.links().is_empty());
    assert!(doc.inputs().is_empty());
    assert_eq!(doc.get_section_index("top"), None);
    doc.redraw(40);
    assert!(!doc.lines().is_empty());
}

#[test]
fn configured_presentation() {
    let config = RenderConfig::from_toml_str(
        "bullets = [\"o\"]\nrule_char = \"=\"\nimage_placeholder = \"PIC\"\nlist_indent = 4\n",
    )
    .unwrap();
    let mut doc = Document::html("<ul><li>a</ul><hr><img src=x>", None, config);
    doc.redraw(12);
    assert_eq!(rows(&doc), vec!["    o a", "", "============", "[PIC]"]);
}

#[test]
fn huge_ordered_list_start_saturates() {
    let doc = html("<ol start=9223372036854775807><li>a<li>b</ol>", 80);
    assert_eq!(
        rows(&doc),
        vec!["  9223372036854775807. a", "  9223372036854775807. b"]
    );
}

#[test]
fn unterminated_attribute_quote_keeps_markup() {
    let doc = html("<p>x <a href=\"foo>link</a> more <b>bold</b></p>", 80);
    assert_eq!(rows(&doc), vec!["x link more bold"]);
    assert_eq!(doc.links().len(), 1);
    assert_eq!(doc.links()[0].url, "http://example.com/dir/foo");
    let bold = doc.lines()[0].nodes.iter().find(|n| n.text == "bold");
    assert!(bold.is_some_and(|n| n.has_style(Style::Bold)));
}

#[test]
fn textarea_rows_are_capped() {
    let doc = html("<textarea rows=200000></textarea>", 80);
    assert_eq!(doc.lines().len(), RenderConfig::default().max_textarea_rows);
}

#[test]
fn out_of_range_indices_are_errors() {
    let doc = html("<p>nothing</p>", 80);
    assert!(doc.link(0).is_err());
    assert!(doc.image(0).is_err());
    assert!(doc.form(0).is_err());
    assert!(doc.input(0).is_err());
    assert!(doc.form_values(3).is_err());
}

mod prop {
    use super::*;
    use proptest::prelude::*;

    const FRAGMENTS: &[&str] = &[
        "<p>", "</p>", "<b>", "</b>", "<i>", "</i>", "<a href=/x>", "<a href=/y>", "</a>",
        "<ul>", "</ul>", "<ol>", "</ol>", "<li>", "<pre>", "</pre>", "<br>", "<hr>",
        "<blockquote>", "</blockquote>", "<table><tr><td>", "</td><td>", "</table>", "<h1>",
        "</h1>", "<input name=q>", "<input type=radio name=r checked>",
        "<select name=s><option>one<option>two</select>", "<textarea name=t>a b\nc</textarea>",
        "<img src=i.png>", "<img alt='a picture'>", "<span id=s1>", "</span>", "word",
        "longerword", "supercalifragilistic", " ", "\n", "x\ny  z", "&amp;", "\tq",
    ];

    fn markup() -> impl Strategy<Value = String> {
        proptest::collection::vec(proptest::sample::select(FRAGMENTS), 0..40)
            .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn markup_rows_fit_width(input in markup(), columns in 1usize..60) {
            let doc = html(&input, columns);
            for line in doc.lines() {
                prop_assert!(line.width() <= columns, "{:?} > {columns}", line.text());
            }
        }

        #[test]
        fn markup_indices_consistent(input in markup(), columns in 1usize..60) {
            let doc = html(&input, columns);
            assert_indices_consistent(&doc);
            for pos in doc.sections().values() {
                prop_assert!(pos.line < doc.lines().len().max(1));
            }
        }

        #[test]
        fn markup_redraw_idempotent(input in markup(), a in 1usize..60, b in 1usize..60) {
            let mut doc = html(&input, a);
            doc.redraw(b);
            let fresh = html(&input, b);
            prop_assert_eq!(doc.lines(), fresh.lines());
            prop_assert_eq!(doc.links(), fresh.links());
            prop_assert_eq!(doc.inputs(), fresh.inputs());
            prop_assert_eq!(doc.sections(), fresh.sections());
        }

        #[test]
        fn plain_rows_fit_width(input in "[a-z \t\n]{0,200}", columns in 1usize..60) {
            let mut doc = Document::plain_text(input, RenderConfig::default());
            doc.redraw(columns);
            for line in doc.lines() {
                prop_assert!(display_width(&line.text()) <= columns);
            }
        }

        #[test]
        fn plain_text_keeps_every_visible_char(input in "[a-z \n]{0,200}", columns in 1usize..60) {
            let mut doc = Document::plain_text(input.clone(), RenderConfig::default());
            doc.redraw(columns);
            let visible = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
            prop_assert_eq!(visible(&input), visible(&doc.text()));
        }
    }
}
