//! Column-width text helpers.
//!
//! Widths are terminal cells as reported by `unicode-width`: CJK and
//! most emoji take two cells, combining marks take none.

use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal cells.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Display width of a single character (control characters count as 0).
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Split `s` after the longest prefix that fits in `width` cells.
///
/// The prefix is empty when the first character alone is wider than
/// `width`.
pub fn split_at_width(s: &str, width: usize) -> (&str, &str) {
    let mut used = 0;
    for (i, c) in s.char_indices() {
        let w = char_width(c);
        if used + w > width {
            return s.split_at(i);
        }
        used += w;
    }
    (s, "")
}

/// Like [`split_at_width`], but always takes at least one character so
/// callers looping over a long word make progress. A character wider
/// than `width` (a two-cell glyph at width 1) is taken whole, so that
/// row is wider than `width`.
pub fn split_at_width_forced(s: &str, width: usize) -> (&str, &str) {
    let (head, tail) = split_at_width(s, width);
    if !head.is_empty() || s.is_empty() {
        return (head, tail);
    }
    let first = s.chars().next().map_or(0, char::len_utf8);
    s.split_at(first)
}

/// Replace each tab with spaces up to the next multiple of `tab_width`.
pub fn expand_tabs(line: &str, tab_width: usize) -> Cow<'_, str> {
    if !line.contains('\t') {
        return Cow::Borrowed(line);
    }
    let tab_width = tab_width.max(1);
    let mut out = String::with_capacity(line.len() + tab_width);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = tab_width - column % tab_width;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(c);
            column += char_width(c);
        }
    }
    Cow::Owned(out)
}

/// Maximal runs of whitespace / non-whitespace, tagged `true` for
/// whitespace.
fn runs(line: &str) -> Vec<(bool, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in line.char_indices() {
        let space = c.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                out.push((prev, &line[start..i]));
                start = i;
            },
            _ => {},
        }
        in_space = Some(space);
    }
    if let Some(space) = in_space {
        out.push((space, &line[start..]));
    }
    out
}

/// Greedy whitespace-preserving wrap of one logical line.
///
/// Words are kept whole while they fit; the whitespace where a break
/// falls is dropped, and whitespace between words on the same row is
/// kept as written. A word wider than `width` is hard-broken at the
/// width boundary. Rows never carry trailing whitespace. An empty line
/// yields one empty row.
pub fn wrap_preserving(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut row_width = 0;
    // True right after a break: leading whitespace is dropped.
    let mut continuation = false;

    let mut break_row = |row: &mut String, row_width: &mut usize| {
        rows.push(row.trim_end().to_string());
        row.clear();
        *row_width = 0;
    };

    for (is_space, piece) in runs(line) {
        let piece_width = display_width(piece);
        if is_space {
            if continuation && row.is_empty() {
                continue;
            }
            if row_width + piece_width <= width {
                row.push_str(piece);
                row_width += piece_width;
            } else {
                break_row(&mut row, &mut row_width);
                continuation = true;
            }
            continue;
        }

        if row_width + piece_width > width && !row.trim_start().is_empty() {
            break_row(&mut row, &mut row_width);
            continuation = true;
        }
        let mut word = piece;
        while !word.is_empty() {
            let avail = width - row_width;
            let (head, tail) = split_at_width(word, avail);
            if tail.is_empty() {
                row.push_str(head);
                row_width += display_width(head);
                break;
            }
            if head.is_empty() && row_width > 0 {
                // Only indentation so far; give the word the full row.
                row.clear();
                row_width = 0;
                continue;
            }
            let (head, tail) = split_at_width_forced(word, avail);
            row.push_str(head);
            break_row(&mut row, &mut row_width);
            continuation = true;
            word = tail;
        }
    }

    if !row.is_empty() || rows.is_empty() {
        rows.push(row.trim_end().to_string());
    }
    rows
}
