// HTML character reference decoding.
//
// Named references cover the entities that show up in ordinary pages.
// Lookup is case-sensitive. Names are given without the leading `&` and
// trailing `;`.

use std::borrow::Cow;

/// Longest entity name worth scanning for.
const MAX_NAME_LEN: usize = 32;

/// Look up a named character reference (without `&` and `;`).
pub fn lookup_entity(name: &str) -> Option<&'static str> {
    let s: &'static str = match name {
        // ---- Markup-significant ------------------------------------------
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",

        // ---- Spaces -------------------------------------------------------
        "nbsp" => "\u{00A0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200C}",
        "zwj" => "\u{200D}",
        "shy" => "\u{00AD}",

        // ---- Punctuation --------------------------------------------------
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "sbquo" => "\u{201A}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "bdquo" => "\u{201E}",
        "laquo" => "\u{00AB}",
        "raquo" => "\u{00BB}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{00B7}",
        "iexcl" => "\u{00A1}",
        "iquest" => "\u{00BF}",
        "dagger" => "\u{2020}",
        "Dagger" => "\u{2021}",
        "prime" => "\u{2032}",
        "Prime" => "\u{2033}",

        // ---- Signs and currency -------------------------------------------
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        "sect" => "\u{00A7}",
        "para" => "\u{00B6}",
        "deg" => "\u{00B0}",
        "micro" => "\u{00B5}",
        "permil" => "\u{2030}",
        "cent" => "\u{00A2}",
        "pound" => "\u{00A3}",
        "yen" => "\u{00A5}",
        "euro" => "\u{20AC}",
        "curren" => "\u{00A4}",

        // ---- Arithmetic ---------------------------------------------------
        "times" => "\u{00D7}",
        "divide" => "\u{00F7}",
        "plusmn" => "\u{00B1}",
        "minus" => "\u{2212}",
        "frac14" => "\u{00BC}",
        "frac12" => "\u{00BD}",
        "frac34" => "\u{00BE}",
        "ne" => "\u{2260}",
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "infin" => "\u{221E}",

        // ---- Arrows -------------------------------------------------------
        "larr" => "\u{2190}",
        "uarr" => "\u{2191}",
        "rarr" => "\u{2192}",
        "darr" => "\u{2193}",
        "harr" => "\u{2194}",

        // ---- Latin-1 letters ----------------------------------------------
        "Agrave" => "\u{00C0}",
        "Aacute" => "\u{00C1}",
        "Auml" => "\u{00C4}",
        "Aring" => "\u{00C5}",
        "Ccedil" => "\u{00C7}",
        "Eacute" => "\u{00C9}",
        "Ntilde" => "\u{00D1}",
        "Ouml" => "\u{00D6}",
        "Uuml" => "\u{00DC}",
        "szlig" => "\u{00DF}",
        "agrave" => "\u{00E0}",
        "aacute" => "\u{00E1}",
        "acirc" => "\u{00E2}",
        "auml" => "\u{00E4}",
        "aring" => "\u{00E5}",
        "ccedil" => "\u{00E7}",
        "egrave" => "\u{00E8}",
        "eacute" => "\u{00E9}",
        "ecirc" => "\u{00EA}",
        "iacute" => "\u{00ED}",
        "ntilde" => "\u{00F1}",
        "oacute" => "\u{00F3}",
        "ouml" => "\u{00F6}",
        "oslash" => "\u{00F8}",
        "uacute" => "\u{00FA}",
        "uuml" => "\u{00FC}",

        // ---- Greek --------------------------------------------------------
        "Omega" => "\u{03A9}",
        "alpha" => "\u{03B1}",
        "beta" => "\u{03B2}",
        "gamma" => "\u{03B3}",
        "delta" => "\u{03B4}",
        "lambda" => "\u{03BB}",
        "mu" => "\u{03BC}",
        "pi" => "\u{03C0}",
        "sigma" => "\u{03C3}",
        "omega" => "\u{03C9}",

        _ => return None,
    };
    Some(s)
}

/// Map a numeric reference's code point to a character.
///
/// NUL, surrogates and out-of-range values become U+FFFD.
pub fn decode_numeric(code: u32) -> char {
    if code == 0 {
        return '\u{FFFD}';
    }
    char::from_u32(code).unwrap_or('\u{FFFD}')
}

/// Decode the reference starting at `&` in `s`.
///
/// Returns the replacement text and the number of bytes consumed, or
/// `None` if `s` does not start with a recognizable reference.
fn decode_one(s: &str) -> Option<(Cow<'static, str>, usize)> {
    let body = s.strip_prefix('&')?;
    if let Some(num) = body.strip_prefix('#') {
        let (radix, digits_at) = match num.as_bytes().first() {
            Some(b'x' | b'X') => (16, 1),
            _ => (10, 0),
        };
        let digits: &str = &num[digits_at..];
        let len = digits
            .bytes()
            .take_while(|b| (*b as char).is_digit(radix))
            .count();
        if len == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..len], radix).unwrap_or(u32::MAX);
        let mut consumed = 2 + digits_at + len;
        if digits[len..].starts_with(';') {
            consumed += 1;
        }
        let ch = decode_numeric(code);
        return Some((Cow::Owned(ch.to_string()), consumed));
    }

    let len = body
        .bytes()
        .take(MAX_NAME_LEN + 1)
        .take_while(u8::is_ascii_alphanumeric)
        .count();
    if len == 0 || len > MAX_NAME_LEN || !body[len..].starts_with(';') {
        return None;
    }
    let text = lookup_entity(&body[..len])?;
    Some((Cow::Borrowed(text), len + 2))
}

/// Decode every character reference in `text`.
///
/// Unknown or malformed references are left as written.
pub fn decode(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_one(rest) {
            Some((replacement, consumed)) => {
                out.push_str(&replacement);
                rest = &rest[consumed..];
            },
            None => {
                out.push('&');
                rest = &rest[1..];
            },
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_entities() {
        assert_eq!(lookup_entity("amp"), Some("&"));
        assert_eq!(lookup_entity("lt"), Some("<"));
        assert_eq!(lookup_entity("gt"), Some(">"));
        assert_eq!(lookup_entity("quot"), Some("\""));
        assert_eq!(lookup_entity("nbsp"), Some("\u{00A0}"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(lookup_entity("Agrave"), Some("\u{00C0}"));
        assert_eq!(lookup_entity("agrave"), Some("\u{00E0}"));
        assert_eq!(lookup_entity("AMP"), None);
        assert_eq!(lookup_entity(""), None);
    }

    #[test]
    fn decode_named() {
        assert_eq!(decode("a &amp; b"), "a & b");
        assert_eq!(decode("&lt;p&gt;"), "<p>");
        assert_eq!(decode("&copy; 2024"), "\u{00A9} 2024");
    }

    #[test]
    fn decode_numeric_refs() {
        assert_eq!(decode("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode("&#169"), "\u{00A9}");
        assert_eq!(decode("&#0;"), "\u{FFFD}");
        assert_eq!(decode("&#xD800;"), "\u{FFFD}");
        assert_eq!(decode("&#99999999999;"), "\u{FFFD}");
    }

    #[test]
    fn unknown_passes_through() {
        assert_eq!(decode("&bogus;"), "&bogus;");
        assert_eq!(decode("AT&T"), "AT&T");
        assert_eq!(decode("&amp"), "&amp");
        assert_eq!(decode("&#;"), "&#;");
        assert_eq!(decode("trailing &"), "trailing &");
    }

    #[test]
    fn no_ampersand_borrows() {
        assert!(matches!(decode("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn multibyte_neighbors() {
        assert_eq!(decode("caf\u{00E9} &eacute;!"), "caf\u{00E9} \u{00E9}!");
    }
}
