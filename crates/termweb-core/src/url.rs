//! URL parsing and reference resolution (simplified RFC 3986).
//!
//! Links and image sources are stored as absolute strings when the
//! document has a base to resolve against. Anything that cannot be
//! resolved is kept exactly as the markup wrote it.

use std::fmt;

/// A parsed hierarchical URL (`scheme://host[:port]/path?query#fragment`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// Lowercased scheme (`"http"`, `"file"`, ...).
    pub scheme: String,
    /// Host, possibly empty (`file:///etc/motd`).
    pub host: String,
    pub port: Option<u16>,
    /// Path, always starting with `/`.
    pub path: String,
    /// Query without the leading `?`.
    pub query: Option<String>,
    /// Fragment without the leading `#`.
    pub fragment: Option<String>,
}

/// True if `s` starts with `scheme:` (letter, then letters, digits,
/// `+`, `-` or `.`).
pub fn has_scheme(s: &str) -> bool {
    let Some(colon) = s.find(':') else {
        return false;
    };
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl Url {
    /// Parse an absolute hierarchical URL. Returns `None` for relative
    /// references and for opaque URLs such as `mailto:`.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        if !has_scheme(url) {
            return None;
        }
        let idx = url.find("://")?;
        if url[..idx].contains(':') {
            return None;
        }
        Self::parse_authority_and_path(&url[..idx], &url[idx + 3..])
    }

    /// Parse `host[:port]/path?query#fragment` once the scheme is off.
    fn parse_authority_and_path(scheme: &str, rest: &str) -> Option<Url> {
        let (rest, query, fragment) = split_query_fragment(rest);
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rfind(':') {
            Some(i) => match authority[i + 1..].parse::<u16>() {
                Ok(p) => (&authority[..i], Some(p)),
                Err(_) => (authority, None),
            },
            None => (authority, None),
        };

        Some(Url {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port,
            path: path.to_string(),
            query,
            fragment,
        })
    }

    /// Resolve a reference against this base.
    ///
    /// Handles absolute URLs, protocol-relative (`//host/path`), absolute
    /// paths, relative paths with `.` and `..`, query-only and
    /// fragment-only references. Opaque absolute references (`mailto:`)
    /// yield `None`.
    pub fn resolve(&self, reference: &str) -> Option<Url> {
        let reference = reference.trim();
        if reference.is_empty() {
            let mut same = self.clone();
            same.fragment = None;
            return Some(same);
        }
        if has_scheme(reference) {
            return Url::parse(reference);
        }
        if let Some(rest) = reference.strip_prefix("//") {
            return Self::parse_authority_and_path(&self.scheme, rest);
        }
        if let Some(frag) = reference.strip_prefix('#') {
            let mut resolved = self.clone();
            resolved.fragment = Some(frag.to_string());
            return Some(resolved);
        }
        if let Some(query) = reference.strip_prefix('?') {
            let (query, _, fragment) = split_query_fragment(query);
            let mut resolved = self.clone();
            resolved.query = Some(query.to_string());
            resolved.fragment = fragment;
            return Some(resolved);
        }

        let (path, query, fragment) = split_query_fragment(reference);
        let path = if path.starts_with('/') {
            normalize_path("/", path)
        } else {
            normalize_path(self.directory(), path)
        };
        Some(Url {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            path,
            query,
            fragment,
        })
    }

    /// Directory part of the path, up to and including the last `/`.
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(i) => &self.path[..=i],
            None => "/",
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.path)?;
        if let Some(ref q) = self.query {
            write!(f, "?{q}")?;
        }
        if let Some(ref frag) = self.fragment {
            write!(f, "#{frag}")?;
        }
        Ok(())
    }
}

/// Resolve a link or image target to the string stored in the document.
pub fn resolve_target(base: Option<&Url>, target: &str) -> String {
    let target = target.trim();
    match base.and_then(|b| b.resolve(target)) {
        Some(url) => url.to_string(),
        None => target.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Split `path?query#fragment`.
fn split_query_fragment(s: &str) -> (&str, Option<String>, Option<String>) {
    let (s, fragment) = match s.find('#') {
        Some(i) => (&s[..i], Some(s[i + 1..].to_string())),
        None => (s, None),
    };
    match s.find('?') {
        Some(i) => (&s[..i], Some(s[i + 1..].to_string()), fragment),
        None => (s, None, fragment),
    }
}

/// Apply `relative` to `base_dir`, folding `.` and `..` segments.
fn normalize_path(base_dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    let mut trailing_slash = false;
    for seg in relative.split('/') {
        trailing_slash = matches!(seg, "" | "." | "..");
        match seg {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }
    let mut path = format!("/{}", segments.join("/"));
    if trailing_slash && !path.ends_with('/') {
        path.push('/');
    }
    path
}
