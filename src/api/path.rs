//! Mapping of request targets onto the service's API prefix.

use url::Url;

/// What a caller asks to fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiTarget {
    /// Relative or absolute path string; relative ones get the API prefix.
    Path(String),
    /// Parsed URL; resolved through its path, query and fragment.
    Url(Url),
    /// Sent exactly as given.
    Verbatim(String),
}

impl From<&str> for ApiTarget {
    fn from(path: &str) -> Self {
        ApiTarget::Path(path.to_string())
    }
}

impl From<String> for ApiTarget {
    fn from(path: String) -> Self {
        ApiTarget::Path(path)
    }
}

impl From<Url> for ApiTarget {
    fn from(url: Url) -> Self {
        ApiTarget::Url(url)
    }
}

impl ApiTarget {
    /// The target as a request string, without prefix resolution.
    pub fn as_raw(&self) -> String {
        match self {
            ApiTarget::Path(p) | ApiTarget::Verbatim(p) => p.clone(),
            ApiTarget::Url(u) => u.to_string(),
        }
    }
}

/// `scheme:` per RFC 3986: a letter followed by letters, digits, `+`, `-`
/// or `.`.
fn has_scheme(path: &str) -> bool {
    let Some(colon) = path.find(':') else { return false };
    let scheme = &path[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

pub fn is_absolute(path: &str) -> bool {
    path.starts_with("//") || has_scheme(path)
}

fn has_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

/// Collapses runs of `/` in the path portion; query and fragment are kept.
fn collapse_slashes(path: &str) -> String {
    let split = path.find(['?', '#']).unwrap_or(path.len());
    let (head, tail) = path.split_at(split);
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in head.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out.push_str(tail);
    out
}

/// `widgets` -> `/api/widgets`. Absolute URLs and paths already under the
/// prefix are returned unchanged.
pub fn resolve_api_path(path: &str, prefix: &str) -> String {
    if is_absolute(path) || has_prefix(path, prefix) {
        return path.to_string();
    }
    collapse_slashes(&format!("{}/{}", prefix, path))
}

pub fn resolve_target(target: &ApiTarget, prefix: &str) -> String {
    match target {
        ApiTarget::Path(p) => resolve_api_path(p, prefix),
        ApiTarget::Url(u) => {
            let mut relative = u.path().to_string();
            if let Some(q) = u.query() {
                relative.push('?');
                relative.push_str(q);
            }
            if let Some(f) = u.fragment() {
                relative.push('#');
                relative.push_str(f);
            }
            resolve_api_path(&relative, prefix)
        }
        ApiTarget::Verbatim(raw) => raw.clone(),
    }
}
