//! Route matching logic.
//!
//! # Design Decisions
//! - Paths are normalized before matching and the normalized form is what
//!   gets forwarded, so the group that gated a request is the group the
//!   upstream serves
//! - Prefix comparison ignores ASCII case, as the upstream router does
//! - Prefixes match whole segments: `/coach` matches `/coach/players`
//!   but not `/coachx`
//! - `/` matches everything

/// Matches the request path against a prefix on segment boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. Trailing slashes are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: trimmed.to_string(),
        }
    }

    /// `path` must already be normalized with [`normalize_path`].
    pub fn matches(&self, path: &str) -> bool {
        let head = match path.get(..self.prefix.len()) {
            Some(head) => head,
            None => return false,
        };
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return false;
        }
        let rest = &path[self.prefix.len()..];
        rest.is_empty() || rest.starts_with('/')
    }

    /// Longer prefixes are more specific.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }
}

/// Canonical form of a request path.
///
/// Empty and `.` segments are dropped and `..` pops its parent. Returns
/// `None` for paths that do not start with `/`, climb above the root, or
/// carry percent-encoded dots or slashes, since the upstream may decode
/// those into segments the gateway never matched.
pub fn normalize_path(path: &str) -> Option<String> {
    if !path.starts_with('/') || has_encoded_separator(path) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    let mut normalized = String::with_capacity(path.len());
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    Some(normalized)
}

fn has_encoded_separator(path: &str) -> bool {
    path.as_bytes().windows(3).any(|w| {
        w[0] == b'%' && (w[1..].eq_ignore_ascii_case(b"2e") || w[1..].eq_ignore_ascii_case(b"2f"))
    })
}
