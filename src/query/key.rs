//! Cache keys.

use std::fmt;

/// Canonical cache key: a normalized path with its query pairs sorted.
///
/// Two hrefs differing only in query parameter order (or a fragment) map to
/// the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    /// Build a key from an already normalized path.
    #[must_use]
    pub fn new(path: &str) -> Self {
        let path = path.split_once('#').map_or(path, |(before, _)| before);
        let key = match path.split_once('?') {
            Some((base, query)) => {
                let mut pairs: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
                if pairs.is_empty() {
                    base.to_string()
                } else {
                    pairs.sort_unstable();
                    format!("{base}?{}", pairs.join("&"))
                }
            }
            None => path.to_string(),
        };
        Self(key)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segment-aware prefix test; the empty prefix matches every key.
    ///
    /// `/members` matches `/members`, `/members/1` and `/members?page=2` but
    /// not `/membership`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return true;
        }
        match self.0.strip_prefix(prefix) {
            Some(rest) => {
                rest.is_empty()
                    || prefix.ends_with('/')
                    || rest.starts_with('/')
                    || rest.starts_with('?')
            }
            None => false,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryKey {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
