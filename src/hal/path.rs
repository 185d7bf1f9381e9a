//! API path normalization.
//!
//! Hrefs in HAL documents carry the API prefix (`/api/members/1`, sometimes
//! as absolute URLs) while navigation paths do not (`/members/1`).
//! [`ApiPaths`] converts between the two:
//!
//! - [`ApiPaths::normalize`] strips the origin and the prefix, giving the
//!   navigation form used for comparison and cache keys
//! - [`ApiPaths::request_path`] gives the path to actually request, keeping
//!   the prefix only when the deployment serves the API behind it

use tracing::trace;

/// Path translation rules for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPaths {
    prefix: String,
    behind_prefix: bool,
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_API_PREFIX, true)
    }
}

impl ApiPaths {
    /// `prefix` is a single leading segment such as `/api`; empty disables stripping.
    pub fn new(prefix: impl Into<String>, behind_prefix: bool) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self {
            prefix,
            behind_prefix,
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn behind_prefix(&self) -> bool {
        self.behind_prefix
    }

    /// Navigation form of a path or URL.
    ///
    /// Absolute URLs lose their origin (path and query are kept), a leading
    /// slash is added, and a leading prefix segment is removed. The bare
    /// prefix normalizes to an empty string and an empty input to `/`.
    #[must_use]
    pub fn normalize(&self, path: &str) -> String {
        if path.is_empty() {
            return "/".to_string();
        }

        if let Ok(url) = reqwest::Url::parse(path) {
            if url.has_host() {
                let mut full = url.path().to_string();
                if let Some(query) = url.query() {
                    full.push('?');
                    full.push_str(query);
                }
                return self.normalize(&full);
            }
        }

        let normalized = if path.starts_with('/') { path.to_string() } else { format!("/{path}") };

        if self.prefix.is_empty() {
            return normalized;
        }
        match normalized.strip_prefix(self.prefix.as_str()) {
            Some("") => String::new(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => normalized,
        }
    }

    /// Path to request for an href or navigation path.
    #[must_use]
    pub fn request_path(&self, href: &str) -> String {
        let normalized = self.normalize(href);
        let path = if self.behind_prefix {
            format!("{}{}", self.prefix, normalized)
        } else {
            normalized
        };
        let path = if path.is_empty() { "/".to_string() } else { path };
        trace!(target: "hal", "request path for {href}: {path}");
        path
    }

    /// Whether two paths address the same resource once normalized.
    #[must_use]
    pub fn same_resource(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }

    /// Whether a template target needs its own fetch instead of the current data.
    ///
    /// A missing or empty target means the form submits to the current resource.
    #[must_use]
    pub fn should_fetch_target(&self, target: Option<&str>, current_path: &str) -> bool {
        match target {
            None | Some("") => false,
            Some(target) => !self.same_resource(target, current_path),
        }
    }
}
