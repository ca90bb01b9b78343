//! Build identity.

use serde::{Deserialize, Serialize};

/// Build id used when the deployment does not provide one.
pub const FALLBACK_BUILD_ID: &str = "no-build-id";

/// Identifier of a deployed application build.
///
/// Cache entries and tag manifest rows are namespaced with it so a redeploy
/// never inherits the previous build's tag associations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(String);

impl BuildId {
    /// Create a build id. Blank input falls back to [`FALLBACK_BUILD_ID`].
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.trim().is_empty() {
            Self::fallback()
        } else {
            Self(id)
        }
    }

    /// The fallback build id.
    pub fn fallback() -> Self {
        Self(FALLBACK_BUILD_ID.to_string())
    }

    /// Build id from an optional value (typically an environment variable).
    pub fn from_option(id: Option<String>) -> Self {
        id.map(Self::new).unwrap_or_else(Self::fallback)
    }

    /// Get the build id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix a raw value with this build id: `<buildId>/<raw>`.
    ///
    /// Repeated separators are collapsed, so `/home` and `home` both map to
    /// `b1/home`.
    pub fn namespace(&self, raw: &str) -> String {
        collapse_separators(&format!("{}/{}", self.0, raw))
    }

    /// Remove this build id's namespace from a value.
    ///
    /// Values from another namespace are returned unchanged.
    pub fn strip<'a>(&self, namespaced: &'a str) -> &'a str {
        namespaced
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(namespaced)
    }

    /// Remove this build id's namespace from a URL path.
    ///
    /// Namespacing drops the leading `/`; it is restored here, so
    /// `b1/blog` becomes `/blog`. Values from another namespace are returned
    /// unchanged.
    pub fn strip_path(&self, namespaced: &str) -> String {
        let stripped = self.strip(namespaced);
        if stripped.len() == namespaced.len() || stripped.starts_with('/') {
            stripped.to_string()
        } else {
            format!("/{stripped}")
        }
    }
}

/// Collapse every run of `/` into a single separator.
pub fn collapse_separators(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_slash = false;
    for c in value.chars() {
        let slash = c == '/';
        if !(slash && previous_slash) {
            out.push(c);
        }
        previous_slash = slash;
    }
    out
}

impl Default for BuildId {
    fn default() -> Self {
        Self::fallback()
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BuildId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BuildId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
