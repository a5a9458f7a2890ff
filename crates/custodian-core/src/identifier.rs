//! Module identifiers
//!
//! A module identifier names either a git-hosted module,
//! `host/owner/repo[/branch]@version`, or a local directory such as `./lib`.
//! All fields are derived from the string on demand; nothing is cached.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separates the remote part of an identifier from its version
pub const VERSION_SEPARATOR: char = '@';

/// Version suffix that asks `mod get` to drop a requirement
pub const REMOVE_VERSION: &str = "none";

/// Returns true when `path` names a local directory rather than a remote
pub fn is_local_path(path: &str) -> bool {
    path.starts_with("./")
        || path.starts_with("../")
        || path.starts_with('/')
        || path == "."
        || path == ".."
}

/// Opaque module identifier string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build `remote@version`
    pub fn versioned(remote: &str, version: &str) -> Self {
        Self(format!("{}{}{}", remote, VERSION_SEPARATOR, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local(&self) -> bool {
        is_local_path(&self.0)
    }

    fn unversioned(&self) -> &str {
        self.0
            .split_once(VERSION_SEPARATOR)
            .map_or(self.0.as_str(), |(head, _)| head)
    }

    /// `host/owner/repo`, dropping a branch segment when present
    pub fn remote(&self) -> &str {
        let head = self.unversioned();
        match nth_separator(head, 3) {
            Some(end) => &head[..end],
            None => head,
        }
    }

    /// Third path segment, or empty when the identifier is not a well-formed remote
    pub fn repo(&self) -> &str {
        self.unversioned().splitn(4, '/').nth(2).unwrap_or("")
    }

    /// Everything after the third `/` of the unversioned part
    pub fn branch(&self) -> &str {
        let head = self.unversioned();
        match nth_separator(head, 3) {
            Some(end) => &head[end + 1..],
            None => "",
        }
    }

    /// Text after the version separator, empty if absent
    pub fn version(&self) -> &str {
        self.0
            .split_once(VERSION_SEPARATOR)
            .map_or("", |(_, version)| version)
    }

    /// Alias used when the module is added to a manifest
    ///
    /// Remote modules are aliased by repository name, local paths by their
    /// last path component.
    pub fn default_alias(&self) -> String {
        let repo = self.repo();
        if !repo.is_empty() && !self.is_local() {
            return repo.to_string();
        }
        self.unversioned()
            .trim_end_matches('/')
            .rsplit('/')
            .find(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .unwrap_or_default()
            .to_string()
    }
}

/// Byte offset of the `n`-th `/` in `s`
fn nth_separator(s: &str, n: usize) -> Option<usize> {
    s.match_indices('/').nth(n - 1).map(|(idx, _)| idx)
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
