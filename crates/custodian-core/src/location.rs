//! Canonical location tags and slash-path helpers
//!
//! A location tag names one file inside one resolved module:
//! `<module identifier>:mod-sep:<file path>`. The interpreter hands the tag
//! back as `imported_from` for nested imports, so [`Location::parse`] and the
//! `Display` impl must stay exact inverses.

use std::fmt;

use crate::identifier::ModuleId;

/// Token between the module identifier and the file path of a location tag
pub const LOCATION_SEPARATOR: &str = ":mod-sep:";

/// File imported when the interpreter starts from the root module
pub const DEFAULT_ROOT_FILE: &str = "main.jsonnet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub module: ModuleId,
    pub path: String,
}

impl Location {
    pub fn new(module: ModuleId, path: impl Into<String>) -> Self {
        Self {
            module,
            path: path.into(),
        }
    }

    /// Parse a tag produced by a previous import
    ///
    /// Returns `None` for the empty tag of the very first import. A tag
    /// without separator is taken as a bare module identifier.
    pub fn parse(tag: &str) -> Option<Self> {
        if tag.is_empty() {
            return None;
        }
        let location = match tag.split_once(LOCATION_SEPARATOR) {
            Some((module, path)) => Self::new(ModuleId::from(module), path),
            None => Self::new(ModuleId::from(tag), ""),
        };
        Some(location)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.module, LOCATION_SEPARATOR, self.path)
    }
}

/// Import paths starting with `./` or `../` are relative to the importing file
pub fn is_relative_import(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../")
}

/// Split an import path into a candidate dependency alias and the rest
pub fn split_imported_path(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}

/// Lexically normalise a slash-separated path
///
/// Removes empty and `.` segments and folds `..` into its parent. Leading
/// `..` segments of a relative path survive; the result of an empty path is
/// `.`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Directory part of a slash path, `.` when there is none
pub fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => clean_path(&path[..=idx]),
        None => ".".to_string(),
    }
}

/// Resolve `relative` against the directory that contains `file`
pub fn join_relative(file: &str, relative: &str) -> String {
    clean_path(&format!("{}/{}", parent_dir(file), relative))
}
