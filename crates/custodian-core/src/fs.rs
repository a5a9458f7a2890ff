//! Read-only file trees backing resolved modules

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::location::clean_path;

/// Read-only view of a module's files, addressed by slash paths relative to
/// the module root
pub trait FileTree: fmt::Debug + Send + Sync {
    /// Read a whole file; absent files report `io::ErrorKind::NotFound`
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// File tree rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct DirTree {
    root: PathBuf,
    hidden: Vec<String>,
}

impl DirTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hidden: Vec::new(),
        }
    }

    /// Treat the file at `path` as absent
    pub fn hiding(mut self, path: impl Into<String>) -> Self {
        self.hidden.push(clean_path(&path.into()));
        self
    }

    /// Map a module-relative path onto the directory, refusing anything that
    /// would leave it
    fn host_path(&self, path: &str) -> io::Result<PathBuf> {
        let cleaned = clean_path(path);
        if cleaned == "."
            || cleaned.starts_with('/')
            || cleaned.starts_with("..")
            || self.hidden.contains(&cleaned)
        {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("invalid module path: {}", path),
            ));
        }
        Ok(self.root.join(cleaned))
    }
}

impl FileTree for DirTree {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let full = self.host_path(path)?;
        if !full.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", full.display()),
            ));
        }
        fs::read(full)
    }
}
