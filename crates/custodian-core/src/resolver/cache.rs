//! On-disk module cache
//!
//! Entries live at `<root>/<remote>@<version>`. An entry counts as present
//! only when its completion marker exists, so directories left behind by an
//! interrupted population are repopulated instead of reused.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use git2::Oid;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{CustodianError, Result};
use crate::identifier::ModuleId;
use crate::location::clean_path;

/// Written last into a populated entry; holds the full commit hash
pub const COMPLETION_MARKER: &str = ".custodian-complete";

const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone)]
pub struct ModuleCache {
    root: PathBuf,
}

impl ModuleCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory of the entry for `id`
    ///
    /// Identifiers that would land outside the cache root are rejected.
    pub fn module_dir(&self, id: &ModuleId) -> Result<PathBuf> {
        let cleaned = clean_path(id.as_str());
        if cleaned == "."
            || cleaned.starts_with('/')
            || cleaned == ".."
            || cleaned.starts_with("../")
            || cleaned.starts_with(STAGING_PREFIX)
        {
            return Err(CustodianError::InvalidIdentifier(id.to_string()));
        }
        Ok(self.root.join(cleaned))
    }

    pub fn is_complete(&self, id: &ModuleId) -> bool {
        let Ok(dir) = self.module_dir(id) else {
            return false;
        };
        let complete = dir.is_dir() && self.recorded_commit(id).is_some();
        if !complete && dir.exists() {
            warn!("Ignoring incomplete cache entry {}", dir.display());
        }
        complete
    }

    /// Commit recorded in the completion marker, if the marker holds one
    pub fn recorded_commit(&self, id: &ModuleId) -> Option<Oid> {
        let marker = self.module_dir(id).ok()?.join(COMPLETION_MARKER);
        let content = fs::read_to_string(marker).ok()?;
        Oid::from_str(content.trim()).ok()
    }

    /// Fresh empty directory inside the cache root to populate
    ///
    /// Staging on the same filesystem keeps [`ModuleCache::install`] a rename.
    pub fn stage(&self) -> Result<TempDir> {
        fs::create_dir_all(&self.root).map_err(|source| self.write_error(&self.root, source))?;
        tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|source| self.write_error(&self.root, source))
    }

    /// Mark a populated staging directory complete and move it into place
    pub fn install(&self, staged: TempDir, id: &ModuleId, commit: Oid) -> Result<PathBuf> {
        let target = self.module_dir(id)?;

        let marker = staged.path().join(COMPLETION_MARKER);
        fs::write(&marker, format!("{}\n", commit))
            .map_err(|source| self.write_error(&marker, source))?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| self.write_error(parent, source))?;
        }
        if target.exists() {
            debug!("Removing stale cache entry {}", target.display());
            remove_entry(&target).map_err(|source| self.write_error(&target, source))?;
        }

        if let Err(source) = fs::rename(staged.path(), &target) {
            // Another process may have installed the same entry meanwhile
            if self.is_complete(id) {
                debug!("Cache entry {} installed concurrently", target.display());
                return Ok(target);
            }
            return Err(self.write_error(&target, source));
        }
        Ok(target)
    }

    fn write_error(&self, path: &Path, source: io::Error) -> CustodianError {
        CustodianError::CacheWrite {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn remove_entry(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(_) if path.is_file() => fs::remove_file(path),
        other => other,
    }
}
