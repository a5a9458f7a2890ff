//! Module manifest (`custodian.json`) and lock file (`module.lock`) formats

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{CustodianError, Result};
use crate::identifier::ModuleId;

pub const MANIFEST_FILE_NAME: &str = "custodian.json";
pub const LOCK_FILE_NAME: &str = "module.lock";

/// Declared identity and requirements of a module
///
/// `require` keeps the order of the file; new aliases are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub module: String,
    #[serde(default)]
    pub require: IndexMap<String, ModuleId>,
}

impl Manifest {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            require: IndexMap::new(),
        }
    }

    /// Parse manifest bytes; `origin` only labels errors
    pub fn from_slice(data: &[u8], origin: &str) -> Result<Self> {
        serde_json::from_slice(data).map_err(|source| CustodianError::ManifestParse {
            origin: origin.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CustodianError::ManifestNotFound(path.to_path_buf()),
            _ => CustodianError::Io(e),
        })?;
        Self::from_slice(&data, &path.display().to_string())
    }

    /// Serialize with 4-space indentation
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        out.push(b'\n');
        Ok(out)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_json()?)
    }

    /// Add or replace the requirement stored under `alias`
    pub fn set_requirement(&mut self, alias: impl Into<String>, id: ModuleId) -> Option<ModuleId> {
        self.require.insert(alias.into(), id)
    }

    pub fn remove_requirement(&mut self, alias: &str) -> Option<ModuleId> {
        self.require.shift_remove(alias)
    }
}

/// Serialize a lock snapshot as a 2-space indented JSON array
pub fn lock_file_contents(ids: &[ModuleId]) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(ids)?;
    out.push(b'\n');
    Ok(out)
}

/// Replace `path` with `data` through a sibling temporary file
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.persist(path).map_err(|e| CustodianError::Io(e.error))?;
    Ok(())
}
