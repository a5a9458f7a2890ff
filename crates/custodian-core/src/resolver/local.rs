use std::path::PathBuf;

use tracing::debug;

use super::Resolve;
use crate::error::{CustodianError, Result};
use crate::identifier::ModuleId;
use crate::module::Module;

/// Loads modules identified by a filesystem path
///
/// Relative paths are taken relative to `base_dir`. The identifier is kept
/// verbatim as the module id.
#[derive(Debug, Clone)]
pub struct LocalResolver {
    base_dir: PathBuf,
}

impl LocalResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl Resolve for LocalResolver {
    fn resolve(&self, id: &ModuleId) -> Result<Module> {
        let dir = self.base_dir.join(id.as_str());
        if !dir.is_dir() {
            return Err(CustodianError::ModuleNotFound(id.to_string()));
        }
        debug!("Loading local module {} from {}", id, dir.display());
        Module::from_dir(id.clone(), dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
    use std::fs;

    #[test]
    fn test_resolves_relative_to_base_dir() -> Result<()> {
        let base = tempfile::tempdir()?;
        let lib = base.path().join("lib");
        fs::create_dir_all(&lib)?;
        let mut manifest = Manifest::new("lib");
        manifest.set_requirement("other", ModuleId::new("github.com/o/other@v1.0.0"));
        manifest.save(&lib.join(MANIFEST_FILE_NAME))?;
        fs::write(lib.join("main.jsonnet"), "{}")?;

        let module = LocalResolver::new(base.path()).resolve(&ModuleId::new("./lib"))?;
        assert_eq!(module.id().as_str(), "./lib");
        assert_eq!(module.dependencies().len(), 1);
        assert_eq!(module.files().read("main.jsonnet")?, b"{}");
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_module_not_found() {
        let base = tempfile::tempdir().unwrap();
        let err = LocalResolver::new(base.path())
            .resolve(&ModuleId::new("./absent"))
            .unwrap_err();
        assert!(matches!(err, CustodianError::ModuleNotFound(id) if id == "./absent"));
    }
}
