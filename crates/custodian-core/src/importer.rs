//! Cross-module import resolution
//!
//! Imports are written as `alias/path/in/dependency` or as paths inside the
//! importing module. The importer maps them onto files of modules in a
//! [`DependencyTree`] and returns the canonical location tag that the
//! interpreter passes back for nested imports.

use std::io;

use tracing::debug;

use crate::error::{CustodianError, Result};
use crate::location::{
    clean_path, is_relative_import, join_relative, split_imported_path, Location,
    DEFAULT_ROOT_FILE,
};
use crate::module::{DependencyLookup, Module};
use crate::transform::{Transformer, TransformerPipeline};
use crate::tree::DependencyTree;

/// Result of a successful import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imported {
    /// File contents after every transformer ran
    pub contents: Vec<u8>,
    /// Canonical location tag of the file
    pub found_at: String,
}

/// Import callback contract for interpreters with pluggable import resolution
pub trait ImportCallback {
    fn import(&self, imported_from: &str, imported_path: &str) -> Result<Imported>;
}

/// Serves imports out of a dependency tree
#[derive(Debug)]
pub struct Importer {
    tree: DependencyTree,
    transformers: TransformerPipeline,
}

impl Importer {
    pub fn new(tree: DependencyTree) -> Self {
        Self {
            tree,
            transformers: TransformerPipeline::new(),
        }
    }

    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.add_transformer(transformer);
        self
    }

    pub fn add_transformer(&mut self, transformer: impl Transformer + 'static) {
        self.transformers.push(transformer);
    }

    pub fn tree(&self) -> &DependencyTree {
        &self.tree
    }

    /// Work out which module and file satisfy an import
    pub fn locate(&self, imported_from: &str, imported_path: &str) -> Result<(&Module, Location)> {
        let source = Location::parse(imported_from).unwrap_or_else(|| {
            Location::new(self.tree.root_id().clone(), DEFAULT_ROOT_FILE)
        });
        let source_file = if source.path.is_empty() {
            DEFAULT_ROOT_FILE
        } else {
            source.path.as_str()
        };

        let source_module = self
            .tree
            .get(&source.module)
            .ok_or_else(|| CustodianError::ModuleNotFound(source.module.to_string()))?;

        let (alias, remainder) = split_imported_path(imported_path);
        match source_module.dependency_module(alias, &self.tree) {
            DependencyLookup::Unknown => {
                let path = if is_relative_import(imported_path) {
                    join_relative(source_file, imported_path)
                } else {
                    clean_path(imported_path)
                };
                Ok((source_module, Location::new(source_module.id().clone(), path)))
            }
            DependencyLookup::Found(module) => {
                let location = Location::new(module.id().clone(), clean_path(remainder));
                Ok((module, location))
            }
            DependencyLookup::Missing(id) => Err(CustodianError::TreeModuleNotFound(id.to_string())),
        }
    }

    /// Contents of the file named by a location tag this importer produced
    pub fn load(&self, found_at: &str) -> Result<Vec<u8>> {
        let location = Location::parse(found_at)
            .ok_or_else(|| CustodianError::ImportPathNotFound(found_at.to_string()))?;
        let module = self
            .tree
            .get(&location.module)
            .ok_or_else(|| CustodianError::ModuleNotFound(location.module.to_string()))?;
        self.read(module, &location.path, found_at)
    }

    fn read(&self, module: &Module, path: &str, found_at: &str) -> Result<Vec<u8>> {
        let data = module.files().read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CustodianError::ImportPathNotFound(found_at.to_string()),
            _ => CustodianError::Io(e),
        })?;
        self.transformers.apply(found_at, data)
    }
}

impl ImportCallback for Importer {
    fn import(&self, imported_from: &str, imported_path: &str) -> Result<Imported> {
        let (module, location) = self.locate(imported_from, imported_path)?;
        let found_at = location.to_string();
        debug!("Import {:?} from {:?} resolved to {}", imported_path, imported_from, found_at);

        let contents = self.read(module, &location.path, &found_at)?;
        Ok(Imported { contents, found_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::DirTree;
    use crate::identifier::ModuleId;
    use indexmap::IndexMap;

    #[test]
    fn test_alias_missing_from_tree() {
        let dependencies: IndexMap<String, ModuleId> = [(
            "lib".to_string(),
            ModuleId::new("github.com/org/lib@v1.0.0"),
        )]
        .into_iter()
        .collect();
        let root = Module::new(ModuleId::new("."), dependencies, DirTree::new("/nonexistent"));
        let importer = Importer::new(DependencyTree::from_modules(root, Vec::<Module>::new()));

        let err = importer.import("", "lib/main.jsonnet").unwrap_err();
        assert!(
            matches!(&err, CustodianError::TreeModuleNotFound(id) if id == "github.com/org/lib@v1.0.0"),
            "unexpected error: {:?}",
            err
        );
    }

    #[test]
    fn test_load_rejects_unknown_tags() {
        let root = Module::new(ModuleId::new("."), IndexMap::new(), DirTree::new("/nonexistent"));
        let importer = Importer::new(DependencyTree::from_modules(root, Vec::<Module>::new()));

        assert!(matches!(
            importer.load(""),
            Err(CustodianError::ImportPathNotFound(_))
        ));
        assert!(matches!(
            importer.load("github.com/o/r@v1.0.0:mod-sep:main.jsonnet"),
            Err(CustodianError::ModuleNotFound(_))
        ));
        assert!(matches!(
            importer.load(".:mod-sep:main.jsonnet"),
            Err(CustodianError::ImportPathNotFound(tag)) if tag == ".:mod-sep:main.jsonnet"
        ));
    }
}
