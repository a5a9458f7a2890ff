//! In-memory representation of a resolved module

use std::io;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::Result;
use crate::fs::{DirTree, FileTree};
use crate::identifier::ModuleId;
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::tree::DependencyTree;

/// A resolved module: its identity, its declared dependencies and its files
#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    dependencies: IndexMap<String, ModuleId>,
    files: Box<dyn FileTree>,
}

/// Outcome of looking up a dependency alias
#[derive(Debug)]
pub enum DependencyLookup<'t> {
    /// The alias is not declared; the import is local to the module
    Unknown,
    /// Declared, but the tree has no module for it
    Missing(ModuleId),
    /// Declared and present in the tree
    Found(&'t Module),
}

impl Module {
    pub fn new(
        id: ModuleId,
        dependencies: IndexMap<String, ModuleId>,
        files: impl FileTree + 'static,
    ) -> Self {
        Self {
            id,
            dependencies,
            files: Box::new(files),
        }
    }

    /// Build a module from its files, reading the manifest when one exists
    pub fn from_tree(id: ModuleId, files: impl FileTree + 'static) -> Result<Self> {
        let dependencies = match files.read(MANIFEST_FILE_NAME) {
            Ok(data) => {
                let origin = format!("{}/{}", id, MANIFEST_FILE_NAME);
                Manifest::from_slice(&data, &origin)?.require
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(id, dependencies, files))
    }

    pub fn from_dir(id: ModuleId, dir: impl Into<PathBuf>) -> Result<Self> {
        Self::from_tree(id, DirTree::new(dir))
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Alias to identifier mapping declared by the manifest
    pub fn dependencies(&self) -> &IndexMap<String, ModuleId> {
        &self.dependencies
    }

    pub fn dependency_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.dependencies.values()
    }

    pub fn files(&self) -> &dyn FileTree {
        self.files.as_ref()
    }

    pub fn dependency_module<'t>(&self, alias: &str, tree: &'t DependencyTree) -> DependencyLookup<'t> {
        match self.dependencies.get(alias) {
            None => DependencyLookup::Unknown,
            Some(id) => match tree.get(id) {
                Some(module) => DependencyLookup::Found(module),
                None => DependencyLookup::Missing(id.clone()),
            },
        }
    }
}
