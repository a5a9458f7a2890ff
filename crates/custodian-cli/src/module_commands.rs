//! Module management commands, single imports and evaluation

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use custodian_core::fs::DirTree;
use custodian_core::identifier::REMOVE_VERSION;
use custodian_core::manifest::{write_atomic, LOCK_FILE_NAME, MANIFEST_FILE_NAME};
use custodian_core::{
    DependencyTree, ImportCallback, Imported, Importer, Manifest, Module, ModuleId, Resolve,
    SopsTransformer,
};
use tracing::{debug, info, warn};

use crate::jsonnet;
use crate::settings::Settings;

/// Identifier of the project module in the dependency tree
pub const ROOT_MODULE_ID: &str = ".";

#[derive(Subcommand, Debug)]
pub enum ModCommand {
    /// Create a custodian.json in the current directory
    Init {
        /// Module name
        name: String,
    },

    /// Add, update or remove requirements and refresh module.lock
    ///
    /// Without arguments every requirement is resolved again.
    /// `<repo>@none` drops the requirement.
    Get {
        /// Module identifiers such as github.com/org/repo@v1.2.0
        ids: Vec<String>,
    },
}

/// Runs module commands against a project directory
pub struct ModuleManager {
    project_root: PathBuf,
    resolver: Box<dyn Resolve>,
}

impl ModuleManager {
    pub fn new(project_root: PathBuf, settings: &Settings) -> Self {
        let resolver = settings.resolver(&project_root);
        Self::with_resolver(project_root, resolver)
    }

    pub fn with_resolver(project_root: PathBuf, resolver: impl Resolve + 'static) -> Self {
        Self {
            project_root,
            resolver: Box::new(resolver),
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.project_root.join(MANIFEST_FILE_NAME)
    }

    fn lock_path(&self) -> PathBuf {
        self.project_root.join(LOCK_FILE_NAME)
    }

    pub fn execute(&self, command: ModCommand) -> Result<()> {
        match command {
            ModCommand::Init { name } => self.init(&name),
            ModCommand::Get { ids } => self.get(&ids),
        }
    }

    pub fn init(&self, name: &str) -> Result<()> {
        let path = self.manifest_path();
        if path.exists() {
            bail!("module file '{}' already exists", path.display());
        }

        println!("Initializing module: {}", name);
        Manifest::new(name)
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("✓ Module '{}' initialized successfully.", name);
        Ok(())
    }

    /// Update requirements, then rewrite the manifest and lock together
    ///
    /// Nothing is written unless every module in the closure resolves.
    pub fn get(&self, ids: &[String]) -> Result<()> {
        let path = self.manifest_path();
        let mut manifest = Manifest::load(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;

        if ids.is_empty() {
            self.refresh_requirements(&mut manifest)?;
        }

        for raw in ids {
            let id = ModuleId::new(raw.as_str());
            let alias = id.default_alias();
            if alias.is_empty() {
                bail!("Cannot derive an alias for '{}'", id);
            }

            if id.version() == REMOVE_VERSION {
                match manifest.remove_requirement(&alias) {
                    Some(previous) => println!("✓ Removed '{}' ({})", alias, previous),
                    None => warn!("No requirement named '{}' to remove", alias),
                }
                continue;
            }

            let module = self
                .resolver
                .resolve(&id)
                .with_context(|| format!("Failed to resolve {}", id))?;
            println!(
                "✓ Module '{}' added/updated successfully in '{}'.",
                module.id(),
                MANIFEST_FILE_NAME
            );
            manifest.set_requirement(alias, module.id().clone());
        }

        let tree = self.build_tree(&manifest)?;
        let lock = tree.lock_file_contents()?;

        manifest
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        let lock_path = self.lock_path();
        write_atomic(&lock_path, &lock)
            .with_context(|| format!("Failed to write {}", lock_path.display()))?;
        info!(
            "Wrote {} with {} locked modules",
            LOCK_FILE_NAME,
            tree.lock_snapshot().len()
        );
        Ok(())
    }

    fn refresh_requirements(&self, manifest: &mut Manifest) -> Result<()> {
        let current: Vec<(String, ModuleId)> = manifest
            .require
            .iter()
            .map(|(alias, id)| (alias.clone(), id.clone()))
            .collect();

        for (alias, id) in current {
            let module = self
                .resolver
                .resolve(&id)
                .with_context(|| format!("Failed to resolve {}", id))?;
            if module.id() != &id {
                debug!("{} now resolves to {}", id, module.id());
            }
            manifest.set_requirement(alias, module.id().clone());
        }
        Ok(())
    }

    /// Closure of the on-disk manifest
    pub fn dependency_tree(&self) -> Result<DependencyTree> {
        let path = self.manifest_path();
        let manifest = Manifest::load(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        self.build_tree(&manifest)
    }

    fn build_tree(&self, manifest: &Manifest) -> Result<DependencyTree> {
        let root = Module::new(
            ModuleId::new(ROOT_MODULE_ID),
            manifest.require.clone(),
            DirTree::new(&self.project_root),
        );
        DependencyTree::build(root, self.resolver.as_ref())
            .context("Failed to build the dependency tree")
    }

    /// Importer over the project's dependency tree with sops decryption enabled
    pub fn importer(&self) -> Result<Importer> {
        Ok(Importer::new(self.dependency_tree()?).with_transformer(SopsTransformer::new()))
    }

    /// Resolve a single import
    pub fn import(&self, imported_from: &str, imported_path: &str) -> Result<Imported> {
        self.importer()?
            .import(imported_from, imported_path)
            .with_context(|| format!("Failed to import '{}'", imported_path))
    }

    /// Evaluate a file of the project with imports served by the dependency tree
    pub fn evaluate(&self, file: &str) -> Result<String> {
        let file = Path::new(file);
        let relative = file.strip_prefix(&self.project_root).unwrap_or(file);
        // Explicitly relative, so a leading directory is never taken for an alias
        let entry = Path::new(".").join(relative);
        let entry = entry
            .to_str()
            .with_context(|| format!("Path is not UTF-8: {}", file.display()))?;
        jsonnet::evaluate(self.importer()?, entry)
            .with_context(|| format!("Failed to evaluate '{}'", file.display()))
    }
}
