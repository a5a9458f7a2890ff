//! Dependency tree construction
//!
//! The tree is the closure of every module reachable from a root module.
//! Construction is a breadth-first worklist over declared identifiers with a
//! visited set, so each identifier is resolved at most once and cycles
//! terminate.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::identifier::ModuleId;
use crate::manifest::lock_file_contents;
use crate::module::Module;
use crate::resolver::Resolve;

/// Flat set of all modules reachable from a root
#[derive(Debug)]
pub struct DependencyTree {
    root: ModuleId,
    /// Keyed by resolved identifier, in discovery order
    modules: IndexMap<ModuleId, Module>,
    /// Declared identifier -> resolved identifier, where they differ
    aliases: HashMap<ModuleId, ModuleId>,
}

impl DependencyTree {
    /// Resolve the full closure of `root`
    ///
    /// Any resolution failure aborts construction; no partial tree is
    /// returned.
    #[instrument(skip_all, fields(root = %root.id()), level = "debug")]
    pub fn build(root: Module, resolver: &dyn Resolve) -> Result<Self> {
        let root_id = root.id().clone();
        let mut queue: VecDeque<ModuleId> = root.dependency_ids().cloned().collect();
        let mut visited: HashSet<ModuleId> = HashSet::from([root_id.clone()]);
        let mut modules = IndexMap::new();
        let mut aliases = HashMap::new();
        modules.insert(root_id.clone(), root);

        while let Some(requested) = queue.pop_front() {
            if !visited.insert(requested.clone()) || modules.contains_key(&requested) {
                continue;
            }

            debug!("Resolving dependency {}", requested);
            let module = resolver.resolve(&requested)?;
            let resolved = module.id().clone();
            if resolved != requested {
                aliases.insert(requested, resolved.clone());
            }

            // Two requests may land on the same resolved module
            if modules.contains_key(&resolved) {
                continue;
            }
            visited.insert(resolved.clone());
            queue.extend(
                module
                    .dependency_ids()
                    .filter(|id| !visited.contains(*id))
                    .cloned(),
            );
            modules.insert(resolved, module);
        }

        info!("Dependency tree of {} has {} modules", root_id, modules.len());
        Ok(Self {
            root: root_id,
            modules,
            aliases,
        })
    }

    /// Tree holding exactly the given modules, without resolving anything
    #[cfg(test)]
    pub(crate) fn from_modules(root: Module, others: impl IntoIterator<Item = Module>) -> Self {
        let root_id = root.id().clone();
        let mut modules = IndexMap::new();
        modules.insert(root_id.clone(), root);
        modules.extend(others.into_iter().map(|module| (module.id().clone(), module)));
        Self {
            root: root_id,
            modules,
            aliases: HashMap::new(),
        }
    }

    pub fn root_id(&self) -> &ModuleId {
        &self.root
    }

    /// Find a module by resolved or declared identifier
    pub fn get(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.get(id).or_else(|| {
            self.aliases
                .get(id)
                .and_then(|resolved| self.modules.get(resolved))
        })
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Sorted, de-duplicated resolved identifiers excluding local paths
    pub fn lock_snapshot(&self) -> Vec<ModuleId> {
        self.modules
            .keys()
            .filter(|id| !id.is_local())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// JSON contents of `module.lock` for this tree
    pub fn lock_file_contents(&self) -> Result<Vec<u8>> {
        lock_file_contents(&self.lock_snapshot())
    }
}
