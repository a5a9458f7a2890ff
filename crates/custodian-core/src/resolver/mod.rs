//! Module resolution
//!
//! A [`Resolve`] implementation turns a declared identifier into a loaded
//! [`Module`]. Local paths are read straight from disk; everything else is
//! fetched from git into the module cache.

pub mod auth;
pub mod cache;
mod git;
mod local;
pub mod version;
pub mod versioning;

use std::fmt;
use std::path::PathBuf;

use crate::error::Result;
use crate::identifier::ModuleId;
use crate::module::Module;

pub use auth::{GitAuth, GitAuthMode};
pub use cache::{ModuleCache, COMPLETION_MARKER};
pub use git::{Cancellation, FetchRequest, GitResolver, RemoteSource, RepositorySource};
pub use local::LocalResolver;
pub use version::{resolve_version, ResolvedVersion};

/// Turns a module identifier into a module
pub trait Resolve: Send + Sync {
    fn resolve(&self, id: &ModuleId) -> Result<Module>;
}

impl<F> Resolve for F
where
    F: Fn(&ModuleId) -> Result<Module> + Send + Sync,
{
    fn resolve(&self, id: &ModuleId) -> Result<Module> {
        self(id)
    }
}

/// Routes local paths to one resolver and remote identifiers to another
pub struct Dispatcher {
    local: Box<dyn Resolve>,
    remote: Box<dyn Resolve>,
}

impl Dispatcher {
    pub fn new(local: impl Resolve + 'static, remote: impl Resolve + 'static) -> Self {
        Self {
            local: Box::new(local),
            remote: Box::new(remote),
        }
    }

    /// Local paths relative to `base_dir`, remotes through git with `auth`
    /// and the cache at `cache_dir`
    pub fn with_defaults(
        base_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        auth: GitAuth,
    ) -> Self {
        Self::new(
            LocalResolver::new(base_dir),
            GitResolver::new(ModuleCache::new(cache_dir), RemoteSource::new(auth)),
        )
    }
}

impl Resolve for Dispatcher {
    fn resolve(&self, id: &ModuleId) -> Result<Module> {
        if id.is_local() {
            self.local.resolve(id)
        } else {
            self.remote.resolve(id)
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
