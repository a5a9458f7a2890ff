//! Git-backed module resolution

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, Oid, RemoteCallbacks, Repository};
use tracing::{debug, info, instrument};

use super::auth::GitAuth;
use super::cache::{ModuleCache, COMPLETION_MARKER};
use super::version::resolve_version;
use super::Resolve;
use crate::error::{CustodianError, Result};
use crate::fs::DirTree;
use crate::identifier::ModuleId;
use crate::module::Module;

/// libgit2 keeps asking while credentials are rejected
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Shared flag that aborts in-flight and future fetches once raised
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a source needs to materialize one repository
#[derive(Debug)]
pub struct FetchRequest<'a> {
    /// `host/owner/repo`
    pub remote: &'a str,
    pub branch: Option<&'a str>,
    /// Empty directory to clone into
    pub dest: &'a Path,
    pub cancellation: &'a Cancellation,
}

/// Where repositories come from
pub trait RepositorySource: fmt::Debug + Send + Sync {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Repository>;
}

/// Clones over the network with the configured authentication
#[derive(Debug, Clone, Default)]
pub struct RemoteSource {
    auth: GitAuth,
}

impl RemoteSource {
    pub fn new(auth: GitAuth) -> Self {
        Self { auth }
    }
}

impl RepositorySource for RemoteSource {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Repository> {
        let url = self.auth.remote_url(request.remote);
        info!("Cloning {}", url);

        let mut callbacks = RemoteCallbacks::new();
        let mut attempts = 0;
        callbacks.credentials(|url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }
            self.auth.credentials(url, username_from_url, allowed)
        });
        let cancellation = request.cancellation.clone();
        callbacks.transfer_progress(move |_| !cancellation.is_cancelled());

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        if let Some(header) = self.auth.authorization_header() {
            fetch_options.custom_headers(&[header.as_str()]);
        }

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        if let Some(branch) = request.branch {
            builder.branch(branch);
        }

        builder.clone(&url, request.dest).map_err(|source| {
            if request.cancellation.is_cancelled() {
                CustodianError::Cancelled
            } else {
                CustodianError::Clone { url, source }
            }
        })
    }
}

/// Resolves remote identifiers through the module cache, cloning on a miss
#[derive(Debug)]
pub struct GitResolver {
    cache: ModuleCache,
    source: Box<dyn RepositorySource>,
    cancellation: Cancellation,
}

impl GitResolver {
    pub fn new(cache: ModuleCache, source: impl RepositorySource + 'static) -> Self {
        Self {
            cache,
            source: Box::new(source),
            cancellation: Cancellation::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Make sure the module is in the cache and return its resolved identifier
    #[instrument(skip(self), fields(module = %id), level = "debug")]
    pub fn fetch(&self, id: &ModuleId) -> Result<ModuleId> {
        self.cache.module_dir(id)?;
        if self.cache.is_complete(id) {
            if let Some(commit) = self.cache.recorded_commit(id) {
                debug!("Cache hit for {} at {}", id, commit);
            }
            return Ok(id.clone());
        }
        if self.cancellation.is_cancelled() {
            return Err(CustodianError::Cancelled);
        }

        let remote = id.remote();
        let staged = self.cache.stage()?;
        let request = FetchRequest {
            remote,
            branch: Some(id.branch()).filter(|b| !b.is_empty()),
            dest: staged.path(),
            cancellation: &self.cancellation,
        };

        let resolved = {
            let repo = self.source.fetch(&request)?;
            let resolved = resolve_version(&repo, id.version())?;
            checkout(&repo, resolved.commit)?;
            resolved
        };
        strip_git_metadata(staged.path())?;

        let resolved_id = ModuleId::versioned(remote, &resolved.version);
        self.cache.install(staged, &resolved_id, resolved.commit)?;
        info!("Module cloned {}", resolved_id);
        Ok(resolved_id)
    }
}

impl Resolve for GitResolver {
    fn resolve(&self, id: &ModuleId) -> Result<Module> {
        let resolved = self.fetch(id)?;
        let dir = self.cache.module_dir(&resolved)?;
        Module::from_tree(resolved, DirTree::new(dir).hiding(COMPLETION_MARKER))
    }
}

fn checkout(repo: &Repository, commit: Oid) -> Result<()> {
    let failed = |source: git2::Error| CustodianError::Checkout {
        commit: commit.to_string(),
        source,
    };
    repo.set_head_detached(commit).map_err(failed)?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
        .map_err(failed)
}

fn strip_git_metadata(dir: &Path) -> Result<()> {
    let git_dir = dir.join(".git");
    match fs::remove_dir_all(&git_dir) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(CustodianError::CacheWrite {
            path: git_dir,
            source: e,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let cancellation = Cancellation::new();
        let observer = cancellation.clone();
        assert!(!observer.is_cancelled());
        cancellation.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_strip_git_metadata_tolerates_missing_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        strip_git_metadata(dir.path())?;

        fs::create_dir_all(dir.path().join(".git/objects"))?;
        fs::write(dir.path().join("main.jsonnet"), "{}")?;
        strip_git_metadata(dir.path())?;
        assert!(!dir.path().join(".git").exists());
        assert!(dir.path().join("main.jsonnet").exists());
        Ok(())
    }
}
