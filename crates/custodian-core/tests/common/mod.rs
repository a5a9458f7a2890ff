//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use custodian_core::error::{CustodianError, Result};
use custodian_core::resolver::{FetchRequest, RepositorySource};
use custodian_core::{Module, ModuleId};
use git2::build::RepoBuilder;
use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

/// 2023-11-14 22:13:20 UTC
pub const EPOCH: i64 = 1_700_000_000;

/// Directory holding the on-disk module fixtures
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Resolver serving modules straight out of [`fixtures_dir`]
pub fn fixture_resolver(id: &ModuleId) -> Result<Module> {
    let dir = fixtures_dir().join(id.as_str());
    if !dir.is_dir() {
        return Err(CustodianError::ModuleNotFound(id.to_string()));
    }
    Module::from_dir(id.clone(), dir)
}

/// Scratch git repository with full control over commit times and tags
pub struct FixtureRepo {
    dir: TempDir,
    repo: Repository,
}

impl FixtureRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Write `files` and commit them on top of HEAD at `time` (seconds since epoch)
    pub fn commit(&self, files: &[(&str, &str)], time: i64) -> Oid {
        let mut index = self.repo.index().unwrap();
        for (name, contents) in files {
            let path = self.dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, contents).unwrap();
            index.add_path(Path::new(name)).unwrap();
        }
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        let signature =
            Signature::new("Fixture", "fixture@example.com", &Time::new(time, 0)).unwrap();
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        self.repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &format!("commit at {}", time),
                &tree,
                &parents,
            )
            .unwrap()
    }

    pub fn tag(&self, name: &str, commit: Oid) {
        self.repo
            .reference(&format!("refs/tags/{}", name), commit, false, "fixture tag")
            .unwrap();
    }

    /// Annotated tag on any object, including another tag
    pub fn annotated_tag(&self, name: &str, target: Oid) -> Oid {
        let object = self.repo.find_object(target, None).unwrap();
        let tagger =
            Signature::new("Fixture", "fixture@example.com", &Time::new(EPOCH, 0)).unwrap();
        self.repo
            .tag(name, &object, &tagger, &format!("release {}", name), false)
            .unwrap()
    }
}

/// Repository source that clones a local fixture repository
#[derive(Debug, Clone)]
pub struct MirrorSource {
    origin: PathBuf,
    fetches: Arc<AtomicUsize>,
}

impl MirrorSource {
    pub fn new(origin: impl Into<PathBuf>) -> Self {
        Self {
            origin: origin.into(),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RepositorySource for MirrorSource {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Repository> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if request.cancellation.is_cancelled() {
            return Err(CustodianError::Cancelled);
        }
        let url = self.origin.to_string_lossy().to_string();
        RepoBuilder::new()
            .clone(&url, request.dest)
            .map_err(|source| CustodianError::Clone { url, source })
    }
}
