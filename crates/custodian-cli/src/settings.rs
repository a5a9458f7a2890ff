//! Per-invocation settings

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use custodian_core::{Dispatcher, GitAuth};

/// Environment variable overriding the module cache location
pub const ENV_MODULE_CACHE: &str = "CUSTODIAN_MODULE_CACHE";

/// `<temp>/jnetx/modules`
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("jnetx").join("modules")
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub git_auth: GitAuth,
}

impl Settings {
    pub fn new(cache_dir: impl Into<PathBuf>, git_auth: GitAuth) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            git_auth,
        }
    }

    /// Git credentials from the environment, cache from `cache_dir` or the default
    pub fn from_env(cache_dir: Option<PathBuf>) -> Result<Self> {
        let git_auth = GitAuth::from_env().context("Invalid git authentication settings")?;
        Ok(Self::new(
            cache_dir.unwrap_or_else(default_cache_dir),
            git_auth,
        ))
    }

    /// Resolver for a project rooted at `project_root`
    pub fn resolver(&self, project_root: &Path) -> Dispatcher {
        Dispatcher::with_defaults(project_root, &self.cache_dir, self.git_auth.clone())
    }
}
