//! Git authentication configuration
//!
//! A single mode is selected through `CUSTODIAN_GIT_AUTH_MODE`. Every
//! credential variable may instead be supplied through `<NAME>_FILE`, which
//! names a file holding the value and takes precedence over `<NAME>`.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use git2::{Cred, CredentialType};

use crate::error::{CustodianError, Result};

pub const ENV_GIT_AUTH_MODE: &str = "CUSTODIAN_GIT_AUTH_MODE";
pub const ENV_GIT_AUTH_TOKEN: &str = "CUSTODIAN_GIT_AUTH_TOKEN";
pub const ENV_GIT_USER: &str = "CUSTODIAN_GIT_USER";
pub const ENV_GIT_PASS: &str = "CUSTODIAN_GIT_PASS";
pub const ENV_GIT_SSH_KEY: &str = "CUSTODIAN_GIT_SSH_KEY";
pub const ENV_FILE_SUFFIX: &str = "_FILE";

const DEFAULT_SSH_USER: &str = "git";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GitAuthMode {
    #[default]
    None,
    AuthToken,
    BasicAuth,
    SshKey,
    SshAgent,
}

impl GitAuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AuthToken => "auth-token",
            Self::BasicAuth => "basic-auth",
            Self::SshKey => "ssh-key",
            Self::SshAgent => "ssh-agent",
        }
    }

    pub fn is_ssh(&self) -> bool {
        matches!(self, Self::SshKey | Self::SshAgent)
    }
}

impl FromStr for GitAuthMode {
    type Err = CustodianError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" => Ok(Self::None),
            "auth-token" => Ok(Self::AuthToken),
            "basic-auth" => Ok(Self::BasicAuth),
            "ssh-key" => Ok(Self::SshKey),
            "ssh-agent" => Ok(Self::SshAgent),
            other => Err(CustodianError::Config(format!(
                "Unknown {} '{}', expected one of none, auth-token, basic-auth, ssh-key, ssh-agent",
                ENV_GIT_AUTH_MODE, other
            ))),
        }
    }
}

impl fmt::Display for GitAuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials for one authentication mode
#[derive(Clone, Default)]
pub struct GitAuth {
    mode: GitAuthMode,
    token: Option<String>,
    user: Option<String>,
    password: Option<String>,
    ssh_key: Option<PathBuf>,
}

impl fmt::Debug for GitAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("GitAuth")
            .field("mode", &self.mode)
            .field("token", &redacted(&self.token))
            .field("user", &self.user)
            .field("password", &redacted(&self.password))
            .field("ssh_key", &self.ssh_key)
            .finish()
    }
}

impl GitAuth {
    /// Anonymous access over https
    pub fn none() -> Self {
        Self::default()
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            mode: GitAuthMode::AuthToken,
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mode: GitAuthMode::BasicAuth,
            user: Some(user.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Private key file with optional user and passphrase
    pub fn ssh_key(
        key: impl Into<PathBuf>,
        user: Option<String>,
        passphrase: Option<String>,
    ) -> Self {
        Self {
            mode: GitAuthMode::SshKey,
            ssh_key: Some(key.into()),
            user,
            password: passphrase,
            ..Self::default()
        }
    }

    pub fn ssh_agent() -> Self {
        Self {
            mode: GitAuthMode::SshAgent,
            ..Self::default()
        }
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |name: &str| -> Result<Option<String>> {
            let file_var = format!("{}{}", name, ENV_FILE_SUFFIX);
            if let Some(path) = lookup(&file_var).filter(|p| !p.is_empty()) {
                let content = fs::read_to_string(&path).map_err(|e| {
                    CustodianError::Config(format!("Failed to read {} ({}): {}", file_var, path, e))
                })?;
                return Ok(Some(content.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string()));
            }
            Ok(lookup(name))
        };
        let required = |name: &str, mode: GitAuthMode| -> Result<String> {
            setting(name)?.filter(|v| !v.is_empty()).ok_or_else(|| {
                CustodianError::Config(format!("{} is required for git auth mode {}", name, mode))
            })
        };

        let mode: GitAuthMode = lookup(ENV_GIT_AUTH_MODE).unwrap_or_default().parse()?;
        let auth = match mode {
            GitAuthMode::None => Self::none(),
            GitAuthMode::AuthToken => Self::token(required(ENV_GIT_AUTH_TOKEN, mode)?),
            GitAuthMode::BasicAuth => Self::basic(
                required(ENV_GIT_USER, mode)?,
                setting(ENV_GIT_PASS)?.unwrap_or_default(),
            ),
            GitAuthMode::SshKey => Self::ssh_key(
                required(ENV_GIT_SSH_KEY, mode)?,
                setting(ENV_GIT_USER)?.filter(|v| !v.is_empty()),
                setting(ENV_GIT_PASS)?.filter(|v| !v.is_empty()),
            ),
            GitAuthMode::SshAgent => Self::ssh_agent(),
        };
        Ok(auth)
    }

    pub fn mode(&self) -> GitAuthMode {
        self.mode
    }

    /// Clone URL for a `host/owner/repo` remote
    pub fn remote_url(&self, remote: &str) -> String {
        if self.mode.is_ssh() {
            format!("git@{}", remote.replacen('/', ":", 1))
        } else {
            format!("https://{}", remote)
        }
    }

    /// Extra HTTP header sent with every request, if any
    pub fn authorization_header(&self) -> Option<String> {
        match (&self.mode, &self.token) {
            (GitAuthMode::AuthToken, Some(token)) => Some(format!("Authorization: Bearer {}", token)),
            _ => None,
        }
    }

    /// Answer a libgit2 credential challenge
    pub fn credentials(
        &self,
        url: &str,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> std::result::Result<Cred, git2::Error> {
        match self.mode {
            GitAuthMode::None => Cred::default(),
            GitAuthMode::AuthToken => {
                let token = self.token.as_deref().unwrap_or_default();
                Cred::userpass_plaintext(username_from_url.unwrap_or("oauth2"), token)
            }
            GitAuthMode::BasicAuth => Cred::userpass_plaintext(
                self.user.as_deref().unwrap_or_default(),
                self.password.as_deref().unwrap_or_default(),
            ),
            GitAuthMode::SshKey | GitAuthMode::SshAgent
                if allowed.contains(CredentialType::USERNAME) =>
            {
                Cred::username(self.ssh_user(username_from_url))
            }
            GitAuthMode::SshKey => match &self.ssh_key {
                Some(key) => Cred::ssh_key(
                    self.ssh_user(username_from_url),
                    None,
                    key,
                    self.password.as_deref(),
                ),
                None => Err(git2::Error::from_str(&format!(
                    "No ssh key configured for {}",
                    url
                ))),
            },
            GitAuthMode::SshAgent => Cred::ssh_key_from_agent(self.ssh_user(username_from_url)),
        }
    }

    fn ssh_user<'a>(&'a self, username_from_url: Option<&'a str>) -> &'a str {
        self.user
            .as_deref()
            .or(username_from_url)
            .unwrap_or(DEFAULT_SSH_USER)
    }
}
