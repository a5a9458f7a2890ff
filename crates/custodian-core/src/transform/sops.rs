//! Decryption of SOPS-encrypted files
//!
//! Only the file name suffix of the location tag is inspected; files without
//! a `.sops.` marker pass through untouched.

use std::error::Error;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::Transformer;
use crate::error::{CustodianError, Result};

/// Document format handed to the decryptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SopsFormat {
    Json,
    Yaml,
    Ini,
    Dotenv,
    Binary,
}

impl SopsFormat {
    /// Detect the format from a file name or location tag
    pub fn detect(name: &str) -> Option<Self> {
        if name.ends_with(".sops.json") {
            Some(Self::Json)
        } else if name.ends_with(".sops.yaml") || name.ends_with(".sops.yml") {
            Some(Self::Yaml)
        } else if name.ends_with(".sops.ini") {
            Some(Self::Ini)
        } else if name.ends_with(".sops.env") || name.ends_with(".sops.dotenv") {
            Some(Self::Dotenv)
        } else if name.contains(".sops.") {
            Some(Self::Binary)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Ini => "ini",
            Self::Dotenv => "dotenv",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for SopsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type DecryptResult = std::result::Result<Vec<u8>, Box<dyn Error + Send + Sync>>;

/// External decryption capability
pub trait Decryptor: Send + Sync {
    fn decrypt(&self, data: &[u8], format: SopsFormat) -> DecryptResult;
}

/// Decrypts through the `sops` executable
///
/// Keys are discovered the way `sops` normally does it, e.g. from
/// `SOPS_AGE_KEY` or `SOPS_AGE_KEY_FILE`.
#[derive(Debug, Clone)]
pub struct SopsCli {
    program: PathBuf,
    envs: Vec<(String, String)>,
}

impl Default for SopsCli {
    fn default() -> Self {
        Self::new()
    }
}

impl SopsCli {
    pub fn new() -> Self {
        Self::with_program("sops")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            envs: Vec::new(),
        }
    }

    /// Extra environment for the child process, e.g. `SOPS_AGE_KEY`
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl Decryptor for SopsCli {
    fn decrypt(&self, data: &[u8], format: SopsFormat) -> DecryptResult {
        let mut child = Command::new(&self.program)
            .args(["--decrypt", "--input-type", format.as_str()])
            .args(["--output-type", format.as_str(), "/dev/stdin"])
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // sops reads all of stdin before writing anything
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(data)?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("sops exited with {}: {}", output.status, stderr.trim()).into());
        }
        Ok(output.stdout)
    }
}

/// Transformer that decrypts files whose name carries a `.sops.` marker
pub struct SopsTransformer<D = SopsCli> {
    decryptor: D,
}

impl SopsTransformer<SopsCli> {
    pub fn new() -> Self {
        Self::with_decryptor(SopsCli::new())
    }
}

impl Default for SopsTransformer<SopsCli> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Decryptor> SopsTransformer<D> {
    pub fn with_decryptor(decryptor: D) -> Self {
        Self { decryptor }
    }
}

impl<D: Decryptor> Transformer for SopsTransformer<D> {
    fn transform(&self, found_at: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        let Some(format) = SopsFormat::detect(found_at) else {
            return Ok(data);
        };

        debug!("Decrypting {} as {}", found_at, format);
        self.decryptor
            .decrypt(&data, format)
            .map_err(|e| CustodianError::TransformerFailed {
                location: found_at.to_string(),
                message: e.to_string(),
            })
    }
}
