//! Resolution of a version specifier against repository history

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use git2::{Commit, Object, ObjectType, Oid, Repository, Sort};
use tracing::{debug, instrument, warn};

use super::versioning::{self, REV_LENGTH};
use crate::error::{CustodianError, Result};

/// Annotated tags may point at other tags; chains longer than this are rejected
const MAX_TAG_DEPTH: usize = 16;

/// Outcome of resolving a specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Exact tag name or synthesized pseudo-version
    pub version: String,
    pub commit: Oid,
}

/// What a commit in history has to match
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchKey {
    Exact(Oid),
    Prefix(String),
}

impl SearchKey {
    fn matches(&self, oid: Oid) -> bool {
        match self {
            Self::Exact(wanted) => *wanted == oid,
            Self::Prefix(prefix) => oid.to_string().starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(oid) => write!(f, "{}", oid),
            Self::Prefix(prefix) => f.write_str(prefix),
        }
    }
}

/// Resolve `specifier` (tag, pseudo-version, commit prefix or empty for HEAD)
/// to a version string and commit
#[instrument(skip(repo), level = "debug")]
pub fn resolve_version(repo: &Repository, specifier: &str) -> Result<ResolvedVersion> {
    let key = search_key(repo, specifier)?;
    let tags = tag_map(repo)?;

    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    walk.push_head()?;

    let mut base: Option<Commit<'_>> = None;
    for oid in walk {
        let oid = oid?;
        if let Some(commit) = &base {
            if let Some(tag) = tags.get(&oid).and_then(|names| lowest_version(names)) {
                debug!("Closest tagged ancestor of {} is {}", commit.id(), tag);
                return synthesize(commit, Some(tag));
            }
        } else if key.matches(oid) {
            if let Some(tag) = tags.get(&oid).and_then(|names| names.first()) {
                debug!("{} is tagged {}", oid, tag);
                return Ok(ResolvedVersion {
                    version: tag.clone(),
                    commit: oid,
                });
            }
            base = Some(repo.find_commit(oid)?);
        }
    }

    match base {
        Some(commit) => synthesize(&commit, None),
        None => Err(CustodianError::VersionResolution(format!(
            "Commit {} not found",
            key
        ))),
    }
}

fn search_key(repo: &Repository, specifier: &str) -> Result<SearchKey> {
    if specifier.is_empty() {
        let head = repo.head()?.peel_to_commit()?;
        return Ok(SearchKey::Exact(head.id()));
    }

    if let Some(object) = tag_object(repo, specifier) {
        return match peel_to_commit(object)? {
            Some(oid) => Ok(SearchKey::Exact(oid)),
            None => Err(CustodianError::VersionResolution(format!(
                "Tag {} does not point to a commit",
                specifier
            ))),
        };
    }

    let prefix = versioning::pseudo_version_rev(specifier).unwrap_or(specifier);
    Ok(SearchKey::Prefix(prefix.to_ascii_lowercase()))
}

fn tag_object<'r>(repo: &'r Repository, name: &str) -> Option<Object<'r>> {
    let reference = repo.find_reference(&format!("refs/tags/{}", name)).ok()?;
    let oid = reference.resolve().ok()?.target()?;
    repo.find_object(oid, None).ok()
}

/// Follow annotated tags down to a commit; `None` if the chain ends elsewhere
fn peel_to_commit(mut object: Object<'_>) -> Result<Option<Oid>> {
    for _ in 0..MAX_TAG_DEPTH {
        match object.kind() {
            Some(ObjectType::Commit) => return Ok(Some(object.id())),
            Some(ObjectType::Tag) => {
                let target = match object.as_tag() {
                    Some(tag) => tag.target()?,
                    None => return Ok(None),
                };
                object = target;
            }
            _ => return Ok(None),
        }
    }
    Ok(None)
}

/// Commit -> every tag pointing at it, in version order
fn tag_map(repo: &Repository) -> Result<HashMap<Oid, Vec<String>>> {
    let mut by_commit: HashMap<Oid, Vec<String>> = HashMap::new();

    for name in repo.tag_names(None)?.iter().flatten() {
        let Some(object) = tag_object(repo, name) else {
            continue;
        };
        match peel_to_commit(object)? {
            Some(oid) => by_commit.entry(oid).or_default().push(name.to_string()),
            None => warn!("Skipping tag {} which does not point to a commit", name),
        }
    }

    for names in by_commit.values_mut() {
        versioning::sort(names);
    }
    Ok(by_commit)
}

/// Lowest tag that is a valid version; `names` is already sorted
fn lowest_version(names: &[String]) -> Option<&str> {
    names
        .iter()
        .map(String::as_str)
        .find(|name| versioning::is_valid(name))
}

fn synthesize(base: &Commit<'_>, ancestor: Option<&str>) -> Result<ResolvedVersion> {
    let seconds = base.committer().when().seconds();
    let time = DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| {
        CustodianError::VersionResolution(format!(
            "Commit {} has an invalid timestamp {}",
            base.id(),
            seconds
        ))
    })?;

    let hash = base.id().to_string();
    let rev = &hash[..REV_LENGTH.min(hash.len())];
    Ok(ResolvedVersion {
        version: versioning::pseudo_version(ancestor, time, rev),
        commit: base.id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_key_matches_leading_hex() {
        let oid = Oid::from_str("633fd26b3faaa8e7a2548e4b4b0b1a07618eba86").unwrap();
        assert!(SearchKey::Prefix("633fd26b".into()).matches(oid));
        assert!(!SearchKey::Prefix("33fd26b".into()).matches(oid));
        assert!(SearchKey::Exact(oid).matches(oid));
        assert!(!SearchKey::Exact(Oid::zero()).matches(oid));
    }

    #[test]
    fn test_search_key_display() {
        assert_eq!(SearchKey::Prefix("abc".into()).to_string(), "abc");
        assert_eq!(
            SearchKey::Exact(Oid::zero()).to_string(),
            "0000000000000000000000000000000000000000"
        );
    }
}
