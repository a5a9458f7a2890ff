//! Version tags and pseudo-versions
//!
//! Tags follow the `vMAJOR[.MINOR[.PATCH[-PRERELEASE][+BUILD]]]` grammar used
//! by Go modules. Shorthand forms (`v1`, `v1.2`) are valid only without
//! pre-release or build suffix. Untagged commits get a pseudo-version such as
//! `v2.0.2-0.20250606171425-0495f244e471`, which tooling outside this crate
//! also parses, so the format is fixed.

use std::cmp::Ordering;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use semver::{Prerelease, Version};

/// Lineage used when no tagged ancestor exists
pub const DEFAULT_MAJOR: &str = "v0";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Number of hash characters embedded in a pseudo-version
pub const REV_LENGTH: usize = 12;

/// A parsed version tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVersion {
    version: Version,
    /// Build suffix including its leading `+`, empty if none
    build: String,
}

impl TagVersion {
    pub fn parse(tag: &str) -> Option<Self> {
        let rest = tag.strip_prefix('v')?;
        let core_end = rest.find(|c: char| c == '-' || c == '+').unwrap_or(rest.len());
        let (core, suffix) = rest.split_at(core_end);

        let text = match core.split('.').count() {
            3 => rest.to_string(),
            n @ (1 | 2) if suffix.is_empty() => format!("{}{}", core, ".0".repeat(3 - n)),
            _ => return None,
        };

        let version = Version::parse(&text).ok()?;
        let build = rest
            .find('+')
            .map(|i| rest[i..].to_string())
            .unwrap_or_default();
        Some(Self { version, build })
    }

    /// `vMAJOR.MINOR.PATCH[-PRERELEASE]`, build suffix removed
    pub fn canonical(&self) -> String {
        let v = &self.version;
        if v.pre.is_empty() {
            format!("v{}.{}.{}", v.major, v.minor, v.patch)
        } else {
            format!("v{}.{}.{}-{}", v.major, v.minor, v.patch, v.pre)
        }
    }

    pub fn prerelease(&self) -> &Prerelease {
        &self.version.pre
    }

    pub fn build(&self) -> &str {
        &self.build
    }

    fn precedence(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.version, &other.version);
        (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
    }
}

pub fn is_valid(tag: &str) -> bool {
    TagVersion::parse(tag).is_some()
}

/// Order two tags by version precedence; invalid tags sort before valid ones
pub fn compare(a: &str, b: &str) -> Ordering {
    match (TagVersion::parse(a), TagVersion::parse(b)) {
        (Some(a), Some(b)) => a.precedence(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Sort ascending by precedence, ties broken by the raw string
pub fn sort(tags: &mut [String]) {
    tags.sort_by(|a, b| compare(a, b).then_with(|| a.cmp(b)));
}

fn pseudo_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^v[0-9]+\.(0\.0-|\d+\.\d+-([^+]*\.)?0\.)\d{14}-[A-Za-z0-9]+(\+[0-9A-Za-z-]+(\.[0-9A-Za-z-]+)*)?$",
        )
        .expect("pseudo-version pattern is valid")
    })
}

/// Whether `version` has the shape of a synthesized pseudo-version
pub fn is_pseudo_version(version: &str) -> bool {
    version.contains('-') && is_valid(version) && pseudo_version_pattern().is_match(version)
}

/// Commit-hash segment embedded in a pseudo-version
pub fn pseudo_version_rev(version: &str) -> Option<&str> {
    if !is_pseudo_version(version) {
        return None;
    }
    let without_build = version.split('+').next().unwrap_or(version);
    without_build.rsplit_once('-').map(|(_, rev)| rev)
}

/// Synthesize a pseudo-version
///
/// `ancestor` is the closest tagged version below the commit, if any; `time`
/// and `rev` describe the commit itself.
pub fn pseudo_version(ancestor: Option<&str>, time: DateTime<Utc>, rev: &str) -> String {
    let segment = format!("{}-{}", time.format(TIMESTAMP_FORMAT), rev);

    let Some(older) = ancestor.and_then(TagVersion::parse) else {
        return format!("{}.0.0-{}", DEFAULT_MAJOR, segment);
    };

    if !older.prerelease().is_empty() {
        return format!("{}.0.{}{}", older.canonical(), segment, older.build());
    }

    let v = &older.version;
    format!(
        "v{}.{}.{}-0.{}{}",
        v.major,
        v.minor,
        v.patch + 1,
        segment,
        older.build()
    )
}
