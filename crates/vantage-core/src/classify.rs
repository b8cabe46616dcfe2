//! Version classification.
//!
//! Every version string a client sends falls into exactly one
//! [`VersionClass`]. Real versions become ordinary version nodes; `latest`
//! and dynamic versions are only ever recorded against shadow placeholder
//! nodes named [`LATEST_VERSION`] and [`UNKNOWN_VERSION`].

use std::sync::OnceLock;

use regex::Regex;

use crate::error::CoreError;
use crate::id::VersionId;

/// Placeholder version for anything that cannot be resolved.
pub const UNKNOWN_VERSION: &str = "unknown";
/// Floating marker for "whatever is newest".
pub const LATEST_VERSION: &str = "latest";
/// Reserved, never a real version.
pub const UNDEFINED_VERSION: &str = "undefined";

/// Words that match the version grammar but are never real versions.
/// Matched case-sensitively; `latest` is additionally matched in any case.
pub const RESERVED_VERSIONS: [&str; 3] = [UNDEFINED_VERSION, UNKNOWN_VERSION, LATEST_VERSION];

/// Classification of a raw version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionClass {
    /// A concrete, released version.
    Real,
    /// `latest` in any letter case.
    Latest,
    /// Ranges, empty strings, reserved words and anything else unresolvable.
    Dynamic,
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-.0-9A-Za-z_]+$").expect("version regex must compile"))
}

/// Classifies a raw version string.
pub fn classify(version: &str) -> VersionClass {
    if is_latest(version) {
        VersionClass::Latest
    } else if version_re().is_match(version) && !RESERVED_VERSIONS.contains(&version) {
        VersionClass::Real
    } else {
        VersionClass::Dynamic
    }
}

pub fn is_real(version: &str) -> bool {
    classify(version) == VersionClass::Real
}

pub fn is_latest(version: &str) -> bool {
    version.eq_ignore_ascii_case(LATEST_VERSION)
}

/// Fails with [`CoreError::InvalidVersion`] unless `id` names a real version.
pub fn require_real(id: &VersionId) -> Result<&VersionId, CoreError> {
    let reason = match classify(&id.version) {
        VersionClass::Real => return Ok(id),
        VersionClass::Latest => format!("[{}] is a reserved version", id.version),
        VersionClass::Dynamic if RESERVED_VERSIONS.contains(&id.version.as_str()) => {
            format!("[{}] is a reserved version", id.version)
        }
        VersionClass::Dynamic => "dynamic versions cannot be created".to_string(),
    };
    Err(CoreError::InvalidVersion {
        component: id.component.clone(),
        version: id.version.clone(),
        reason,
    })
}

/// Maps a requested version to the node it is recorded against.
///
/// Real versions are returned unchanged, any spelling of `latest` becomes
/// [`LATEST_VERSION`] and everything else becomes [`UNKNOWN_VERSION`].
pub fn purify(id: &VersionId) -> VersionId {
    match classify(&id.version) {
        VersionClass::Real => id.clone(),
        VersionClass::Latest => id.with_version(LATEST_VERSION),
        VersionClass::Dynamic => id.with_version(UNKNOWN_VERSION),
    }
}
