//! The global version ordering.
//!
//! Graph writers create version nodes in this order, and the precedence
//! fixer uses it to find a new version's neighbours. Two writers that need
//! the same set of nodes therefore always lock them in the same sequence.

use std::cmp::Ordering;

use crate::id::VersionId;
use crate::maven::MavenVersion;

/// Compares two version strings of the same component.
///
/// Uses Maven ordering, falling back to plain string order for versions the
/// Maven rules consider equal (`1.0` vs `1.0.0`) so the order stays total.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    MavenVersion::parse(a)
        .cmp(&MavenVersion::parse(b))
        .then_with(|| a.cmp(b))
}

/// Orders version ids by component name, then by [`compare_versions`].
pub fn compare_version_ids(a: &VersionId, b: &VersionId) -> Ordering {
    a.component
        .cmp(&b.component)
        .then_with(|| compare_versions(&a.version, &b.version))
}
