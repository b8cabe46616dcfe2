//! Per-component precedence chains.
//!
//! Every real version of a component sits on a single PRECEDES chain,
//! oldest first. How a new version is inserted depends on the component's
//! versioning scheme, decided over all its real versions (the new one
//! included):
//!
//! - **Maven**: the version is spliced between its nearest lower and higher
//!   neighbours under [`compare_versions`], so the chain stays sorted no
//!   matter the insertion order.
//! - **Opaque**: the version is appended after the current tail; existing
//!   links are never touched.

use std::cmp::Ordering;
use std::collections::HashSet;

use vantage_core::{compare_versions, is_maven_scheme, VersionId};
use vantage_storage::GraphTxn;

use crate::error::GraphError;
use crate::versions;

/// Inserts a newly created real version into its component's chain.
pub fn fix_precedence(txn: &mut dyn GraphTxn, id: &VersionId) -> Result<(), GraphError> {
    fix_precedences(txn, std::slice::from_ref(id))
}

/// Inserts several newly created real versions, in order.
///
/// All of them already exist as nodes, so each one is linked only against
/// versions that are already on the chain; versions still waiting their
/// turn are skipped as neighbours and tails but still count towards the
/// scheme.
pub fn fix_precedences(txn: &mut dyn GraphTxn, ids: &[VersionId]) -> Result<(), GraphError> {
    let mut pending: HashSet<&VersionId> = ids.iter().collect();
    for id in ids {
        pending.remove(id);
        let unlinked: HashSet<&str> = pending
            .iter()
            .filter(|p| p.component == id.component)
            .map(|p| p.version.as_str())
            .collect();
        link(txn, id, &unlinked)?;
    }
    Ok(())
}

fn link(txn: &mut dyn GraphTxn, id: &VersionId, unlinked: &HashSet<&str>) -> Result<(), GraphError> {
    let all = versions::real_versions(txn, &id.component)?;
    let maven = is_maven_scheme(&all);
    let linked: Vec<String> = all
        .into_iter()
        .filter(|v| *v != id.version && !unlinked.contains(v.as_str()))
        .collect();

    if maven {
        let prev = linked
            .iter()
            .filter(|v| compare_versions(v, &id.version) == Ordering::Less)
            .max_by(|a, b| compare_versions(a, b))
            .map(|v| id.with_version(v.as_str()));
        let next = linked
            .iter()
            .filter(|v| compare_versions(v, &id.version) == Ordering::Greater)
            .min_by(|a, b| compare_versions(a, b))
            .map(|v| id.with_version(v.as_str()));
        tracing::debug!(
            version = %id,
            prev = prev.as_ref().map(|p| p.version.as_str()),
            next = next.as_ref().map(|n| n.version.as_str()),
            "splicing into maven chain"
        );
        versions::insert_precedence_between(txn, id, prev.as_ref(), next.as_ref())
    } else {
        tracing::debug!(version = %id, "appending to opaque chain");
        versions::insert_precedence_at_end(txn, id, &linked)
    }
}

/// A component's chain, oldest first, following PRECEDES from the head.
///
/// If the chain is broken into several segments they are concatenated in
/// head order.
pub fn chain(txn: &dyn GraphTxn, component: &str) -> Result<Vec<String>, GraphError> {
    Ok(segments(txn, component)?.concat())
}

/// The chain split at every head, each segment oldest first. A healthy
/// component has at most one segment.
pub fn segments(txn: &dyn GraphTxn, component: &str) -> Result<Vec<Vec<String>>, GraphError> {
    let mut heads = Vec::new();
    for version in versions::real_versions(txn, component)? {
        let id = VersionId::new(component, version);
        if !versions::has_predecessor(txn, &id)? {
            heads.push(id);
        }
    }
    heads.sort_by(|a, b| compare_versions(&a.version, &b.version));

    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(heads.len());
    for head in heads {
        let mut segment = Vec::new();
        let mut current = Some(head);
        while let Some(id) = current {
            if !seen.insert(id.version.clone()) {
                return Err(GraphError::invariant(format!(
                    "precedence cycle in component {component} at {}",
                    id.version
                )));
            }
            current = versions::successor(txn, &id)?;
            segment.push(id.version);
        }
        result.push(segment);
    }
    Ok(result)
}
