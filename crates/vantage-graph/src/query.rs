//! Read side: versions with their dependencies, dependents and issues.

use vantage_core::{
    compare_versions, is_maven_scheme, DependencyView, ResolvedVersion, VersionId, VersionSummary,
};
use vantage_storage::{GraphTxn, NodeKey};

use crate::error::GraphError;
use crate::precedence;
use crate::propagation::IssueResolver;
use crate::versions::{self, DependencyEdge};

/// Reads one version as a client sees it. `None` if it does not exist.
pub fn get_version(txn: &dyn GraphTxn, id: &VersionId) -> Result<Option<ResolvedVersion>, GraphError> {
    if versions::get_version_node(txn, id)?.is_none() {
        return Ok(None);
    }
    let mut resolver = IssueResolver::new(txn);
    let mut version = resolve(txn, &mut resolver, id)?;

    for edge in versions::dependents(txn, id)? {
        if resolver.is_active(&edge.version)? {
            version.dependents.push(view(&mut resolver, edge)?);
        }
    }
    Ok(Some(version))
}

/// Every real version of a component, newest first. `None` if the
/// component does not exist.
///
/// Maven-style components are sorted by version; opaque ones follow their
/// precedence chain backwards.
pub fn get_versions(txn: &dyn GraphTxn, component: &str) -> Result<Option<Vec<ResolvedVersion>>, GraphError> {
    if txn.get_node(&NodeKey::component(component))?.is_none() {
        return Ok(None);
    }
    let mut ordered = versions::real_versions(txn, component)?;
    if is_maven_scheme(&ordered) {
        ordered.sort_by(|a, b| compare_versions(b, a));
    } else {
        ordered = precedence::chain(txn, component)?;
        ordered.reverse();
    }

    let mut resolver = IssueResolver::new(txn);
    let mut result = Vec::with_capacity(ordered.len());
    for version in ordered {
        result.push(resolve(txn, &mut resolver, &VersionId::new(component, version))?);
    }
    Ok(Some(result))
}

fn resolve(
    txn: &dyn GraphTxn,
    resolver: &mut IssueResolver<'_>,
    id: &VersionId,
) -> Result<ResolvedVersion, GraphError> {
    let mut resolved_dependencies = Vec::new();
    for edge in versions::resolved_dependencies(txn, id)? {
        resolved_dependencies.push(view(resolver, edge)?);
    }
    let mut requested_dependencies = Vec::new();
    for edge in versions::requested_dependencies(txn, id)? {
        requested_dependencies.push(view(resolver, edge)?);
    }

    Ok(ResolvedVersion {
        component: id.component.clone(),
        version: id.version.clone(),
        active: resolver.is_active(id)?,
        resolved_dependencies,
        requested_dependencies,
        dependents: Vec::new(),
        direct_issues: resolver.direct(id)?,
        transitive_issues: resolver.transitive(id)?,
    })
}

fn view(resolver: &mut IssueResolver<'_>, edge: DependencyEdge) -> Result<DependencyView, GraphError> {
    let direct_issues = resolver.direct(&edge.version)?;
    Ok(DependencyView {
        version: VersionSummary {
            component: edge.version.component,
            version: edge.version.version,
            direct_issues,
        },
        profiles: edge.profiles,
        requested_version: edge.requested_version,
    })
}
