//! Version nodes and the edges between them.

use std::collections::BTreeSet;

use serde_json::json;
use vantage_core::VersionId;
use vantage_storage::{EdgeKind, GraphTxn, NodeKey, NodeRecord, Properties};

use crate::error::GraphError;
use crate::schema::{self, version_id, version_key, CREATED, MATCHED, PROFILES, REQUEST_VERSION, SHADOW};

/// A version node as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionNode {
    pub id: VersionId,
    pub shadow: bool,
    pub created: i64,
}

impl VersionNode {
    fn from_record(record: &NodeRecord) -> Self {
        VersionNode {
            id: version_id(&record.key),
            shadow: schema::get_bool(&record.props, SHADOW),
            created: schema::get_i64(&record.props, CREATED),
        }
    }
}

/// A dependency edge read back from the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// The version on the other end of the edge.
    pub version: VersionId,
    pub profiles: BTreeSet<String>,
    /// Literal requested version, for REQUESTS edges.
    pub requested_version: Option<String>,
}

/// Creates a version of an existing component. Returns true if the node
/// was created, false if it already existed (and is now marked matched).
pub fn create_version(txn: &mut dyn GraphTxn, id: &VersionId, shadow: bool) -> Result<bool, GraphError> {
    let key = version_key(id);
    let outcome = txn.merge_node(
        &key,
        &schema::properties([(CREATED, json!(schema::now_millis())), (SHADOW, json!(shadow))]),
        &schema::properties([(MATCHED, json!(true))]),
    )?;
    if outcome.created {
        txn.merge_edge(
            &key,
            &NodeKey::component(&id.component),
            EdgeKind::VersionOf,
            &Properties::new(),
        )?;
        tracing::debug!(version = %id, shadow, "created version");
    }
    Ok(outcome.created)
}

pub fn get_version_node(txn: &dyn GraphTxn, id: &VersionId) -> Result<Option<VersionNode>, GraphError> {
    Ok(txn
        .get_node(&version_key(id))?
        .as_ref()
        .map(VersionNode::from_record))
}

/// Every version node of a component, shadow versions included.
pub fn component_versions(txn: &dyn GraphTxn, component: &str) -> Result<Vec<VersionNode>, GraphError> {
    let mut nodes = Vec::new();
    for edge in txn.incoming(&NodeKey::component(component), EdgeKind::VersionOf)? {
        if let Some(record) = txn.get_node(&edge.from)? {
            nodes.push(VersionNode::from_record(&record));
        }
    }
    Ok(nodes)
}

/// Version strings of a component's real versions.
pub fn real_versions(txn: &dyn GraphTxn, component: &str) -> Result<Vec<String>, GraphError> {
    Ok(component_versions(txn, component)?
        .into_iter()
        .filter(|v| !v.shadow)
        .map(|v| v.id.version)
        .collect())
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

pub fn create_resolved_dependency(
    txn: &mut dyn GraphTxn,
    from: &VersionId,
    to: &VersionId,
    profiles: &BTreeSet<String>,
) -> Result<(), GraphError> {
    txn.merge_edge(
        &version_key(from),
        &version_key(to),
        EdgeKind::DependsOn,
        &schema::properties([(PROFILES, schema::profiles_value(profiles))]),
    )?;
    Ok(())
}

/// Records a requested dependency on the purified target, keeping the
/// literal version string the client asked for.
pub fn create_requested_dependency(
    txn: &mut dyn GraphTxn,
    from: &VersionId,
    to: &VersionId,
    requested_version: &str,
    profiles: &BTreeSet<String>,
) -> Result<(), GraphError> {
    txn.merge_edge(
        &version_key(from),
        &version_key(to),
        EdgeKind::Requests,
        &schema::properties([
            (PROFILES, schema::profiles_value(profiles)),
            (REQUEST_VERSION, json!(requested_version)),
        ]),
    )?;
    Ok(())
}

pub fn resolved_dependencies(txn: &dyn GraphTxn, id: &VersionId) -> Result<Vec<DependencyEdge>, GraphError> {
    Ok(txn
        .outgoing(&version_key(id), EdgeKind::DependsOn)?
        .into_iter()
        .map(|edge| DependencyEdge {
            version: version_id(&edge.to),
            profiles: schema::get_profiles(&edge.props),
            requested_version: None,
        })
        .collect())
}

pub fn requested_dependencies(txn: &dyn GraphTxn, id: &VersionId) -> Result<Vec<DependencyEdge>, GraphError> {
    Ok(txn
        .outgoing(&version_key(id), EdgeKind::Requests)?
        .into_iter()
        .map(|edge| DependencyEdge {
            version: version_id(&edge.to),
            profiles: schema::get_profiles(&edge.props),
            requested_version: schema::get_str(&edge.props, REQUEST_VERSION),
        })
        .collect())
}

/// Versions with a resolved dependency on `id`.
pub fn dependents(txn: &dyn GraphTxn, id: &VersionId) -> Result<Vec<DependencyEdge>, GraphError> {
    Ok(txn
        .incoming(&version_key(id), EdgeKind::DependsOn)?
        .into_iter()
        .map(|edge| DependencyEdge {
            version: version_id(&edge.from),
            profiles: schema::get_profiles(&edge.props),
            requested_version: None,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Precedence edges
// ---------------------------------------------------------------------------

/// The next newer real version, if any.
pub fn successor(txn: &dyn GraphTxn, id: &VersionId) -> Result<Option<VersionId>, GraphError> {
    let next = txn.outgoing(&version_key(id), EdgeKind::Precedes)?;
    match next.len() {
        0 => Ok(None),
        1 => Ok(Some(version_id(&next[0].to))),
        n => Err(GraphError::invariant(format!("version {id} has {n} successors"))),
    }
}

pub fn has_predecessor(txn: &dyn GraphTxn, id: &VersionId) -> Result<bool, GraphError> {
    Ok(!txn.incoming(&version_key(id), EdgeKind::Precedes)?.is_empty())
}

/// Splices `id` between `prev` and `next`, replacing any direct
/// `prev -> next` link.
pub fn insert_precedence_between(
    txn: &mut dyn GraphTxn,
    id: &VersionId,
    prev: Option<&VersionId>,
    next: Option<&VersionId>,
) -> Result<(), GraphError> {
    let key = version_key(id);
    let none = Properties::new();
    if let (Some(prev), Some(next)) = (prev, next) {
        txn.delete_edge(&version_key(prev), &version_key(next), EdgeKind::Precedes)?;
    }
    if let Some(prev) = prev {
        txn.merge_edge(&version_key(prev), &key, EdgeKind::Precedes, &none)?;
    }
    if let Some(next) = next {
        txn.merge_edge(&key, &version_key(next), EdgeKind::Precedes, &none)?;
    }
    Ok(())
}

/// Links the current chain tail, found among `linked`, to `id`.
pub fn insert_precedence_at_end(
    txn: &mut dyn GraphTxn,
    id: &VersionId,
    linked: &[String],
) -> Result<(), GraphError> {
    let mut tails = Vec::new();
    for version in linked {
        if *version == id.version {
            continue;
        }
        let candidate = id.with_version(version.as_str());
        if successor(txn, &candidate)?.is_none() {
            tails.push(candidate);
        }
    }
    match tails.as_slice() {
        [] => Ok(()),
        [tail] => {
            txn.merge_edge(&version_key(tail), &version_key(id), EdgeKind::Precedes, &Properties::new())?;
            Ok(())
        }
        _ => Err(GraphError::invariant(format!(
            "component {} has {} chain tails",
            id.component,
            tails.len()
        ))),
    }
}
