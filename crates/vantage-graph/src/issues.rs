//! Issue nodes and their AFFECTS / FIXED_BY edges.

use serde_json::json;
use vantage_core::{compare_version_ids, require_real, Issue, IssueLevel, IssueRequest, VersionId};
use vantage_storage::{EdgeKind, GraphTxn, Label, NodeKey, NodeRecord, Properties};

use crate::error::GraphError;
use crate::schema::{self, version_id, version_key, CREATED, LEVEL, MESSAGE};
use crate::writer;

/// Creates or updates an issue.
///
/// A `None` level or message keeps the stored value. The AFFECTS edge is
/// moved to the requested version; the FIXED_BY edge is moved, or removed
/// when no fix version is given. Both versions must be real and belong to
/// the same component; missing ones are created and put on the chain.
///
/// The issue node is locked before any version so concurrent updates of
/// one issue serialize before touching the graph.
pub fn create_or_update_issue(
    txn: &mut dyn GraphTxn,
    id: &str,
    request: &IssueRequest,
) -> Result<Issue, GraphError> {
    let mut targets = vec![require_real(&request.affects_version)?.clone()];
    if let Some(fix) = &request.fix_version {
        if fix.component != request.affects_version.component {
            return Err(GraphError::InvalidRequest(format!(
                "issue {id}: fix version {fix} is not in component {}",
                request.affects_version.component
            )));
        }
        targets.push(require_real(fix)?.clone());
    }
    targets.sort_by(compare_version_ids);
    targets.dedup();

    let key = NodeKey::issue(id);
    let mut on_create = schema::properties([(CREATED, json!(schema::now_millis()))]);
    let mut on_match = Properties::new();
    if let Some(level) = request.level {
        on_create.insert(LEVEL.to_string(), json!(level.as_str()));
        on_match.insert(LEVEL.to_string(), json!(level.as_str()));
    }
    if let Some(message) = &request.message {
        on_create.insert(MESSAGE.to_string(), json!(message));
        on_match.insert(MESSAGE.to_string(), json!(message));
    }
    let outcome = txn.merge_node(&key, &on_create, &on_match)?;
    for target in &targets {
        writer::ensure_version(txn, target)?;
    }

    let affects = version_key(&request.affects_version);
    for edge in txn.outgoing(&key, EdgeKind::Affects)? {
        if edge.to != affects {
            txn.delete_edge(&key, &edge.to, EdgeKind::Affects)?;
        }
    }
    txn.merge_edge(&key, &affects, EdgeKind::Affects, &Properties::new())?;

    let fix = request.fix_version.as_ref().map(version_key);
    for edge in txn.outgoing(&key, EdgeKind::FixedBy)? {
        if Some(&edge.to) != fix.as_ref() {
            txn.delete_edge(&key, &edge.to, EdgeKind::FixedBy)?;
        }
    }
    if let Some(fix) = &fix {
        txn.merge_edge(&key, fix, EdgeKind::FixedBy, &Properties::new())?;
    }

    tracing::info!(
        issue = id,
        created = outcome.created,
        affects = %request.affects_version,
        "saved issue"
    );
    get_issue(txn, id)?.ok_or_else(|| GraphError::invariant(format!("issue {id} missing after write")))
}

pub fn get_issue(txn: &dyn GraphTxn, id: &str) -> Result<Option<Issue>, GraphError> {
    match txn.get_node(&NodeKey::issue(id))? {
        Some(node) => Ok(Some(to_issue(txn, &node)?)),
        None => Ok(None),
    }
}

/// All issues, by id.
pub fn list_issues(txn: &dyn GraphTxn) -> Result<Vec<Issue>, GraphError> {
    txn.nodes(Label::Issue)?
        .iter()
        .map(|node| to_issue(txn, node))
        .collect()
}

/// Ids of issues whose AFFECTS edge points at `version`.
pub fn issues_affecting(txn: &dyn GraphTxn, version: &VersionId) -> Result<Vec<String>, GraphError> {
    Ok(txn
        .incoming(&version_key(version), EdgeKind::Affects)?
        .into_iter()
        .map(|edge| edge.from.part(0).to_string())
        .collect())
}

fn single_target(
    txn: &dyn GraphTxn,
    node: &NodeRecord,
    kind: EdgeKind,
) -> Result<Option<VersionId>, GraphError> {
    let edges = txn.outgoing(&node.key, kind)?;
    match edges.as_slice() {
        [] => Ok(None),
        [edge] => Ok(Some(version_id(&edge.to))),
        _ => Err(GraphError::invariant(format!(
            "issue {} has {} {kind} edges",
            node.key.part(0),
            edges.len()
        ))),
    }
}

fn to_issue(txn: &dyn GraphTxn, node: &NodeRecord) -> Result<Issue, GraphError> {
    let id = node.key.part(0).to_string();
    let affects_version = single_target(txn, node, EdgeKind::Affects)?
        .ok_or_else(|| GraphError::invariant(format!("issue {id} affects no version")))?;
    Ok(Issue {
        level: schema::get_str(&node.props, LEVEL).and_then(|l| IssueLevel::parse(&l)),
        message: schema::get_str(&node.props, MESSAGE),
        fix_version: single_target(txn, node, EdgeKind::FixedBy)?,
        affects_version,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ensure_component;
    use crate::versions::create_version;
    use vantage_storage::{GraphStore, InMemoryStore, TxnMode};

    fn seed(txn: &mut dyn GraphTxn, versions: &[&str]) {
        ensure_component(txn, "c").unwrap();
        for v in versions {
            create_version(txn, &VersionId::new("c", *v), false).unwrap();
        }
    }

    fn request(affects: &str, fix: Option<&str>) -> IssueRequest {
        IssueRequest {
            level: Some(IssueLevel::Major),
            message: Some("broken".into()),
            affects_version: VersionId::new("c", affects),
            fix_version: fix.map(|f| VersionId::new("c", f)),
        }
    }

    #[test]
    fn test_create_and_update_keeps_missing_fields() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        seed(txn.as_mut(), &["1", "2"]);

        let issue = create_or_update_issue(txn.as_mut(), "i1", &request("1", Some("2"))).unwrap();
        assert_eq!(issue.level, Some(IssueLevel::Major));
        assert_eq!(issue.fix_version, Some(VersionId::new("c", "2")));

        let update = IssueRequest {
            level: None,
            message: None,
            affects_version: VersionId::new("c", "1"),
            fix_version: Some(VersionId::new("c", "2")),
        };
        let issue = create_or_update_issue(txn.as_mut(), "i1", &update).unwrap();
        assert_eq!(issue.level, Some(IssueLevel::Major));
        assert_eq!(issue.message.as_deref(), Some("broken"));
    }

    #[test]
    fn test_update_moves_affects_and_clears_fix() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        seed(txn.as_mut(), &["1", "2", "3"]);

        create_or_update_issue(txn.as_mut(), "i1", &request("1", Some("3"))).unwrap();
        let issue = create_or_update_issue(txn.as_mut(), "i1", &request("2", None)).unwrap();

        assert_eq!(issue.affects_version, VersionId::new("c", "2"));
        assert_eq!(issue.fix_version, None);
        assert!(issues_affecting(txn.as_ref(), &VersionId::new("c", "1")).unwrap().is_empty());
        assert_eq!(
            issues_affecting(txn.as_ref(), &VersionId::new("c", "2")).unwrap(),
            vec!["i1".to_string()]
        );
    }

    #[test]
    fn test_missing_versions_are_created_on_chain() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        create_or_update_issue(txn.as_mut(), "i1", &request("2.0", Some("1.0"))).unwrap();

        assert_eq!(
            crate::precedence::chain(txn.as_ref(), "c").unwrap(),
            vec!["1.0".to_string(), "2.0".to_string()]
        );
    }

    #[test]
    fn test_rejects_fix_in_other_component() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let mut bad = request("1", None);
        bad.fix_version = Some(VersionId::new("other", "2"));
        assert!(matches!(
            create_or_update_issue(txn.as_mut(), "i1", &bad),
            Err(GraphError::InvalidRequest(_))
        ));

        let dynamic = request("latest", None);
        assert!(matches!(
            create_or_update_issue(txn.as_mut(), "i1", &dynamic),
            Err(GraphError::Core(_))
        ));
    }

    #[test]
    fn test_list_issues_sorted_by_id() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        seed(txn.as_mut(), &["1"]);
        create_or_update_issue(txn.as_mut(), "b", &request("1", None)).unwrap();
        create_or_update_issue(txn.as_mut(), "a", &request("1", None)).unwrap();

        let ids: Vec<String> = list_issues(txn.as_ref()).unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(get_issue(txn.as_ref(), "missing").unwrap().is_none());
    }
}
