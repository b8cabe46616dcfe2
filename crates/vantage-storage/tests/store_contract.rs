//! Behavior shared by every GraphStore backend.
//!
//! Each check runs against both the in-memory store and a SQLite store in a
//! temp directory.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use vantage_storage::{
    transaction, EdgeKind, GraphStore, InMemoryStore, Label, NodeKey, Properties, SqliteStore,
    StorageError, TxnMode,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn props(pairs: &[(&str, serde_json::Value)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn sqlite_store() -> (TempDir, Arc<dyn GraphStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    let store = SqliteStore::with_busy_timeout(path.to_str().unwrap(), Duration::from_secs(10)).unwrap();
    (dir, Arc::new(store))
}

fn for_each_backend(check: impl Fn(Arc<dyn GraphStore>)) {
    check(Arc::new(InMemoryStore::new()));
    let (_dir, store) = sqlite_store();
    check(store);
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

#[test]
fn test_merge_node_reports_creation() {
    for_each_backend(|store| {
        let key = NodeKey::version("app", "1.0");
        let created = transaction(store.as_ref(), TxnMode::ReadWrite, false, |txn| {
            txn.merge_node(&key, &props(&[("shadow", json!(false))]), &Properties::new())
        })
        .unwrap();
        assert!(created.created);

        let matched = transaction(store.as_ref(), TxnMode::ReadWrite, false, |txn| {
            txn.merge_node(&key, &Properties::new(), &props(&[("matched", json!(true))]))
        })
        .unwrap();
        assert!(!matched.created);
        assert_eq!(matched.node.props["shadow"], json!(false));
        assert_eq!(matched.node.props["matched"], json!(true));
    });
}

#[test]
fn test_rollback_only_transaction_leaves_no_trace() {
    for_each_backend(|store| {
        let value = transaction(store.as_ref(), TxnMode::ReadWrite, true, |txn| {
            txn.merge_node(&NodeKey::component("ghost"), &Properties::new(), &Properties::new())?;
            Ok::<_, StorageError>(42)
        })
        .unwrap();
        assert_eq!(value, 42);

        let components = transaction(store.as_ref(), TxnMode::ReadOnly, false, |txn| {
            txn.nodes(Label::Component)
        })
        .unwrap();
        assert!(components.is_empty());
    });
}

#[test]
fn test_failed_body_rolls_back() {
    for_each_backend(|store| {
        let result: Result<(), StorageError> =
            transaction(store.as_ref(), TxnMode::ReadWrite, false, |txn| {
                txn.merge_node(&NodeKey::component("a"), &Properties::new(), &Properties::new())?;
                Err(StorageError::Integrity {
                    reason: "boom".into(),
                })
            });
        assert!(result.is_err());

        let node = transaction(store.as_ref(), TxnMode::ReadOnly, false, |txn| {
            txn.get_node(&NodeKey::component("a"))
        })
        .unwrap();
        assert!(node.is_none());
    });
}

#[test]
fn test_edges_are_unique_per_kind_and_endpoints() {
    for_each_backend(|store| {
        let a = NodeKey::version("app", "1.0");
        let b = NodeKey::version("lib", "1.0");
        transaction(store.as_ref(), TxnMode::ReadWrite, false, |txn| {
            let none = Properties::new();
            txn.merge_node(&a, &none, &none)?;
            txn.merge_node(&b, &none, &none)?;
            assert!(txn.merge_edge(&a, &b, EdgeKind::DependsOn, &props(&[("profiles", json!(["a"]))]))?);
            assert!(!txn.merge_edge(&a, &b, EdgeKind::DependsOn, &props(&[("profiles", json!(["b"]))]))?);
            assert!(txn.merge_edge(&a, &b, EdgeKind::Requests, &none)?);
            Ok::<_, StorageError>(())
        })
        .unwrap();

        transaction(store.as_ref(), TxnMode::ReadOnly, false, |txn| {
            let deps = txn.outgoing(&a, EdgeKind::DependsOn)?;
            assert_eq!(deps.len(), 1);
            assert_eq!(deps[0].to, b);
            assert_eq!(deps[0].props["profiles"], json!(["b"]));
            assert_eq!(txn.incoming(&b, EdgeKind::Requests)?.len(), 1);
            Ok::<_, StorageError>(())
        })
        .unwrap();
    });
}

#[test]
fn test_delete_node_removes_incident_edges() {
    for_each_backend(|store| {
        let head = NodeKey::queue_request("1");
        let tail = NodeKey::queue_request("2");
        transaction(store.as_ref(), TxnMode::ReadWrite, false, |txn| {
            let none = Properties::new();
            txn.merge_node(&head, &none, &none)?;
            txn.merge_node(&tail, &none, &none)?;
            txn.merge_edge(&head, &tail, EdgeKind::Before, &none)?;
            Ok::<_, StorageError>(())
        })
        .unwrap();

        transaction(store.as_ref(), TxnMode::ReadWrite, false, |txn| {
            assert!(txn.delete_node(&head)?);
            Ok::<_, StorageError>(())
        })
        .unwrap();

        transaction(store.as_ref(), TxnMode::ReadOnly, false, |txn| {
            assert!(txn.incoming(&tail, EdgeKind::Before)?.is_empty());
            assert_eq!(txn.nodes(Label::QueueCreateRequest)?.len(), 1);
            Ok::<_, StorageError>(())
        })
        .unwrap();
    });
}

#[test]
fn test_read_only_transaction_rejects_writes() {
    for_each_backend(|store| {
        let result = transaction(store.as_ref(), TxnMode::ReadOnly, false, |txn| {
            txn.merge_node(&NodeKey::component("a"), &Properties::new(), &Properties::new())
        });
        assert!(matches!(result, Err(StorageError::ReadOnly)));
    });
}

#[test]
fn test_concurrent_writers_on_same_node_serialize() {
    for_each_backend(|store| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    transaction(store.as_ref(), TxnMode::ReadWrite, false, |txn| {
                        txn.merge_node(
                            &NodeKey::component("shared"),
                            &props(&[("writer", json!(i))]),
                            &Properties::new(),
                        )
                    })
                    .unwrap()
                    .created
                })
            })
            .collect();
        let created: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|c| *c)
            .count();
        assert_eq!(created, 1, "exactly one writer creates the node");
    });
}

#[test]
fn test_sqlite_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("durable.db");
    let path = path.to_str().unwrap();
    {
        let store = SqliteStore::new(path).unwrap();
        transaction(&store, TxnMode::ReadWrite, false, |txn| {
            txn.merge_node(&NodeKey::component("kept"), &props(&[("description", json!("d"))]), &Properties::new())
        })
        .unwrap();
    }
    let reopened = SqliteStore::new(path).unwrap();
    let node = transaction(&reopened, TxnMode::ReadOnly, false, |txn| {
        txn.get_node(&NodeKey::component("kept"))
    })
    .unwrap()
    .unwrap();
    assert_eq!(node.props["description"], json!("d"));
}
