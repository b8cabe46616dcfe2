//! The [`GraphStore`] / [`GraphTxn`] contract.
//!
//! All domain logic runs inside a [`GraphTxn`]. Nodes are merged by key
//! (create-if-absent), edges are upserted per `(from, to, kind)`, and
//! traversal is expressed through single-hop adjacency reads that callers
//! compose into closures.
//!
//! Writes take an exclusive lock on every node they touch (both endpoints
//! for edge writes) which is held until the transaction ends. Callers that
//! need to lock several nodes must therefore do so in a globally consistent
//! order.

use crate::error::StorageError;
use crate::types::{EdgeKind, EdgeRecord, Label, MergeOutcome, NodeKey, NodeRecord, Properties, TxnMode};

/// A single storage transaction.
///
/// Dropping a transaction without calling [`commit`](GraphTxn::commit)
/// rolls it back.
pub trait GraphTxn: Send {
    // -------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------

    /// Creates the node if absent, otherwise returns the existing one.
    ///
    /// `on_create` becomes the property set of a new node; `on_match` is
    /// merged into the properties of an existing node.
    fn merge_node(
        &mut self,
        key: &NodeKey,
        on_create: &Properties,
        on_match: &Properties,
    ) -> Result<MergeOutcome, StorageError>;

    fn get_node(&self, key: &NodeKey) -> Result<Option<NodeRecord>, StorageError>;

    /// All nodes with `label`, sorted by key.
    fn nodes(&self, label: Label) -> Result<Vec<NodeRecord>, StorageError>;

    /// Deletes the node and every edge touching it. Returns false if absent.
    fn delete_node(&mut self, key: &NodeKey) -> Result<bool, StorageError>;

    // -------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------

    /// Creates or overwrites the edge `(from, to, kind)`. Returns true if it
    /// did not exist before. Both endpoints must exist.
    fn merge_edge(
        &mut self,
        from: &NodeKey,
        to: &NodeKey,
        kind: EdgeKind,
        props: &Properties,
    ) -> Result<bool, StorageError>;

    /// Deletes the edge if present. Returns true if something was deleted.
    fn delete_edge(
        &mut self,
        from: &NodeKey,
        to: &NodeKey,
        kind: EdgeKind,
    ) -> Result<bool, StorageError>;

    /// Edges of `kind` leaving `key`, sorted by target key.
    fn outgoing(&self, key: &NodeKey, kind: EdgeKind) -> Result<Vec<EdgeRecord>, StorageError>;

    /// Edges of `kind` entering `key`, sorted by source key.
    fn incoming(&self, key: &NodeKey, kind: EdgeKind) -> Result<Vec<EdgeRecord>, StorageError>;

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    fn commit(self: Box<Self>) -> Result<(), StorageError>;

    fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}

/// A transactional graph store.
pub trait GraphStore: Send + Sync {
    fn begin(&self, mode: TxnMode) -> Result<Box<dyn GraphTxn>, StorageError>;
}

/// Runs `body` inside a transaction.
///
/// On success the transaction commits, unless it is read-only or
/// `rollback_only` is set, in which case it is rolled back. On failure it
/// is always rolled back and the body's error is returned.
pub fn transaction<T, E, F>(
    store: &dyn GraphStore,
    mode: TxnMode,
    rollback_only: bool,
    body: F,
) -> Result<T, E>
where
    F: FnOnce(&mut dyn GraphTxn) -> Result<T, E>,
    E: From<StorageError>,
{
    let mut txn = store.begin(mode)?;
    match body(txn.as_mut()) {
        Ok(value) => {
            if rollback_only || mode == TxnMode::ReadOnly {
                txn.rollback()?;
            } else {
                txn.commit()?;
            }
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback() {
                tracing::warn!(error = %rollback_err, "rollback after failed transaction body failed");
            }
            Err(err)
        }
    }
}
