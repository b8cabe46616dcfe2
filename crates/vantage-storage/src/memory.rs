//! In-memory implementation of [`GraphStore`].
//!
//! [`InMemoryStore`] keeps the committed graph as an immutable petgraph
//! snapshot behind an `Arc`. Read-only transactions pin the snapshot that was
//! current when they began. Read-write transactions copy the snapshot on
//! first write, record every write in a log, and on commit either publish
//! their copy (if nothing else committed meanwhile) or replay the log onto the
//! latest snapshot.
//!
//! Every write first takes the [`LockTable`] lock of each node it touches.
//! Whenever a lock is granted and another transaction has committed since the
//! working copy was taken, the copy is rebuilt from the latest snapshot plus
//! the log, so a writer always sees committed state for the nodes it holds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::StorageError;
use crate::locks::{LockTable, TxnId, DEFAULT_LOCK_TIMEOUT};
use crate::traits::{GraphStore, GraphTxn};
use crate::types::{EdgeKind, EdgeRecord, Label, MergeOutcome, NodeKey, NodeRecord, Properties, TxnMode};

/// A complete graph: nodes and edges plus a key index.
#[derive(Debug, Clone, Default)]
struct GraphState {
    graph: StableGraph<NodeRecord, EdgeRecord>,
    index: HashMap<NodeKey, NodeIndex>,
}

/// One logged write, replayable against any snapshot.
#[derive(Debug, Clone)]
enum WriteOp {
    PutNode(NodeRecord),
    DeleteNode(NodeKey),
    PutEdge(EdgeRecord),
    DeleteEdge {
        from: NodeKey,
        to: NodeKey,
        kind: EdgeKind,
    },
}

impl GraphState {
    fn node(&self, key: &NodeKey) -> Option<&NodeRecord> {
        self.index
            .get(key)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    fn node_index(&self, key: &NodeKey) -> Result<NodeIndex, StorageError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| StorageError::NodeNotFound {
                key: key.to_string(),
            })
    }

    fn find_edge(&self, from: &NodeKey, to: &NodeKey, kind: EdgeKind) -> Option<EdgeIndex> {
        let (&a, &b) = (self.index.get(from)?, self.index.get(to)?);
        self.graph
            .edges_directed(a, Direction::Outgoing)
            .find(|e| e.target() == b && e.weight().kind == kind)
            .map(|e| e.id())
    }

    fn edges(&self, key: &NodeKey, kind: EdgeKind, dir: Direction) -> Vec<EdgeRecord> {
        let Some(&idx) = self.index.get(key) else {
            return Vec::new();
        };
        let mut edges: Vec<EdgeRecord> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| e.weight())
            .filter(|e| e.kind == kind)
            .cloned()
            .collect();
        match dir {
            Direction::Outgoing => edges.sort_by(|a, b| a.to.cmp(&b.to)),
            Direction::Incoming => edges.sort_by(|a, b| a.from.cmp(&b.from)),
        }
        edges
    }

    fn apply(&mut self, op: &WriteOp) -> Result<(), StorageError> {
        match op {
            WriteOp::PutNode(record) => match self.index.get(&record.key) {
                Some(&idx) => {
                    if let Some(weight) = self.graph.node_weight_mut(idx) {
                        *weight = record.clone();
                    }
                }
                None => {
                    let idx = self.graph.add_node(record.clone());
                    self.index.insert(record.key.clone(), idx);
                }
            },
            WriteOp::DeleteNode(key) => {
                if let Some(idx) = self.index.remove(key) {
                    self.graph.remove_node(idx);
                }
            }
            WriteOp::PutEdge(record) => {
                let from = self.node_index(&record.from)?;
                let to = self.node_index(&record.to)?;
                match self.find_edge(&record.from, &record.to, record.kind) {
                    Some(edge) => {
                        if let Some(weight) = self.graph.edge_weight_mut(edge) {
                            *weight = record.clone();
                        }
                    }
                    None => {
                        self.graph.add_edge(from, to, record.clone());
                    }
                }
            }
            WriteOp::DeleteEdge { from, to, kind } => {
                if let Some(edge) = self.find_edge(from, to, *kind) {
                    self.graph.remove_edge(edge);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Committed {
    state: Arc<GraphState>,
    generation: u64,
}

#[derive(Debug)]
struct Shared {
    committed: RwLock<Committed>,
    locks: LockTable,
    next_txn: AtomicU64,
}

/// In-memory transactional graph store.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    /// Creates an empty store with the default lock wait timeout.
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates an empty store whose writers give up waiting for a node lock
    /// after `timeout`.
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        InMemoryStore {
            shared: Arc::new(Shared {
                committed: RwLock::new(Committed {
                    state: Arc::new(GraphState::default()),
                    generation: 0,
                }),
                locks: LockTable::new(timeout),
                next_txn: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for InMemoryStore {
    fn begin(&self, mode: TxnMode) -> Result<Box<dyn GraphTxn>, StorageError> {
        let committed = self
            .shared
            .committed
            .read()
            .map_err(|_| StorageError::Poisoned)?;
        let txn = InMemoryTxn {
            id: self.shared.next_txn.fetch_add(1, Ordering::Relaxed),
            mode,
            shared: Arc::clone(&self.shared),
            view: Arc::clone(&committed.state),
            generation: committed.generation,
            log: Vec::new(),
            held: Vec::new(),
        };
        Ok(Box::new(txn))
    }
}

/// A transaction against an [`InMemoryStore`].
pub struct InMemoryTxn {
    id: TxnId,
    mode: TxnMode,
    shared: Arc<Shared>,
    view: Arc<GraphState>,
    generation: u64,
    log: Vec<WriteOp>,
    held: Vec<NodeKey>,
}

impl InMemoryTxn {
    fn lock(&mut self, key: &NodeKey) -> Result<(), StorageError> {
        if self.mode == TxnMode::ReadOnly {
            return Err(StorageError::ReadOnly);
        }
        if self.shared.locks.acquire(self.id, key)? {
            self.held.push(key.clone());
        }
        self.refresh()
    }

    /// Locks both endpoints of an edge in key order.
    fn lock_pair(&mut self, a: &NodeKey, b: &NodeKey) -> Result<(), StorageError> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.lock(first)?;
        self.lock(second)
    }

    /// Rebuilds the working copy if another transaction has committed.
    fn refresh(&mut self) -> Result<(), StorageError> {
        let committed = self
            .shared
            .committed
            .read()
            .map_err(|_| StorageError::Poisoned)?;
        if committed.generation == self.generation {
            return Ok(());
        }
        let mut state = Arc::clone(&committed.state);
        let generation = committed.generation;
        drop(committed);

        if !self.log.is_empty() {
            let working = Arc::make_mut(&mut state);
            for op in &self.log {
                working.apply(op)?;
            }
        }
        self.view = state;
        self.generation = generation;
        Ok(())
    }

    fn write(&mut self, op: WriteOp) -> Result<(), StorageError> {
        Arc::make_mut(&mut self.view).apply(&op)?;
        self.log.push(op);
        Ok(())
    }

    fn publish(&mut self) -> Result<(), StorageError> {
        if self.log.is_empty() {
            return Ok(());
        }
        let mut committed = self
            .shared
            .committed
            .write()
            .map_err(|_| StorageError::Poisoned)?;
        if committed.generation == self.generation {
            committed.state = Arc::clone(&self.view);
        } else {
            let mut state = Arc::clone(&committed.state);
            let working = Arc::make_mut(&mut state);
            for op in &self.log {
                working.apply(op)?;
            }
            committed.state = state;
        }
        committed.generation += 1;
        tracing::debug!(
            txn = self.id,
            writes = self.log.len(),
            generation = committed.generation,
            "in-memory transaction committed"
        );
        Ok(())
    }

    fn release(&mut self) {
        let held = std::mem::take(&mut self.held);
        self.shared.locks.release_all(self.id, &held);
        self.log.clear();
    }
}

impl Drop for InMemoryTxn {
    fn drop(&mut self) {
        self.release();
    }
}

impl GraphTxn for InMemoryTxn {
    // -------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------

    fn merge_node(
        &mut self,
        key: &NodeKey,
        on_create: &Properties,
        on_match: &Properties,
    ) -> Result<MergeOutcome, StorageError> {
        self.lock(key)?;
        match self.view.node(key).cloned() {
            Some(mut node) => {
                if !on_match.is_empty() {
                    node.props
                        .extend(on_match.iter().map(|(k, v)| (k.clone(), v.clone())));
                    self.write(WriteOp::PutNode(node.clone()))?;
                }
                Ok(MergeOutcome {
                    node,
                    created: false,
                })
            }
            None => {
                let node = NodeRecord {
                    key: key.clone(),
                    props: on_create.clone(),
                };
                self.write(WriteOp::PutNode(node.clone()))?;
                Ok(MergeOutcome {
                    node,
                    created: true,
                })
            }
        }
    }

    fn get_node(&self, key: &NodeKey) -> Result<Option<NodeRecord>, StorageError> {
        Ok(self.view.node(key).cloned())
    }

    fn nodes(&self, label: Label) -> Result<Vec<NodeRecord>, StorageError> {
        let mut nodes: Vec<NodeRecord> = self
            .view
            .index
            .iter()
            .filter(|(key, _)| key.label == label)
            .filter_map(|(_, &idx)| self.view.graph.node_weight(idx).cloned())
            .collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(nodes)
    }

    fn delete_node(&mut self, key: &NodeKey) -> Result<bool, StorageError> {
        self.lock(key)?;
        if self.view.node(key).is_none() {
            return Ok(false);
        }
        self.write(WriteOp::DeleteNode(key.clone()))?;
        Ok(true)
    }

    // -------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------

    fn merge_edge(
        &mut self,
        from: &NodeKey,
        to: &NodeKey,
        kind: EdgeKind,
        props: &Properties,
    ) -> Result<bool, StorageError> {
        self.lock_pair(from, to)?;
        let existed = self.view.find_edge(from, to, kind).is_some();
        self.write(WriteOp::PutEdge(EdgeRecord {
            from: from.clone(),
            to: to.clone(),
            kind,
            props: props.clone(),
        }))?;
        Ok(!existed)
    }

    fn delete_edge(
        &mut self,
        from: &NodeKey,
        to: &NodeKey,
        kind: EdgeKind,
    ) -> Result<bool, StorageError> {
        self.lock_pair(from, to)?;
        if self.view.find_edge(from, to, kind).is_none() {
            return Ok(false);
        }
        self.write(WriteOp::DeleteEdge {
            from: from.clone(),
            to: to.clone(),
            kind,
        })?;
        Ok(true)
    }

    fn outgoing(&self, key: &NodeKey, kind: EdgeKind) -> Result<Vec<EdgeRecord>, StorageError> {
        Ok(self.view.edges(key, kind, Direction::Outgoing))
    }

    fn incoming(&self, key: &NodeKey, kind: EdgeKind) -> Result<Vec<EdgeRecord>, StorageError> {
        Ok(self.view.edges(key, kind, Direction::Incoming))
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        let result = self.publish();
        self.release();
        result
    }

    fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        if !self.log.is_empty() {
            tracing::debug!(txn = self.id, writes = self.log.len(), "in-memory transaction rolled back");
        }
        self.release();
        Ok(())
    }
}
