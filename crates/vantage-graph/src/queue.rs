//! The create queue: a FIFO of pending version writes stored in the graph.
//!
//! Requests are `QueueCreateRequest` nodes linked oldest to newest by
//! BEFORE edges. Two `QueueLock` nodes serialize access: consumers take
//! `head` before reading the oldest request, producers take `tail` before
//! appending, and acknowledging a request takes `tail` too so removal
//! never races an append onto the same node. A lock is taken by writing a
//! fresh token into its node, so it is held until the transaction ends.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use vantage_core::VersionSpec;
use vantage_storage::{EdgeKind, GraphTxn, Label, NodeKey, NodeRecord, Properties};

use crate::error::GraphError;
use crate::schema::{self, BLOB, CREATED, ID, LOCK_TOKEN};

pub const HEAD_LOCK: &str = "head";
pub const TAIL_LOCK: &str = "tail";

/// A create request waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    pub id: String,
    /// Enqueue time, milliseconds since the epoch.
    pub created: i64,
    pub version: VersionSpec,
}

fn take_lock(txn: &mut dyn GraphTxn, name: &str) -> Result<(), GraphError> {
    let token = schema::properties([(LOCK_TOKEN, json!(Uuid::new_v4().to_string()))]);
    txn.merge_node(&NodeKey::queue_lock(name), &token, &token)?;
    Ok(())
}

pub fn lock_head(txn: &mut dyn GraphTxn) -> Result<(), GraphError> {
    take_lock(txn, HEAD_LOCK)
}

pub fn lock_tail(txn: &mut dyn GraphTxn) -> Result<(), GraphError> {
    take_lock(txn, TAIL_LOCK)
}

/// Appends a request and returns it.
pub fn enqueue(txn: &mut dyn GraphTxn, version: &VersionSpec) -> Result<QueuedRequest, GraphError> {
    lock_tail(txn)?;
    let tail = find_end(txn, EdgeKind::Before, Direction::Outgoing)?;

    let request = QueuedRequest {
        id: Uuid::new_v4().to_string(),
        created: schema::now_millis(),
        version: version.clone(),
    };
    let key = NodeKey::queue_request(&request.id);
    txn.merge_node(
        &key,
        &schema::properties([
            (ID, json!(request.id)),
            (CREATED, json!(request.created)),
            (BLOB, json!(serde_json::to_string(&request.version)?)),
        ]),
        &Properties::new(),
    )?;
    if let Some(tail) = tail {
        txn.merge_edge(&tail.key, &key, EdgeKind::Before, &Properties::new())?;
    }
    tracing::info!(request = %request.id, version = %version.id(), "enqueued create request");
    Ok(request)
}

/// The oldest request, left in place until [`ack`]ed.
pub fn dequeue(txn: &mut dyn GraphTxn) -> Result<Option<QueuedRequest>, GraphError> {
    lock_head(txn)?;
    match find_end(txn, EdgeKind::Before, Direction::Incoming)? {
        Some(node) => Ok(Some(decode(&node)?)),
        None => Ok(None),
    }
}

/// Removes a processed request. Returns false if it was already gone.
pub fn ack(txn: &mut dyn GraphTxn, id: &str) -> Result<bool, GraphError> {
    lock_tail(txn)?;
    let removed = txn.delete_node(&NodeKey::queue_request(id))?;
    tracing::debug!(request = id, removed, "acknowledged create request");
    Ok(removed)
}

/// Every queued request, oldest first.
pub fn pending(txn: &dyn GraphTxn) -> Result<Vec<QueuedRequest>, GraphError> {
    let total = txn.nodes(Label::QueueCreateRequest)?.len();
    let mut result = Vec::with_capacity(total);
    let mut current = find_end(txn, EdgeKind::Before, Direction::Incoming)?;
    while let Some(node) = current {
        result.push(decode(&node)?);
        current = match txn.outgoing(&node.key, EdgeKind::Before)?.as_slice() {
            [] => None,
            [edge] => txn.get_node(&edge.to)?,
            edges => {
                return Err(GraphError::invariant(format!(
                    "queue request {} has {} successors",
                    node.key.part(0),
                    edges.len()
                )))
            }
        };
        if result.len() > total {
            return Err(GraphError::invariant("cycle in create queue"));
        }
    }
    Ok(result)
}

#[derive(Clone, Copy)]
enum Direction {
    Incoming,
    Outgoing,
}

/// The single request with no BEFORE edge in `direction`: the head for
/// incoming, the tail for outgoing.
fn find_end(txn: &dyn GraphTxn, kind: EdgeKind, direction: Direction) -> Result<Option<NodeRecord>, GraphError> {
    let mut ends = Vec::new();
    for node in txn.nodes(Label::QueueCreateRequest)? {
        let edges = match direction {
            Direction::Incoming => txn.incoming(&node.key, kind)?,
            Direction::Outgoing => txn.outgoing(&node.key, kind)?,
        };
        if edges.is_empty() {
            ends.push(node);
        }
    }
    if ends.len() > 1 {
        return Err(GraphError::invariant(format!(
            "create queue has {} {}",
            ends.len(),
            match direction {
                Direction::Incoming => "heads",
                Direction::Outgoing => "tails",
            }
        )));
    }
    Ok(ends.pop())
}

fn decode(node: &NodeRecord) -> Result<QueuedRequest, GraphError> {
    let blob = schema::get_str(&node.props, BLOB)
        .ok_or_else(|| GraphError::invariant(format!("queue request {} has no payload", node.key.part(0))))?;
    Ok(QueuedRequest {
        id: node.key.part(0).to_string(),
        created: schema::get_i64(&node.props, CREATED),
        version: serde_json::from_str(&blob)?,
    })
}
