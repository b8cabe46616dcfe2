//! Storage-layer graph types: node keys, labels, edge kinds and records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Node properties. Values are arbitrary JSON.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// The kind of a node. Together with its key parts it identifies the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Component,
    Version,
    Issue,
    QueueCreateRequest,
    QueueLock,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Component => "Component",
            Label::Version => "Version",
            Label::Issue => "Issue",
            Label::QueueCreateRequest => "QueueCreateRequest",
            Label::QueueLock => "QueueLock",
        }
    }

    pub fn parse(s: &str) -> Option<Label> {
        match s {
            "Component" => Some(Label::Component),
            "Version" => Some(Label::Version),
            "Issue" => Some(Label::Issue),
            "QueueCreateRequest" => Some(Label::QueueCreateRequest),
            "QueueLock" => Some(Label::QueueLock),
            _ => None,
        }
    }
}

/// Unique node identity: a label plus one or more key parts.
///
/// The derived `Ord` (label, then parts) is the order in which batch lock
/// acquisition happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: Label,
    pub parts: SmallVec<[String; 2]>,
}

impl NodeKey {
    pub fn new<I, S>(label: Label, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NodeKey {
            label,
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn component(name: &str) -> Self {
        NodeKey::new(Label::Component, [name])
    }

    pub fn version(component: &str, version: &str) -> Self {
        NodeKey::new(Label::Version, [component, version])
    }

    pub fn issue(id: &str) -> Self {
        NodeKey::new(Label::Issue, [id])
    }

    pub fn queue_request(id: &str) -> Self {
        NodeKey::new(Label::QueueCreateRequest, [id])
    }

    pub fn queue_lock(name: &str) -> Self {
        NodeKey::new(Label::QueueLock, [name])
    }

    /// Returns the key part at `idx`, or `""` if absent.
    pub fn part(&self, idx: usize) -> &str {
        self.parts.get(idx).map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label.as_str(), self.parts.join(", "))
    }
}

/// Relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Version -> Component.
    VersionOf,
    /// Version -> Version, a resolved dependency.
    DependsOn,
    /// Version -> Version, an originally requested dependency.
    Requests,
    /// Version -> Version within one component, next newer real version.
    Precedes,
    /// Issue -> first affected Version.
    Affects,
    /// Issue -> first fixed Version.
    FixedBy,
    /// Queue request -> the request enqueued after it.
    Before,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::VersionOf => "VERSION_OF",
            EdgeKind::DependsOn => "DEPENDS_ON",
            EdgeKind::Requests => "REQUESTS",
            EdgeKind::Precedes => "PRECEDES",
            EdgeKind::Affects => "AFFECTS",
            EdgeKind::FixedBy => "FIXED_BY",
            EdgeKind::Before => "BEFORE",
        }
    }

    pub fn parse(s: &str) -> Option<EdgeKind> {
        match s {
            "VERSION_OF" => Some(EdgeKind::VersionOf),
            "DEPENDS_ON" => Some(EdgeKind::DependsOn),
            "REQUESTS" => Some(EdgeKind::Requests),
            "PRECEDES" => Some(EdgeKind::Precedes),
            "AFFECTS" => Some(EdgeKind::Affects),
            "FIXED_BY" => Some(EdgeKind::FixedBy),
            "BEFORE" => Some(EdgeKind::Before),
            _ => None,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: NodeKey,
    pub props: Properties,
}

/// A stored edge. At most one edge exists per `(from, to, kind)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: NodeKey,
    pub to: NodeKey,
    pub kind: EdgeKind,
    pub props: Properties,
}

/// Result of [`GraphTxn::merge_node`](crate::GraphTxn::merge_node).
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The node as it stands after the merge.
    pub node: NodeRecord,
    /// True if the node did not exist before.
    pub created: bool,
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnMode {
    ReadOnly,
    ReadWrite,
}
