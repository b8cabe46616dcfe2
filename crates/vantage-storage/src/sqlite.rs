//! SQLite implementation of [`GraphStore`].
//!
//! [`SqliteStore`] persists the graph in two tables (`nodes`, `edges`) with
//! properties stored as JSON TEXT via serde_json. Each transaction opens its
//! own connection: writers start with `BEGIN IMMEDIATE`, taking SQLite's
//! database write lock up front, so concurrent writers queue on the busy
//! timeout instead of deadlocking on lock upgrades.

use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use smallvec::SmallVec;

use crate::error::StorageError;
use crate::locks::DEFAULT_LOCK_TIMEOUT;
use crate::traits::{GraphStore, GraphTxn};
use crate::types::{EdgeKind, EdgeRecord, Label, MergeOutcome, NodeKey, NodeRecord, Properties, TxnMode};

/// SQLite-backed implementation of [`GraphStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: String,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`, applying migrations.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        Self::with_busy_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Like [`SqliteStore::new`], with a custom wait for SQLite's locks.
    pub fn with_busy_timeout(path: &str, busy_timeout: Duration) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path, busy_timeout)?;
        drop(conn);
        tracing::info!(path, "opened sqlite graph store");
        Ok(SqliteStore {
            path: path.to_string(),
            busy_timeout,
        })
    }
}

impl GraphStore for SqliteStore {
    fn begin(&self, mode: TxnMode) -> Result<Box<dyn GraphTxn>, StorageError> {
        let conn = crate::schema::open_connection(&self.path, self.busy_timeout)?;
        match mode {
            TxnMode::ReadOnly => conn.execute_batch("BEGIN DEFERRED")?,
            TxnMode::ReadWrite => conn.execute_batch("BEGIN IMMEDIATE")?,
        }
        Ok(Box::new(SqliteTxn {
            conn,
            mode,
            open: true,
        }))
    }
}

/// A transaction on its own SQLite connection.
pub struct SqliteTxn {
    conn: Connection,
    mode: TxnMode,
    open: bool,
}

// -----------------------------------------------------------------------
// Row encoding helpers
// -----------------------------------------------------------------------

fn encode_parts(key: &NodeKey) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&key.parts)?)
}

fn decode_key(label: &str, parts: &str) -> Result<NodeKey, StorageError> {
    let label = Label::parse(label).ok_or_else(|| StorageError::Integrity {
        reason: format!("unknown node label '{label}'"),
    })?;
    let parts: SmallVec<[String; 2]> = serde_json::from_str(parts)?;
    Ok(NodeKey { label, parts })
}

fn encode_props(props: &Properties) -> Result<String, StorageError> {
    Ok(serde_json::to_string(props)?)
}

fn decode_props(props: &str) -> Result<Properties, StorageError> {
    Ok(serde_json::from_str(props)?)
}

impl SqliteTxn {
    fn ensure_writable(&self) -> Result<(), StorageError> {
        if self.mode == TxnMode::ReadOnly {
            return Err(StorageError::ReadOnly);
        }
        Ok(())
    }

    fn node_props(&self, key: &NodeKey) -> Result<Option<Properties>, StorageError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT props FROM nodes WHERE label = ?1 AND key = ?2",
                params![key.label.as_str(), encode_parts(key)?],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|p| decode_props(&p)).transpose()
    }

    fn edge_exists(&self, from: &NodeKey, to: &NodeKey, kind: EdgeKind) -> Result<bool, StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM edges
                WHERE kind = ?1 AND from_label = ?2 AND from_key = ?3 AND to_label = ?4 AND to_key = ?5)",
            params![
                kind.as_str(),
                from.label.as_str(),
                encode_parts(from)?,
                to.label.as_str(),
                encode_parts(to)?
            ],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Reads edges of `kind` leaving (`outgoing`) or entering `key`, sorted
    /// by the opposite endpoint.
    fn adjacent(&self, key: &NodeKey, kind: EdgeKind, outgoing: bool) -> Result<Vec<EdgeRecord>, StorageError> {
        let sql = if outgoing {
            "SELECT from_label, from_key, to_label, to_key, props FROM edges
             WHERE kind = ?1 AND from_label = ?2 AND from_key = ?3"
        } else {
            "SELECT from_label, from_key, to_label, to_key, props FROM edges
             WHERE kind = ?1 AND to_label = ?2 AND to_key = ?3"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(
            params![kind.as_str(), key.label.as_str(), encode_parts(key)?],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )?;

        let mut edges = Vec::new();
        for row in rows {
            let (from_label, from_key, to_label, to_key, props) = row?;
            edges.push(EdgeRecord {
                from: decode_key(&from_label, &from_key)?,
                to: decode_key(&to_label, &to_key)?,
                kind,
                props: decode_props(&props)?,
            });
        }
        if outgoing {
            edges.sort_by(|a, b| a.to.cmp(&b.to));
        } else {
            edges.sort_by(|a, b| a.from.cmp(&b.from));
        }
        Ok(edges)
    }

    fn finish(&mut self, statement: &str) -> Result<(), StorageError> {
        self.open = false;
        self.conn.execute_batch(statement)?;
        Ok(())
    }
}

impl Drop for SqliteTxn {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %err, "rollback of abandoned sqlite transaction failed");
            }
        }
    }
}

impl GraphTxn for SqliteTxn {
    // -------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------

    fn merge_node(
        &mut self,
        key: &NodeKey,
        on_create: &Properties,
        on_match: &Properties,
    ) -> Result<MergeOutcome, StorageError> {
        self.ensure_writable()?;
        match self.node_props(key)? {
            Some(mut props) => {
                if !on_match.is_empty() {
                    props.extend(on_match.iter().map(|(k, v)| (k.clone(), v.clone())));
                    self.conn.execute(
                        "UPDATE nodes SET props = ?3 WHERE label = ?1 AND key = ?2",
                        params![key.label.as_str(), encode_parts(key)?, encode_props(&props)?],
                    )?;
                }
                Ok(MergeOutcome {
                    node: NodeRecord {
                        key: key.clone(),
                        props,
                    },
                    created: false,
                })
            }
            None => {
                self.conn.execute(
                    "INSERT INTO nodes (label, key, props) VALUES (?1, ?2, ?3)",
                    params![key.label.as_str(), encode_parts(key)?, encode_props(on_create)?],
                )?;
                Ok(MergeOutcome {
                    node: NodeRecord {
                        key: key.clone(),
                        props: on_create.clone(),
                    },
                    created: true,
                })
            }
        }
    }

    fn get_node(&self, key: &NodeKey) -> Result<Option<NodeRecord>, StorageError> {
        Ok(self.node_props(key)?.map(|props| NodeRecord {
            key: key.clone(),
            props,
        }))
    }

    fn nodes(&self, label: Label) -> Result<Vec<NodeRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, props FROM nodes WHERE label = ?1")?;
        let rows = stmt.query_map(params![label.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut nodes = Vec::new();
        for row in rows {
            let (key, props) = row?;
            nodes.push(NodeRecord {
                key: decode_key(label.as_str(), &key)?,
                props: decode_props(&props)?,
            });
        }
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(nodes)
    }

    fn delete_node(&mut self, key: &NodeKey) -> Result<bool, StorageError> {
        self.ensure_writable()?;
        // Edges go with the node via ON DELETE CASCADE.
        let deleted = self.conn.execute(
            "DELETE FROM nodes WHERE label = ?1 AND key = ?2",
            params![key.label.as_str(), encode_parts(key)?],
        )?;
        Ok(deleted > 0)
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
        self.ensure_writable()?;
        for endpoint in [from, to] {
            if self.node_props(endpoint)?.is_none() {
                return Err(StorageError::NodeNotFound {
                    key: endpoint.to_string(),
                });
            }
        }
        let existed = self.edge_exists(from, to, kind)?;
        self.conn.execute(
            "INSERT INTO edges (kind, from_label, from_key, to_label, to_key, props)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (kind, from_label, from_key, to_label, to_key)
             DO UPDATE SET props = excluded.props",
            params![
                kind.as_str(),
                from.label.as_str(),
                encode_parts(from)?,
                to.label.as_str(),
                encode_parts(to)?,
                encode_props(props)?
            ],
        )?;
        Ok(!existed)
    }

    fn delete_edge(
        &mut self,
        from: &NodeKey,
        to: &NodeKey,
        kind: EdgeKind,
    ) -> Result<bool, StorageError> {
        self.ensure_writable()?;
        let deleted = self.conn.execute(
            "DELETE FROM edges
             WHERE kind = ?1 AND from_label = ?2 AND from_key = ?3 AND to_label = ?4 AND to_key = ?5",
            params![
                kind.as_str(),
                from.label.as_str(),
                encode_parts(from)?,
                to.label.as_str(),
                encode_parts(to)?
            ],
        )?;
        Ok(deleted > 0)
    }

    fn outgoing(&self, key: &NodeKey, kind: EdgeKind) -> Result<Vec<EdgeRecord>, StorageError> {
        self.adjacent(key, kind, true)
    }

    fn incoming(&self, key: &NodeKey, kind: EdgeKind) -> Result<Vec<EdgeRecord>, StorageError> {
        self.adjacent(key, kind, false)
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        self.finish("COMMIT")
    }

    fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        self.finish("ROLLBACK")
    }
}
