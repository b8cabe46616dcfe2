//! Component nodes.

use serde_json::json;
use vantage_core::Component;
use vantage_storage::{EdgeKind, GraphTxn, Label, NodeKey, NodeRecord, Properties};

use crate::error::GraphError;
use crate::schema::{self, CREATED, DESCRIPTION};
use crate::versions;

/// Creates the component if it does not exist. Returns true if created.
///
/// Takes the component's write lock, which every later write touching the
/// component's versions relies on.
pub fn ensure_component(txn: &mut dyn GraphTxn, name: &str) -> Result<bool, GraphError> {
    let outcome = txn.merge_node(
        &NodeKey::component(name),
        &schema::properties([(CREATED, json!(schema::now_millis()))]),
        &Properties::new(),
    )?;
    if outcome.created {
        tracing::debug!(component = name, "created component");
    }
    Ok(outcome.created)
}

/// Creates or updates a component. A `None` description keeps whatever is
/// stored; a `Some` description replaces it.
pub fn create_or_update_component(
    txn: &mut dyn GraphTxn,
    name: &str,
    description: Option<&str>,
) -> Result<Component, GraphError> {
    let mut on_create = schema::properties([(CREATED, json!(schema::now_millis()))]);
    let mut on_match = Properties::new();
    if let Some(description) = description {
        on_create.insert(DESCRIPTION.to_string(), json!(description));
        on_match.insert(DESCRIPTION.to_string(), json!(description));
    }
    txn.merge_node(&NodeKey::component(name), &on_create, &on_match)?;
    get_component(txn, name)?
        .ok_or_else(|| GraphError::invariant(format!("component {name} missing after write")))
}

pub fn get_component(txn: &dyn GraphTxn, name: &str) -> Result<Option<Component>, GraphError> {
    match txn.get_node(&NodeKey::component(name))? {
        Some(node) => Ok(Some(to_component(txn, &node)?)),
        None => Ok(None),
    }
}

/// All components, by name, each with its most recent version.
pub fn list_components(txn: &dyn GraphTxn) -> Result<Vec<Component>, GraphError> {
    txn.nodes(Label::Component)?
        .iter()
        .map(|node| to_component(txn, node))
        .collect()
}

/// The real version with no successor in the precedence chain.
pub fn most_recent_version(txn: &dyn GraphTxn, name: &str) -> Result<Option<String>, GraphError> {
    let mut tails = Vec::new();
    for version in versions::real_versions(txn, name)? {
        let key = NodeKey::version(name, &version);
        if txn.outgoing(&key, EdgeKind::Precedes)?.is_empty() {
            tails.push(version);
        }
    }
    match tails.len() {
        0 | 1 => Ok(tails.pop()),
        _ => Err(GraphError::invariant(format!(
            "component {name} has {} versions without a successor: {}",
            tails.len(),
            tails.join(", ")
        ))),
    }
}

fn to_component(txn: &dyn GraphTxn, node: &NodeRecord) -> Result<Component, GraphError> {
    let name = node.key.part(0).to_string();
    let most_recent_version = most_recent_version(txn, &name)?;
    Ok(Component {
        description: schema::get_str(&node.props, DESCRIPTION),
        name,
        most_recent_version,
    })
}
