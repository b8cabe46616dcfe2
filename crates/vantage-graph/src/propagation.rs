//! Issue propagation and the active flag.
//!
//! An issue affecting version `A` of a component also affects every later
//! version on the same PRECEDES chain segment, up to but excluding its fix
//! version. Those are a version's *direct* issues. Its *transitive* issues
//! are the direct issues of everything reachable from it over DEPENDS_ON.
//!
//! A version is *active* when it is the newest real version of its
//! component, or when an active version depends on it, directly or through
//! other versions. All of this is recomputed from the graph on every query;
//! [`IssueResolver`] only caches within a single read.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use vantage_core::{Issue, VersionId};
use vantage_storage::{EdgeKind, GraphTxn};

use crate::error::GraphError;
use crate::issues;
use crate::precedence;
use crate::schema::{version_id, version_key};
use crate::versions;

/// Chain positions and affecting issues of one component.
struct ComponentIndex {
    /// version -> (segment, position within segment)
    positions: HashMap<String, (usize, usize)>,
    issues: Vec<Issue>,
}

impl ComponentIndex {
    fn load(txn: &dyn GraphTxn, component: &str) -> Result<Self, GraphError> {
        let mut positions = HashMap::new();
        for (segment, versions) in precedence::segments(txn, component)?.into_iter().enumerate() {
            for (position, version) in versions.into_iter().enumerate() {
                positions.insert(version, (segment, position));
            }
        }

        let mut ids = Vec::new();
        for node in versions::component_versions(txn, component)? {
            ids.extend(issues::issues_affecting(txn, &node.id)?);
        }
        ids.sort();
        ids.dedup();

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let issue = issues::get_issue(txn, &id)?
                .ok_or_else(|| GraphError::invariant(format!("issue {id} vanished during read")))?;
            found.push(issue);
        }
        Ok(ComponentIndex {
            positions,
            issues: found,
        })
    }

    /// True if `at` is `version` or sits before it on the same segment.
    fn at_or_before(&self, at: &VersionId, version: &VersionId) -> bool {
        if at == version {
            return true;
        }
        if at.component != version.component {
            return false;
        }
        match (self.positions.get(&at.version), self.positions.get(&version.version)) {
            (Some((seg_a, pos_a)), Some((seg_v, pos_v))) => seg_a == seg_v && pos_a <= pos_v,
            _ => false,
        }
    }

    fn direct(&self, version: &VersionId) -> Vec<Issue> {
        self.issues
            .iter()
            .filter(|issue| self.at_or_before(&issue.affects_version, version))
            .filter(|issue| match &issue.fix_version {
                Some(fix) => !self.at_or_before(fix, version),
                None => true,
            })
            .cloned()
            .collect()
    }
}

/// Computes issue sets and active flags over one transaction's view of the
/// graph, caching per-component indexes along the way.
pub struct IssueResolver<'a> {
    txn: &'a dyn GraphTxn,
    components: HashMap<String, ComponentIndex>,
    active: HashMap<VersionId, bool>,
}

impl<'a> IssueResolver<'a> {
    pub fn new(txn: &'a dyn GraphTxn) -> Self {
        IssueResolver {
            txn,
            components: HashMap::new(),
            active: HashMap::new(),
        }
    }

    fn index(&mut self, component: &str) -> Result<&ComponentIndex, GraphError> {
        if !self.components.contains_key(component) {
            let index = ComponentIndex::load(self.txn, component)?;
            self.components.insert(component.to_string(), index);
        }
        self.components
            .get(component)
            .ok_or_else(|| GraphError::invariant(format!("component index for {component} missing")))
    }

    /// Issues affecting `version` through its own chain, sorted by id.
    pub fn direct(&mut self, version: &VersionId) -> Result<Vec<Issue>, GraphError> {
        Ok(self.index(&version.component)?.direct(version))
    }

    /// Direct issues of every version reachable from `version`'s resolved
    /// dependencies, deduplicated and sorted by id.
    pub fn transitive(&mut self, version: &VersionId) -> Result<Vec<Issue>, GraphError> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<VersionId> = versions::resolved_dependencies(self.txn, version)?
            .into_iter()
            .map(|edge| edge.version)
            .collect();
        let mut found = BTreeMap::new();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            for issue in self.direct(&next)? {
                found.entry(issue.id.clone()).or_insert(issue);
            }
            for edge in versions::resolved_dependencies(self.txn, &next)? {
                if !seen.contains(&edge.version) {
                    queue.push_back(edge.version);
                }
            }
        }
        Ok(found.into_values().collect())
    }

    /// Whether `version` is newest in its component or depended on, at any
    /// depth, by a version that is.
    pub fn is_active(&mut self, version: &VersionId) -> Result<bool, GraphError> {
        if let Some(&cached) = self.active.get(version) {
            return Ok(cached);
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([version.clone()]);
        let mut active = false;
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if self.is_newest(&next)? {
                active = true;
                break;
            }
            for edge in self.txn.incoming(&version_key(&next), EdgeKind::DependsOn)? {
                let from = version_id(&edge.from);
                if !seen.contains(&from) {
                    queue.push_back(from);
                }
            }
        }
        self.active.insert(version.clone(), active);
        Ok(active)
    }

    fn is_newest(&self, version: &VersionId) -> Result<bool, GraphError> {
        let Some(node) = versions::get_version_node(self.txn, version)? else {
            return Ok(false);
        };
        Ok(!node.shadow && versions::successor(self.txn, version)?.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ensure_component;
    use crate::precedence::fix_precedence;
    use crate::versions::{create_resolved_dependency, create_version};
    use std::collections::BTreeSet;
    use vantage_core::{IssueLevel, IssueRequest};
    use vantage_storage::{GraphStore, InMemoryStore, TxnMode};

    fn add(txn: &mut dyn GraphTxn, component: &str, version: &str) -> VersionId {
        let id = VersionId::new(component, version);
        ensure_component(txn, component).unwrap();
        if create_version(txn, &id, false).unwrap() {
            fix_precedence(txn, &id).unwrap();
        }
        id
    }

    fn depend(txn: &mut dyn GraphTxn, from: &VersionId, to: &VersionId) {
        create_resolved_dependency(txn, from, to, &BTreeSet::new()).unwrap();
    }

    fn issue(txn: &mut dyn GraphTxn, id: &str, affects: &VersionId, fix: Option<&VersionId>) {
        let request = IssueRequest {
            level: Some(IssueLevel::Critical),
            message: None,
            affects_version: affects.clone(),
            fix_version: fix.cloned(),
        };
        issues::create_or_update_issue(txn, id, &request).unwrap();
    }

    fn ids(issues: Vec<Issue>) -> Vec<String> {
        issues.into_iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_direct_issues_stop_at_fix_version() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let chain: Vec<VersionId> = ["v1", "v2", "v3", "v4", "v5"]
            .iter()
            .map(|v| add(txn.as_mut(), "component", v))
            .collect();
        issue(txn.as_mut(), "i", &chain[1], Some(&chain[3]));

        let mut resolver = IssueResolver::new(txn.as_ref());
        let direct: Vec<Vec<String>> = chain
            .iter()
            .map(|v| ids(resolver.direct(v).unwrap()))
            .collect();
        assert_eq!(
            direct,
            vec![vec![], vec!["i".to_string()], vec!["i".to_string()], vec![], vec![]]
        );
    }

    #[test]
    fn test_unfixed_issue_reaches_chain_end() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let v1 = add(txn.as_mut(), "c", "1.0");
        let v3 = add(txn.as_mut(), "c", "3.0");
        issue(txn.as_mut(), "i", &v1, None);
        let v2 = add(txn.as_mut(), "c", "2.0");

        let mut resolver = IssueResolver::new(txn.as_ref());
        assert_eq!(ids(resolver.direct(&v2).unwrap()), vec!["i"]);
        assert_eq!(ids(resolver.direct(&v3).unwrap()), vec!["i"]);
    }

    #[test]
    fn test_transitive_issues_follow_nested_dependencies() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let app = add(txn.as_mut(), "app", "1");
        let lib = add(txn.as_mut(), "lib", "1");
        let base = add(txn.as_mut(), "base", "1");
        let other = add(txn.as_mut(), "other", "1");
        depend(txn.as_mut(), &app, &lib);
        depend(txn.as_mut(), &lib, &base);
        depend(txn.as_mut(), &app, &other);
        issue(txn.as_mut(), "b", &base, None);
        issue(txn.as_mut(), "a", &lib, None);
        issue(txn.as_mut(), "self", &app, None);

        let mut resolver = IssueResolver::new(txn.as_ref());
        assert_eq!(ids(resolver.transitive(&app).unwrap()), vec!["a", "b"]);
        assert_eq!(ids(resolver.transitive(&lib).unwrap()), vec!["b"]);
        assert!(resolver.transitive(&base).unwrap().is_empty());
    }

    #[test]
    fn test_transitive_tolerates_cycles() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let a = add(txn.as_mut(), "a", "1");
        let b = add(txn.as_mut(), "b", "1");
        depend(txn.as_mut(), &a, &b);
        depend(txn.as_mut(), &b, &a);
        issue(txn.as_mut(), "x", &a, None);

        let mut resolver = IssueResolver::new(txn.as_ref());
        assert_eq!(ids(resolver.transitive(&a).unwrap()), vec!["x"]);
        assert!(resolver.is_active(&a).unwrap());
    }

    #[test]
    fn test_active_follows_dependencies_of_newest() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let app1 = add(txn.as_mut(), "app", "1.0");
        let app2 = add(txn.as_mut(), "app", "2.0");
        let old_lib = add(txn.as_mut(), "lib", "1.0");
        let used_lib = add(txn.as_mut(), "lib", "1.5");
        let new_lib = add(txn.as_mut(), "lib", "2.0");
        depend(txn.as_mut(), &app1, &old_lib);
        depend(txn.as_mut(), &app2, &used_lib);

        let mut resolver = IssueResolver::new(txn.as_ref());
        assert!(!resolver.is_active(&app1).unwrap());
        assert!(resolver.is_active(&app2).unwrap());
        assert!(!resolver.is_active(&old_lib).unwrap());
        assert!(resolver.is_active(&used_lib).unwrap());
        assert!(resolver.is_active(&new_lib).unwrap());
    }

    #[test]
    fn test_shadow_version_is_not_a_root() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        ensure_component(txn.as_mut(), "dep").unwrap();
        let shadow = VersionId::new("dep", "latest");
        create_version(txn.as_mut(), &shadow, true).unwrap();

        let mut resolver = IssueResolver::new(txn.as_ref());
        assert!(!resolver.is_active(&shadow).unwrap());
    }
}
