//! The version creation pipeline.
//!
//! A write touches many nodes, and concurrent writes may overlap. To keep
//! two transactions from waiting on each other's locks, every write takes
//! its locks in one global order: all components by name, then shadow
//! versions, then real versions, both under [`compare_version_ids`]. Only
//! after every node exists are edges drawn between them. Since a version's
//! lock is always requested after its component's, overlapping writes on
//! the in-memory backend serialize on the first component they share; the
//! SQLite backend serializes every writer at `BEGIN IMMEDIATE`.

use std::collections::BTreeSet;

use vantage_core::{
    compare_version_ids, is_latest, is_real, purify, require_real, DependencySpec, ResolvedVersion,
    VersionId, VersionSpec,
};
use vantage_storage::GraphTxn;

use crate::components::ensure_component;
use crate::error::GraphError;
use crate::precedence::fix_precedences;
use crate::query;
use crate::versions::{create_requested_dependency, create_resolved_dependency, create_version};

/// Every node a write will touch, in lock order.
#[derive(Debug, Default)]
struct WritePlan {
    components: BTreeSet<String>,
    shadows: Vec<VersionId>,
    reals: Vec<VersionId>,
}

impl WritePlan {
    /// Validates `spec` and collects what it references. Fails before any
    /// node is touched.
    fn build(spec: &VersionSpec, exclude_requested: bool) -> Result<Self, GraphError> {
        let mut plan = WritePlan::default();
        plan.add_real(&spec.id())?;

        for dep in &spec.resolved_dependencies {
            let id = dep.id();
            if is_latest(&id.version) {
                plan.add_shadow(purify(&id));
            } else {
                plan.add_real(&id)?;
            }
            if !exclude_requested {
                plan.add_requested(&dep.version.requested_dependencies);
            }
        }

        if exclude_requested {
            for dep in &spec.requested_dependencies {
                plan.components.insert(dep.version.component.clone());
            }
        } else {
            plan.add_requested(&spec.requested_dependencies);
        }

        plan.shadows.sort_by(compare_version_ids);
        plan.shadows.dedup();
        plan.reals.sort_by(compare_version_ids);
        plan.reals.dedup();
        Ok(plan)
    }

    fn add_real(&mut self, id: &VersionId) -> Result<(), GraphError> {
        require_real(id)?;
        self.components.insert(id.component.clone());
        self.reals.push(id.clone());
        Ok(())
    }

    fn add_shadow(&mut self, id: VersionId) {
        self.components.insert(id.component.clone());
        self.shadows.push(id);
    }

    fn add_requested(&mut self, requested: &[DependencySpec]) {
        for dep in requested {
            let id = purify(&dep.id());
            self.components.insert(id.component.clone());
            if is_real(&id.version) {
                self.reals.push(id);
            } else {
                self.shadows.push(id);
            }
        }
    }
}

/// Creates or updates a version with its dependency edges and returns it
/// resolved.
///
/// With `exclude_requested` no REQUESTS edges are written and requested
/// versions are not created; this is the dry-run mode, whose caller rolls
/// the transaction back.
pub fn create_or_update_version(
    txn: &mut dyn GraphTxn,
    spec: &VersionSpec,
    exclude_requested: bool,
) -> Result<ResolvedVersion, GraphError> {
    let top = spec.id();
    let plan = WritePlan::build(spec, exclude_requested)?;
    tracing::info!(
        version = %top,
        components = plan.components.len(),
        versions = plan.shadows.len() + plan.reals.len(),
        exclude_requested,
        "writing version"
    );

    for component in &plan.components {
        ensure_component(txn, component)?;
    }

    for id in &plan.shadows {
        create_version(txn, id, true)?;
    }
    let mut created = Vec::new();
    for id in &plan.reals {
        if create_version(txn, id, false)? {
            created.push(id.clone());
        }
    }
    tracing::debug!(version = %top, created = created.len(), "nodes in place");

    for dep in &spec.resolved_dependencies {
        let target = purify(&dep.id());
        create_resolved_dependency(txn, &top, &target, &dep.profiles)?;
        if !exclude_requested {
            save_requested(txn, &target, &dep.version.requested_dependencies)?;
        }
    }
    if !exclude_requested {
        save_requested(txn, &top, &spec.requested_dependencies)?;
    }

    fix_precedences(txn, &created)?;

    query::get_version(txn, &top)?
        .ok_or_else(|| GraphError::invariant(format!("version {top} missing after write")))
}

/// Creates a single real version outside the full pipeline, fixing its
/// precedence if it is new. Returns true if it was created.
pub fn ensure_version(txn: &mut dyn GraphTxn, id: &VersionId) -> Result<bool, GraphError> {
    require_real(id)?;
    ensure_component(txn, &id.component)?;
    let created = create_version(txn, id, false)?;
    if created {
        fix_precedences(txn, std::slice::from_ref(id))?;
    }
    Ok(created)
}

fn save_requested(txn: &mut dyn GraphTxn, from: &VersionId, requested: &[DependencySpec]) -> Result<(), GraphError> {
    for dep in requested {
        let id = dep.id();
        create_requested_dependency(txn, from, &purify(&id), &id.version, &dep.profiles)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::most_recent_version;
    use crate::precedence::chain;
    use crate::versions::{component_versions, get_version_node, requested_dependencies, successor};
    use proptest::prelude::*;
    use vantage_core::{compare_versions, CoreError};
    use vantage_storage::{transaction, GraphStore, InMemoryStore, Label, TxnMode};

    #[test]
    fn test_plan_orders_and_dedups() {
        let spec = VersionSpec::new("b", "1.0")
            .with_resolved(DependencySpec::new("a", "2.0"))
            .with_resolved(DependencySpec::new("a", "10.0"))
            .with_resolved(DependencySpec::new("c", "LATEST"))
            .with_requested(DependencySpec::new("a", "2.0"))
            .with_requested(DependencySpec::new("d", "[1,2)"));
        let plan = WritePlan::build(&spec, false).unwrap();

        assert_eq!(plan.components.iter().cloned().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
        assert_eq!(
            plan.reals,
            vec![
                VersionId::new("a", "2.0"),
                VersionId::new("a", "10.0"),
                VersionId::new("b", "1.0"),
            ]
        );
        assert_eq!(
            plan.shadows,
            vec![VersionId::new("c", "latest"), VersionId::new("d", "unknown")]
        );
    }

    #[test]
    fn test_dynamic_resolved_dependency_is_rejected_without_writes() {
        let store = InMemoryStore::new();
        let spec = VersionSpec::new("app", "1.0").with_resolved(DependencySpec::new("lib", "1.0+"));

        let err = transaction(&store, TxnMode::ReadWrite, false, |txn| {
            create_or_update_version(txn, &spec, false)
        })
        .unwrap_err();
        assert!(matches!(err, GraphError::Core(CoreError::InvalidVersion { .. })));

        let txn = store.begin(TxnMode::ReadOnly).unwrap();
        assert!(txn.nodes(Label::Component).unwrap().is_empty());
    }

    #[test]
    fn test_latest_dependency_becomes_shadow() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let spec = VersionSpec::new("app", "1.0").with_resolved(DependencySpec::new("dep", "latest"));
        let resolved = create_or_update_version(txn.as_mut(), &spec, false).unwrap();

        assert_eq!(resolved.resolved_dependencies[0].version.version, "latest");
        let shadow = get_version_node(txn.as_ref(), &VersionId::new("dep", "latest"))
            .unwrap()
            .unwrap();
        assert!(shadow.shadow);
        assert_eq!(most_recent_version(txn.as_ref(), "dep").unwrap(), None);
        assert_eq!(most_recent_version(txn.as_ref(), "app").unwrap(), Some("1.0".into()));
    }

    #[test]
    fn test_requested_dependencies_keep_literal_version() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let spec = VersionSpec::new("app", "1.0")
            .with_resolved(
                DependencySpec::on(
                    VersionSpec::new("lib", "2.0").with_requested(DependencySpec::new("base", "[3,4)")),
                )
                .with_profiles(["runtime"]),
            )
            .with_requested(DependencySpec::new("lib", "2.+"));
        let resolved = create_or_update_version(txn.as_mut(), &spec, false).unwrap();

        let requested = &resolved.requested_dependencies[0];
        assert_eq!(requested.version.version, "unknown");
        assert_eq!(requested.requested_version.as_deref(), Some("2.+"));

        let nested = requested_dependencies(txn.as_ref(), &VersionId::new("lib", "2.0")).unwrap();
        assert_eq!(nested[0].version, VersionId::new("base", "unknown"));
        assert_eq!(nested[0].requested_version.as_deref(), Some("[3,4)"));
    }

    #[test]
    fn test_exclude_requested_skips_requests() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let spec = VersionSpec::new("app", "1.0")
            .with_resolved(
                DependencySpec::on(VersionSpec::new("lib", "2.0").with_requested(DependencySpec::new("base", "3.0"))),
            )
            .with_requested(DependencySpec::new("other", "1.0"));
        let resolved = create_or_update_version(txn.as_mut(), &spec, true).unwrap();

        assert!(resolved.requested_dependencies.is_empty());
        assert!(requested_dependencies(txn.as_ref(), &VersionId::new("lib", "2.0"))
            .unwrap()
            .is_empty());
        assert!(txn.get_node(&vantage_storage::NodeKey::component("base")).unwrap().is_none());
        assert!(component_versions(txn.as_ref(), "other").unwrap().is_empty());
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        let spec = VersionSpec::new("app", "1.0").with_resolved(DependencySpec::new("lib", "2.0"));
        let first = create_or_update_version(txn.as_mut(), &spec, false).unwrap();
        let second = create_or_update_version(txn.as_mut(), &spec, false).unwrap();

        assert_eq!(first, second);
        assert_eq!(component_versions(txn.as_ref(), "lib").unwrap().len(), 1);
    }

    /// Writes `versions` of component `c` in one request: the first as the
    /// top version, the rest as its resolved dependencies.
    fn write_batch(txn: &mut dyn GraphTxn, versions: &[&str]) -> Result<ResolvedVersion, GraphError> {
        let mut spec = VersionSpec::new("c", versions[0]);
        for v in &versions[1..] {
            spec = spec.with_resolved(DependencySpec::new("c", *v));
        }
        create_or_update_version(txn, &spec, false)
    }

    fn assert_single_chain(txn: &dyn GraphTxn, expected: &[&str]) {
        assert_eq!(chain(txn, "c").unwrap(), expected);
        for pair in expected.windows(2) {
            let next = successor(txn, &VersionId::new("c", pair[0])).unwrap();
            assert_eq!(next, Some(VersionId::new("c", pair[1])));
        }
        let last = expected[expected.len() - 1];
        assert_eq!(successor(txn, &VersionId::new("c", last)).unwrap(), None);
    }

    #[test]
    fn test_several_new_maven_versions_in_one_request_splice_in_order() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        write_batch(txn.as_mut(), &["1.0"]).unwrap();
        write_batch(txn.as_mut(), &["3.0"]).unwrap();

        write_batch(txn.as_mut(), &["2.5", "2.0"]).unwrap();

        assert_single_chain(txn.as_ref(), &["1.0", "2.0", "2.5", "3.0"]);
        assert_eq!(most_recent_version(txn.as_ref(), "c").unwrap(), Some("3.0".into()));
    }

    #[test]
    fn test_several_new_opaque_versions_in_one_request_form_one_chain() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        write_batch(txn.as_mut(), &["abc", "def"]).unwrap();
        write_batch(txn.as_mut(), &["zz1", "aa2", "mm3"]).unwrap();

        assert_single_chain(txn.as_ref(), &["abc", "def", "aa2", "mm3", "zz1"]);
        let listed = query::get_versions(txn.as_ref(), "c").unwrap().unwrap();
        let names: Vec<&str> = listed.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(names, vec!["zz1", "mm3", "aa2", "def", "abc"]);
        assert_eq!(most_recent_version(txn.as_ref(), "c").unwrap(), Some("zz1".into()));
    }

    #[test]
    fn test_batch_switching_scheme_appends_after_existing_chain() {
        let store = InMemoryStore::new();
        let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
        write_batch(txn.as_mut(), &["1.0", "2.0"]).unwrap();
        write_batch(txn.as_mut(), &["1.5", "nightly"]).unwrap();

        let mut appended = vec!["1.5", "nightly"];
        appended.sort_by(|a, b| compare_versions(a, b));
        let expected: Vec<&str> = ["1.0", "2.0"].into_iter().chain(appended).collect();
        assert_single_chain(txn.as_ref(), &expected);
    }

    proptest! {
        #[test]
        fn prop_maven_chain_independent_of_batching(
            versions in proptest::collection::btree_set((0u8..4, 0u8..4, 0u8..3), 1..10),
            cuts in proptest::collection::vec(any::<bool>(), 10),
        ) {
            let strings: Vec<String> = versions.iter().map(|(a, b, c)| format!("{a}.{b}.{c}")).collect();
            let mut sorted = strings.clone();
            sorted.sort_by(|a, b| compare_versions(a, b));

            // Interleave from both ends so batches mix low and high versions.
            let mut order = Vec::with_capacity(strings.len());
            let (mut lo, mut hi) = (0, strings.len());
            while lo < hi {
                hi -= 1;
                order.push(strings[hi].as_str());
                if lo < hi {
                    order.push(strings[lo].as_str());
                    lo += 1;
                }
            }

            let store = InMemoryStore::new();
            let mut txn = store.begin(TxnMode::ReadWrite).unwrap();
            let mut batch: Vec<&str> = Vec::new();
            for (i, v) in order.iter().enumerate() {
                batch.push(*v);
                if cuts[i] || i + 1 == order.len() {
                    prop_assert!(write_batch(txn.as_mut(), &batch).is_ok());
                    batch.clear();
                }
            }

            prop_assert_eq!(chain(txn.as_ref(), "c").unwrap(), sorted.clone());
            for pair in sorted.windows(2) {
                let next = successor(txn.as_ref(), &VersionId::new("c", pair[0].as_str())).unwrap();
                prop_assert_eq!(next, Some(VersionId::new("c", pair[1].as_str())));
            }
        }
    }
}
