//! Transactional entry points: version creation (queued, dry-run and
//! direct), the queue consumer, components and issues.

use std::sync::Arc;

use vantage_core::{
    is_latest, require_real, Component, Issue, IssueRequest, ResolvedVersion, VersionId, VersionSpec,
};
use vantage_storage::{transaction, GraphStore, GraphTxn, TxnMode};

use crate::components;
use crate::error::GraphError;
use crate::issues;
use crate::query;
use crate::queue::{self, QueuedRequest};
use crate::writer;

/// Thread-safe facade over a [`GraphStore`]. Each call runs in its own
/// transaction.
#[derive(Clone)]
pub struct VantageService {
    store: Arc<dyn GraphStore>,
}

impl VantageService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        VantageService { store }
    }

    pub fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    fn write<T, F>(&self, body: F) -> Result<T, GraphError>
    where
        F: FnOnce(&mut dyn GraphTxn) -> Result<T, GraphError>,
    {
        transaction(self.store.as_ref(), TxnMode::ReadWrite, false, body)
    }

    fn read<T, F>(&self, body: F) -> Result<T, GraphError>
    where
        F: FnOnce(&dyn GraphTxn) -> Result<T, GraphError>,
    {
        transaction(self.store.as_ref(), TxnMode::ReadOnly, false, |txn| body(txn))
    }

    // -----------------------------------------------------------------------
    // Versions
    // -----------------------------------------------------------------------

    /// Queues a create request for the consumer. The request is validated
    /// first so it can never wedge the head of the queue.
    pub fn create_or_update_version(&self, spec: &VersionSpec) -> Result<QueuedRequest, GraphError> {
        validate(spec)?;
        self.write(|txn| queue::enqueue(txn, spec))
    }

    /// Runs the full write pipeline, without requested dependencies, and
    /// rolls it back. The result is what a real write would return.
    pub fn create_or_update_dry_run(&self, spec: &VersionSpec) -> Result<ResolvedVersion, GraphError> {
        transaction(self.store.as_ref(), TxnMode::ReadWrite, true, |txn| {
            queue::lock_head(txn)?;
            writer::create_or_update_version(txn, spec, true)
        })
    }

    /// Writes a version immediately, bypassing the queue.
    pub fn apply_version(&self, spec: &VersionSpec) -> Result<ResolvedVersion, GraphError> {
        self.write(|txn| writer::create_or_update_version(txn, spec, false))
    }

    /// Processes the oldest queued request, if any. On failure the request
    /// stays queued and the error is returned.
    pub fn process_next(&self) -> Result<Option<ResolvedVersion>, GraphError> {
        let result = self.write(|txn| {
            let Some(request) = queue::dequeue(txn)? else {
                return Ok(None);
            };
            let resolved = writer::create_or_update_version(txn, &request.version, false)?;
            queue::ack(txn, &request.id)?;
            tracing::info!(request = %request.id, version = %resolved.id(), "processed create request");
            Ok(Some(resolved))
        });
        if let Err(err) = &result {
            tracing::warn!(error = %err, "create request failed, left queued");
        }
        result
    }

    /// Processes requests until the queue is empty. Returns how many were
    /// processed.
    pub fn drain_queue(&self) -> Result<usize, GraphError> {
        let mut processed = 0;
        while self.process_next()?.is_some() {
            processed += 1;
        }
        Ok(processed)
    }

    pub fn pending_requests(&self) -> Result<Vec<QueuedRequest>, GraphError> {
        self.read(queue::pending)
    }

    /// Every real version of a component, newest first.
    pub fn get_versions(&self, component: &str) -> Result<Vec<ResolvedVersion>, GraphError> {
        self.read(|txn| query::get_versions(txn, component))?
            .ok_or_else(|| GraphError::not_found("component", component))
    }

    pub fn get_version(&self, id: &VersionId) -> Result<ResolvedVersion, GraphError> {
        self.read(|txn| query::get_version(txn, id))?
            .ok_or_else(|| GraphError::not_found("version", id))
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    pub fn create_or_update_component(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Component, GraphError> {
        self.write(|txn| components::create_or_update_component(txn, name, description))
    }

    pub fn get_component(&self, name: &str) -> Result<Component, GraphError> {
        self.read(|txn| components::get_component(txn, name))?
            .ok_or_else(|| GraphError::not_found("component", name))
    }

    pub fn list_components(&self) -> Result<Vec<Component>, GraphError> {
        self.read(components::list_components)
    }

    // -----------------------------------------------------------------------
    // Issues
    // -----------------------------------------------------------------------

    pub fn create_or_update_issue(&self, id: &str, request: &IssueRequest) -> Result<Issue, GraphError> {
        self.write(|txn| issues::create_or_update_issue(txn, id, request))
    }

    pub fn get_issue(&self, id: &str) -> Result<Issue, GraphError> {
        self.read(|txn| issues::get_issue(txn, id))?
            .ok_or_else(|| GraphError::not_found("issue", id))
    }

    pub fn list_issues(&self) -> Result<Vec<Issue>, GraphError> {
        self.read(issues::list_issues)
    }
}

/// Checks that the version and its resolved dependencies are concrete.
pub fn validate(spec: &VersionSpec) -> Result<(), GraphError> {
    require_real(&spec.id())?;
    for dep in &spec.resolved_dependencies {
        if !is_latest(&dep.version.version) {
            require_real(&dep.id())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::{CoreError, DependencySpec};
    use vantage_storage::InMemoryStore;

    fn service() -> VantageService {
        VantageService::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn test_invalid_request_is_not_queued() {
        let service = service();
        let spec = VersionSpec::new("app", "undefined");
        assert!(matches!(
            service.create_or_update_version(&spec),
            Err(GraphError::Core(CoreError::InvalidVersion { .. }))
        ));
        assert!(service.pending_requests().unwrap().is_empty());
    }

    #[test]
    fn test_queued_request_applies_on_process() {
        let service = service();
        let spec = VersionSpec::new("app", "1.0").with_resolved(DependencySpec::new("lib", "2.0"));
        service.create_or_update_version(&spec).unwrap();
        assert!(matches!(
            service.get_version(&spec.id()),
            Err(GraphError::NotFound { .. })
        ));

        let processed = service.process_next().unwrap().unwrap();
        assert_eq!(processed.id(), spec.id());
        assert!(service.process_next().unwrap().is_none());
        assert_eq!(service.get_version(&spec.id()).unwrap().resolved_dependencies.len(), 1);
    }

    #[test]
    fn test_dry_run_leaves_no_trace() {
        let service = service();
        let spec = VersionSpec::new("app", "1.0").with_resolved(DependencySpec::new("lib", "2.0"));
        let resolved = service.create_or_update_dry_run(&spec).unwrap();

        assert!(resolved.active);
        assert!(service.list_components().unwrap().is_empty());
    }

    #[test]
    fn test_component_lookup() {
        let service = service();
        service.create_or_update_component("app", Some("the app")).unwrap();
        assert_eq!(
            service.get_component("app").unwrap().description.as_deref(),
            Some("the app")
        );
        assert!(matches!(
            service.get_component("nope"),
            Err(GraphError::NotFound { kind: "component", .. })
        ));
    }
}
