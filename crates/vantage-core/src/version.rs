//! Version requests and resolved views.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::VersionId;
use crate::issue::Issue;

/// A version as described by a client: its identity plus the dependencies
/// an external build step resolved and requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSpec {
    pub component: String,
    pub version: String,
    #[serde(default)]
    pub resolved_dependencies: Vec<DependencySpec>,
    #[serde(default)]
    pub requested_dependencies: Vec<DependencySpec>,
}

impl VersionSpec {
    pub fn new(component: impl Into<String>, version: impl Into<String>) -> Self {
        VersionSpec {
            component: component.into(),
            version: version.into(),
            resolved_dependencies: Vec::new(),
            requested_dependencies: Vec::new(),
        }
    }

    pub fn id(&self) -> VersionId {
        VersionId::new(self.component.clone(), self.version.clone())
    }

    pub fn with_resolved(mut self, dependency: DependencySpec) -> Self {
        self.resolved_dependencies.push(dependency);
        self
    }

    pub fn with_requested(mut self, dependency: DependencySpec) -> Self {
        self.requested_dependencies.push(dependency);
        self
    }
}

/// A dependency edge in a request. The nested version may carry its own
/// requested dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
    pub version: VersionSpec,
    #[serde(default)]
    pub profiles: BTreeSet<String>,
}

impl DependencySpec {
    pub fn new(component: impl Into<String>, version: impl Into<String>) -> Self {
        DependencySpec {
            version: VersionSpec::new(component, version),
            profiles: BTreeSet::new(),
        }
    }

    /// A dependency on a fully described version, nested requests included.
    pub fn on(version: VersionSpec) -> Self {
        DependencySpec {
            version,
            profiles: BTreeSet::new(),
        }
    }

    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> VersionId {
        self.version.id()
    }
}

/// A create-or-update-version request as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionRequest {
    #[serde(flatten)]
    pub version: VersionSpec,
    #[serde(default)]
    pub dry_run: bool,
}

/// The version half of a [`DependencyView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub component: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_issues: Vec<Issue>,
}

/// A dependency or dependent as seen from a resolved version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyView {
    pub version: VersionSummary,
    #[serde(default)]
    pub profiles: BTreeSet<String>,
    /// Literal version string originally requested (REQUESTS edges only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_version: Option<String>,
}

/// A version with everything derived from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVersion {
    pub component: String,
    pub version: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolved_dependencies: Vec<DependencyView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_dependencies: Vec<DependencyView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<DependencyView>,
    #[serde(default)]
    pub direct_issues: Vec<Issue>,
    #[serde(default)]
    pub transitive_issues: Vec<Issue>,
}

impl ResolvedVersion {
    pub fn id(&self) -> VersionId {
        VersionId::new(self.component.clone(), self.version.clone())
    }
}

/// A component with its newest real version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_recent_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_parses_nested_dependencies() {
        let req: CreateVersionRequest = serde_json::from_value(json!({
            "component": "app",
            "version": "1.0",
            "dryRun": true,
            "resolvedDependencies": [{
                "version": {
                    "component": "lib",
                    "version": "2.0",
                    "requestedDependencies": [
                        { "version": { "component": "util", "version": "latest" } }
                    ]
                },
                "profiles": ["compile", "test"]
            }]
        }))
        .unwrap();

        assert!(req.dry_run);
        assert_eq!(req.version.id(), VersionId::new("app", "1.0"));
        let dep = &req.version.resolved_dependencies[0];
        assert_eq!(dep.id(), VersionId::new("lib", "2.0"));
        assert_eq!(dep.profiles.len(), 2);
        assert_eq!(
            dep.version.requested_dependencies[0].id(),
            VersionId::new("util", "latest")
        );
        assert!(req.version.requested_dependencies.is_empty());
    }

    #[test]
    fn test_dry_run_defaults_to_false() {
        let req: CreateVersionRequest =
            serde_json::from_value(json!({ "component": "app", "version": "1.0" })).unwrap();
        assert!(!req.dry_run);
    }

    #[test]
    fn test_resolved_version_skips_empty_dependency_lists() {
        let resolved = ResolvedVersion {
            component: "app".into(),
            version: "1.0".into(),
            active: true,
            resolved_dependencies: vec![],
            requested_dependencies: vec![],
            dependents: vec![],
            direct_issues: vec![],
            transitive_issues: vec![],
        };
        let value = serde_json::to_value(&resolved).unwrap();
        assert_eq!(
            value,
            json!({
                "component": "app",
                "version": "1.0",
                "active": true,
                "directIssues": [],
                "transitiveIssues": []
            })
        );
    }
}
