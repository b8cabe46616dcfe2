//! Version identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `(component, version)` pair, the unique key of a version node.
///
/// Field order matters: the derived `Ord` sorts by component first, which is
/// the same primary key the global version ordering uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionId {
    pub component: String,
    pub version: String,
}

impl VersionId {
    pub fn new(component: impl Into<String>, version: impl Into<String>) -> Self {
        VersionId {
            component: component.into(),
            version: version.into(),
        }
    }

    /// Returns a copy of this id pointing at a different version of the same
    /// component.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        VersionId {
            component: self.component.clone(),
            version: version.into(),
        }
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.component, self.version)
    }
}
