//! Issues and their severity levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::VersionId;

/// Issue severity, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueLevel {
    Deprecation,
    Minor,
    Major,
    Critical,
}

impl IssueLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueLevel::Deprecation => "DEPRECATION",
            IssueLevel::Minor => "MINOR",
            IssueLevel::Major => "MAJOR",
            IssueLevel::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<IssueLevel> {
        match s {
            "DEPRECATION" => Some(IssueLevel::Deprecation),
            "MINOR" => Some(IssueLevel::Minor),
            "MAJOR" => Some(IssueLevel::Major),
            "CRITICAL" => Some(IssueLevel::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored issue.
///
/// `affects_version` is the first version known to exhibit the issue;
/// `fix_version`, when set, is the first version that no longer does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<IssueLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub affects_version: VersionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_version: Option<VersionId>,
}

/// Body of an issue create-or-update request. The id travels separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[serde(default)]
    pub level: Option<IssueLevel>,
    #[serde(default)]
    pub message: Option<String>,
    pub affects_version: VersionId,
    #[serde(default)]
    pub fix_version: Option<VersionId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_wire_format() {
        let json = serde_json::to_string(&IssueLevel::Deprecation).unwrap();
        assert_eq!(json, "\"DEPRECATION\"");
        let parsed: IssueLevel = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(parsed, IssueLevel::Critical);
        assert_eq!(IssueLevel::parse("MAJOR"), Some(IssueLevel::Major));
        assert_eq!(IssueLevel::parse("major"), None);
    }

    #[test]
    fn test_request_optional_fields_default() {
        let req: IssueRequest = serde_json::from_value(serde_json::json!({
            "affectsVersion": { "component": "c", "version": "1.0" }
        }))
        .unwrap();
        assert_eq!(req.level, None);
        assert_eq!(req.message, None);
        assert_eq!(req.fix_version, None);
        assert_eq!(req.affects_version, VersionId::new("c", "1.0"));
    }
}
