//! How domain entities map onto graph nodes and properties.
//!
//! | node                  | key parts            | properties                          |
//! |-----------------------|----------------------|-------------------------------------|
//! | `Component`           | name                 | created, description                |
//! | `Version`             | component, version   | created, shadow, matched            |
//! | `Issue`               | id                   | created, level, message             |
//! | `QueueCreateRequest`  | id                   | id, created, blob                   |
//! | `QueueLock`           | `head` / `tail`      | lockToken                           |
//!
//! DEPENDS_ON edges carry `profiles`; REQUESTS edges carry `profiles` and
//! `requestVersion`.

use std::collections::BTreeSet;

use serde_json::Value;
use vantage_core::VersionId;
use vantage_storage::{NodeKey, Properties};

pub const CREATED: &str = "created";
pub const DESCRIPTION: &str = "description";
pub const SHADOW: &str = "shadow";
pub const MATCHED: &str = "matched";
pub const PROFILES: &str = "profiles";
pub const REQUEST_VERSION: &str = "requestVersion";
pub const LEVEL: &str = "level";
pub const MESSAGE: &str = "message";
pub const ID: &str = "id";
pub const BLOB: &str = "blob";
pub const LOCK_TOKEN: &str = "lockToken";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn properties<const N: usize>(pairs: [(&str, Value); N]) -> Properties {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub fn version_key(id: &VersionId) -> NodeKey {
    NodeKey::version(&id.component, &id.version)
}

pub fn version_id(key: &NodeKey) -> VersionId {
    VersionId::new(key.part(0), key.part(1))
}

pub fn get_str(props: &Properties, name: &str) -> Option<String> {
    props.get(name).and_then(Value::as_str).map(str::to_string)
}

pub fn get_bool(props: &Properties, name: &str) -> bool {
    props.get(name).and_then(Value::as_bool).unwrap_or(false)
}

pub fn get_i64(props: &Properties, name: &str) -> i64 {
    props.get(name).and_then(Value::as_i64).unwrap_or(0)
}

pub fn get_profiles(props: &Properties) -> BTreeSet<String> {
    props
        .get(PROFILES)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn profiles_value(profiles: &BTreeSet<String>) -> Value {
    Value::Array(profiles.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_key_roundtrip() {
        let id = VersionId::new("app", "1.0");
        assert_eq!(version_id(&version_key(&id)), id);
    }

    #[test]
    fn test_profiles_read_back_sorted() {
        let profiles: BTreeSet<String> = ["test", "compile"].iter().map(|s| s.to_string()).collect();
        let props = properties([(PROFILES, profiles_value(&profiles))]);
        assert_eq!(props[PROFILES], json!(["compile", "test"]));
        assert_eq!(get_profiles(&props), profiles);
        assert!(get_profiles(&Properties::new()).is_empty());
    }
}
