//! Garbage collection tags
//!
//! A run marks every object it writes with its tag, both as an annotation (the
//! authoritative marker) and as a label (so the server can select tagged objects).
//! A later run with the same tag deletes tagged objects it no longer declares.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::object::ApiObject;

/// Annotation carrying the tag of the run that manages an object
pub const GC_TAG_ANNOTATION: &str = "kubesync.io/gc-tag";

/// Label mirroring [`GC_TAG_ANNOTATION`] for server-side selection
pub const GC_TAG_LABEL: &str = "kubesync.io/gc-tag";

/// Annotation opting an object out of garbage collection
pub const GC_STRATEGY_ANNOTATION: &str = "kubesync.io/gc-strategy";

/// Label values: at most 63 characters, alphanumeric at both ends
static LABEL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?)?$").expect("valid regex")
});

/// Marker identifying the objects managed by one logical run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GcTag(String);

impl GcTag {
    /// Build a tag, `Ok(None)` when tagging is disabled (empty string)
    pub fn parse(tag: &str) -> Result<Option<Self>> {
        if tag.is_empty() {
            return Ok(None);
        }
        if tag.len() > 63 || !LABEL_VALUE.is_match(tag) {
            return Err(CoreError::InvalidObject {
                message: format!(
                    "gc tag '{}' must be a valid label value (63 characters max, alphanumeric, '-', '_' or '.')",
                    tag
                ),
            });
        }
        Ok(Some(Self(tag.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Record the tag on an object about to be written
    pub fn stamp(&self, obj: &mut ApiObject) {
        obj.set_annotation(GC_TAG_ANNOTATION, &self.0);
        obj.set_label(GC_TAG_LABEL, &self.0);
    }

    /// Whether the object's annotation carries exactly this tag
    pub fn is_carried_by(&self, obj: &ApiObject) -> bool {
        obj.annotation(GC_TAG_ANNOTATION) == Some(self.0.as_str())
    }

    /// Label selector matching objects stamped with this tag
    pub fn label_selector(&self) -> String {
        format!("{}={}", GC_TAG_LABEL, self.0)
    }
}

impl TryFrom<String> for GcTag {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        GcTag::parse(&value)?.ok_or_else(|| CoreError::InvalidObject {
            message: "gc tag must not be empty".to_string(),
        })
    }
}

impl From<GcTag> for String {
    fn from(tag: GcTag) -> Self {
        tag.0
    }
}

impl fmt::Display for GcTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-object garbage collection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcStrategy {
    /// Delete when tagged and no longer declared (default)
    Auto,
    /// Never garbage collect
    Ignore,
}

impl GcStrategy {
    /// Read the strategy annotation; only "ignore" keeps the object
    pub fn of(obj: &ApiObject) -> Self {
        match obj.annotation(GC_STRATEGY_ANNOTATION) {
            Some("ignore") => Self::Ignore,
            _ => Self::Auto,
        }
    }
}

/// Whether a server object may be garbage collected by a run using `tag`
///
/// Objects managed by a controller are left to their controller.
pub fn eligible_for_gc(obj: &ApiObject, tag: &GcTag) -> bool {
    if obj.has_controller_owner() {
        return false;
    }
    tag.is_carried_by(obj) && GcStrategy::of(obj) == GcStrategy::Auto
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(annotations: serde_json::Value) -> ApiObject {
        ApiObject::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "cm", "namespace": "default", "annotations": annotations}
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_empty_disables() {
        assert!(GcTag::parse("").unwrap().is_none());
        assert_eq!(GcTag::parse("run1").unwrap().unwrap().as_str(), "run1");
    }

    #[test]
    fn test_parse_rejects_invalid_label_values() {
        assert!(GcTag::parse("has space").is_err());
        assert!(GcTag::parse("-leading").is_err());
        assert!(GcTag::parse(&"x".repeat(64)).is_err());
        assert!(GcTag::parse("prod.v2_blue-green").is_ok());
    }

    #[test]
    fn test_stamp() {
        let tag = GcTag::parse("run1").unwrap().unwrap();
        let mut obj = object(json!({}));
        tag.stamp(&mut obj);

        assert_eq!(obj.annotation(GC_TAG_ANNOTATION), Some("run1"));
        assert_eq!(obj.label(GC_TAG_LABEL), Some("run1"));
        assert!(tag.is_carried_by(&obj));
        assert_eq!(tag.label_selector(), "kubesync.io/gc-tag=run1");
    }

    #[test]
    fn test_eligibility() {
        let tag = GcTag::parse("r1").unwrap().unwrap();

        assert!(eligible_for_gc(&object(json!({"kubesync.io/gc-tag": "r1"})), &tag));
        assert!(!eligible_for_gc(&object(json!({"kubesync.io/gc-tag": "r2"})), &tag));
        assert!(!eligible_for_gc(&object(json!({})), &tag));
        assert!(!eligible_for_gc(
            &object(json!({"kubesync.io/gc-tag": "r1", "kubesync.io/gc-strategy": "ignore"})),
            &tag
        ));
        assert!(eligible_for_gc(
            &object(json!({"kubesync.io/gc-tag": "r1", "kubesync.io/gc-strategy": "auto"})),
            &tag
        ));
    }

    #[test]
    fn test_unrecognised_strategy_is_auto() {
        let tag = GcTag::parse("r1").unwrap().unwrap();
        let obj = object(json!({"kubesync.io/gc-tag": "r1", "kubesync.io/gc-strategy": "keep"}));

        assert_eq!(GcStrategy::of(&obj), GcStrategy::Auto);
        assert!(eligible_for_gc(&obj, &tag));
    }

    #[test]
    fn test_controller_owned_not_eligible() {
        let tag = GcTag::parse("r1").unwrap().unwrap();
        let obj = ApiObject::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "web-1",
                "annotations": {"kubesync.io/gc-tag": "r1"},
                "ownerReferences": [{"kind": "ReplicaSet", "name": "web", "controller": true}]
            }
        }))
        .unwrap();
        assert!(!eligible_for_gc(&obj, &tag));
    }

    #[test]
    fn test_serde() {
        let tag: GcTag = serde_json::from_value(json!("run1")).unwrap();
        assert_eq!(tag.as_str(), "run1");
        assert!(serde_json::from_value::<GcTag>(json!("")).is_err());
    }
}
