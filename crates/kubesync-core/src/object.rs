//! Schema-less API objects and their identities
//!
//! Every manifest is kept as a raw JSON document. Only the handful of fields the
//! engine needs (type, name, namespace, labels, annotations, owner references)
//! are read through typed accessors; everything else travels untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// A single resource manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApiObject {
    value: Value,
}

impl ApiObject {
    /// Wrap a JSON document, checking the fields every object must carry
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(map) = value.as_object() else {
            return Err(CoreError::InvalidObject {
                message: "object must be a mapping".to_string(),
            });
        };

        for field in ["apiVersion", "kind"] {
            let present = map
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(CoreError::InvalidObject {
                    message: format!("missing {}", field),
                });
            }
        }

        if let Some(metadata) = map.get("metadata")
            && !metadata.is_object()
        {
            return Err(CoreError::InvalidObject {
                message: "metadata must be a mapping".to_string(),
            });
        }

        let object = Self { value };
        if object.name().is_empty() {
            return Err(CoreError::InvalidObject {
                message: format!("{} is missing metadata.name", object.kind()),
            });
        }

        Ok(object)
    }

    /// Parse a single YAML (or JSON) document
    pub fn from_yaml(doc: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(doc)?;
        Self::from_value(value)
    }

    /// Borrow the raw document
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Consume into the raw document
    pub fn into_value(self) -> Value {
        self.value
    }

    fn str_field(&self, field: &str) -> &str {
        self.value.get(field).and_then(Value::as_str).unwrap_or("")
    }

    fn metadata(&self) -> Option<&Map<String, Value>> {
        self.value.get("metadata").and_then(Value::as_object)
    }

    pub fn api_version(&self) -> &str {
        self.str_field("apiVersion")
    }

    pub fn kind(&self) -> &str {
        self.str_field("kind")
    }

    /// API group, empty for the core group
    ///
    /// - "apps/v1" -> "apps"
    /// - "v1" -> ""
    pub fn group(&self) -> &str {
        self.api_version()
            .rsplit_once('/')
            .map(|(group, _)| group)
            .unwrap_or("")
    }

    /// API version without the group
    pub fn version(&self) -> &str {
        let api_version = self.api_version();
        api_version
            .rsplit_once('/')
            .map(|(_, version)| version)
            .unwrap_or(api_version)
    }

    pub fn name(&self) -> &str {
        self.metadata()
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Server-assigned identity, absent on manifests
    pub fn uid(&self) -> Option<&str> {
        self.metadata()
            .and_then(|m| m.get("uid"))
            .and_then(Value::as_str)
            .filter(|uid| !uid.is_empty())
    }

    /// Explicit namespace, if the manifest sets a non-empty one
    pub fn namespace(&self) -> Option<&str> {
        self.metadata()
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        if let Some(metadata) = self.metadata_mut() {
            metadata.insert(
                "namespace".to_string(),
                Value::String(namespace.to_string()),
            );
        }
    }

    fn string_map(&self, field: &str) -> BTreeMap<String, String> {
        self.metadata()
            .and_then(|m| m.get(field))
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map("annotations")
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map("labels")
    }

    /// Look up a single annotation without copying the map
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata()
            .and_then(|m| m.get("annotations"))
            .and_then(|a| a.get(key))
            .and_then(Value::as_str)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata()
            .and_then(|m| m.get("labels"))
            .and_then(|a| a.get(key))
            .and_then(Value::as_str)
    }

    pub fn set_annotation(&mut self, key: &str, value: &str) {
        if let Some(annotations) = self.metadata_child_mut("annotations") {
            annotations.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    pub fn set_label(&mut self, key: &str, value: &str) {
        if let Some(labels) = self.metadata_child_mut("labels") {
            labels.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    /// Whether an owner reference marks another object as this one's controller
    pub fn has_controller_owner(&self) -> bool {
        self.metadata()
            .and_then(|m| m.get("ownerReferences"))
            .and_then(Value::as_array)
            .is_some_and(|refs| {
                refs.iter()
                    .any(|r| r.get("controller").and_then(Value::as_bool) == Some(true))
            })
    }

    fn metadata_mut(&mut self) -> Option<&mut Map<String, Value>> {
        let metadata = self
            .value
            .as_object_mut()?
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        metadata.as_object_mut()
    }

    fn metadata_child_mut(&mut self, field: &str) -> Option<&mut Map<String, Value>> {
        let child = self
            .metadata_mut()?
            .entry(field)
            .or_insert_with(|| Value::Object(Map::new()));
        if child.is_null() {
            *child = Value::Object(Map::new());
        }
        child.as_object_mut()
    }

    /// Identity of this object as declared
    pub fn id(&self) -> ObjectId {
        ObjectId {
            group: self.group().to_string(),
            version: self.version().to_string(),
            kind: self.kind().to_string(),
            namespace: self.namespace().map(String::from),
            name: self.name().to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for ApiObject {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ApiObject::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ApiObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id().fmt(f)
    }
}

/// Identity of an object: (group, version, kind, namespace, name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectId {
    /// Same identity with the version dropped
    ///
    /// A server may list an object under its preferred version while the
    /// manifest declares another served version of the same group.
    pub fn unversioned(&self) -> ObjectId {
        ObjectId {
            version: String::new(),
            ..self.clone()
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}
