//! Schema validation against server-published schemas
//!
//! Runs before any write. The first violation stops validation.

use std::collections::HashMap;

use kubesync_core::ApiObject;
use serde_json::Value;

use crate::backend::Discovery;
use crate::context::RunContext;
use crate::error::{KubeError, Result};
use crate::progress::{Action, Phase, ProgressRecord};

/// Validates objects against the schemas the server publishes
pub struct SchemaValidator<'a> {
    discovery: &'a dyn Discovery,
    ignore_unknown: bool,
    /// Compiled schemas by (group, version, kind), `None` when unpublished
    compiled: HashMap<(String, String, String), Option<jsonschema::Validator>>,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(discovery: &'a dyn Discovery) -> Self {
        Self {
            discovery,
            ignore_unknown: false,
            compiled: HashMap::new(),
        }
    }

    /// Tolerate kinds without a published schema
    pub fn ignore_unknown(mut self, ignore: bool) -> Self {
        self.ignore_unknown = ignore;
        self
    }

    /// Validate objects in input order, failing on the first violation
    pub async fn validate(&mut self, ctx: &RunContext, objects: &[ApiObject]) -> Result<()> {
        for obj in objects {
            ctx.check_cancelled()?;
            let action = self.validate_one(ctx, obj).await?;
            ctx.record(ProgressRecord::new(Phase::Validate, action, obj.id(), false));
        }
        Ok(())
    }

    async fn validate_one(&mut self, ctx: &RunContext, obj: &ApiObject) -> Result<Action> {
        let key = (
            obj.group().to_string(),
            obj.version().to_string(),
            obj.kind().to_string(),
        );

        if !self.compiled.contains_key(&key) {
            let schema = ctx
                .guard(self.discovery.schema_for(obj))
                .await
                .map_err(|e| e.during("fetching schema for", &obj.id()))?;
            let compiled = match schema {
                Some(schema) => Some(jsonschema::validator_for(&schema).map_err(|e| {
                    KubeError::SchemaValidation {
                        object: obj.id().to_string(),
                        reason: format!("unusable schema: {}", e),
                    }
                })?),
                None => None,
            };
            self.compiled.insert(key.clone(), compiled);
        }

        let Some(validator) = self.compiled.get(&key).and_then(Option::as_ref) else {
            if self.ignore_unknown {
                tracing::warn!(object = %obj.id(), "no schema found, skipping validation");
                return Ok(Action::Unchecked);
            }
            return Err(KubeError::SchemaNotFound {
                api_version: obj.api_version().to_string(),
                kind: obj.kind().to_string(),
            });
        };

        let instance = without_nulls(obj.as_value());
        if let Some(error) = validator.iter_errors(&instance).next() {
            let path = error.instance_path.to_string();
            let path = if path.is_empty() { "(root)".to_string() } else { path };
            return Err(KubeError::SchemaValidation {
                object: obj.id().to_string(),
                reason: format!("{}: {}", path, error.to_string().replace('"', "'")),
            });
        }

        tracing::debug!(object = %obj.id(), "validated");
        Ok(Action::Validated)
    }
}

/// Copy of a document with null map entries removed
///
/// Empty YAML values parse as null and are treated by the server as unset.
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}
