//! Version-aware delete options
//!
//! Servers before 1.6 only understand `orphanDependents`; 1.6 introduced
//! `propagationPolicy`. The shape is chosen once per run from the resolved
//! server version instead of at every call site.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::version::ServerVersion;

/// Server-side cascading semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagationPolicy {
    Orphan,
    Background,
    Foreground,
}

impl PropagationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationPolicy::Orphan => "Orphan",
            PropagationPolicy::Background => "Background",
            PropagationPolicy::Foreground => "Foreground",
        }
    }
}

/// Cascading shape of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePropagation {
    /// Pre-1.6 servers
    Legacy { orphan_dependents: bool },
    /// 1.6 and later
    Modern { propagation_policy: PropagationPolicy },
}

/// Options sent with every delete of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    pub propagation: DeletePropagation,
    /// Overrides the server default when set
    pub grace_period_seconds: Option<i64>,
}

impl DeleteOptions {
    /// Build the options for a server version
    ///
    /// Dependents are always deleted: legacy servers get `orphanDependents=false`,
    /// newer ones Foreground propagation (Background deletion is not reliable).
    /// A negative grace period keeps the server default.
    pub fn for_version(version: ServerVersion, grace_period: i64) -> Self {
        let propagation = if version.at_least(1, 6) {
            DeletePropagation::Modern {
                propagation_policy: PropagationPolicy::Foreground,
            }
        } else {
            DeletePropagation::Legacy {
                orphan_dependents: false,
            }
        };

        Self {
            propagation,
            grace_period_seconds: (grace_period >= 0).then_some(grace_period),
        }
    }

    /// Wire form of a `meta/v1 DeleteOptions` body
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "kind": "DeleteOptions",
            "apiVersion": "v1",
        });

        match self.propagation {
            DeletePropagation::Legacy { orphan_dependents } => {
                body["orphanDependents"] = Value::Bool(orphan_dependents);
            }
            DeletePropagation::Modern { propagation_policy } => {
                body["propagationPolicy"] = Value::String(propagation_policy.as_str().to_string());
            }
        }

        if let Some(grace) = self.grace_period_seconds {
            body["gracePeriodSeconds"] = Value::from(grace);
        }

        body
    }
}
