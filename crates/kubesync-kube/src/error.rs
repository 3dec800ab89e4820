//! Error types for kubesync-kube

use kubesync_core::ObjectId;
use thiserror::Error;

/// Result type for kubesync-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while reconciling against a cluster
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Transport failure not reported by the API server itself
    #[error("transport error: {0}")]
    Transport(String),

    /// Target object does not exist
    #[error("{object} not found")]
    NotFound { object: String },

    /// The server does not serve this kind
    #[error("no resource mapping for {kind} in {api_version}\nHint: is the CustomResourceDefinition installed?")]
    NoResourceMapping { api_version: String, kind: String },

    /// A namespaced object without namespace and no default to fall back on
    #[error("{object} is namespaced but has no namespace and no default namespace is set")]
    NoNamespace { object: String },

    /// No schema published for a kind
    #[error("no schema found for {kind} in {api_version}\nHint: use --ignore-unknown to skip validation of unknown kinds")]
    SchemaNotFound { api_version: String, kind: String },

    /// Object does not match its schema
    #[error("{object} failed validation: {reason}")]
    SchemaValidation { object: String, reason: String },

    /// Object is missing on the server and creation is disabled
    #[error("{object} does not exist and creation is disabled\nHint: rerun with --create")]
    CreateDisabled { object: String },

    /// A write or read failed for one object
    #[error("error {action} {object}: {source}")]
    Operation {
        action: &'static str,
        object: String,
        #[source]
        source: Box<KubeError>,
    },

    /// Run was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Core error (manifests, versions, tags)
    #[error(transparent)]
    Core(#[from] kubesync_core::CoreError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::NotFound { .. } => true,
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            KubeError::Operation { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 409,
            KubeError::Operation { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            KubeError::Cancelled => true,
            KubeError::Operation { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Attach the action and object a transport failure belongs to
    ///
    /// Cancellation passes through untouched so callers can still tell it apart.
    pub fn during(self, action: &'static str, object: &ObjectId) -> Self {
        match self {
            KubeError::Cancelled => KubeError::Cancelled,
            other => KubeError::Operation {
                action,
                object: object.to_string(),
                source: Box::new(other),
            },
        }
    }
}
