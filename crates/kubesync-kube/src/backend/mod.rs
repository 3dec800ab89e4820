//! Cluster backends
//!
//! The engine talks to the control plane only through three collaborator traits:
//! - **ResourceLocator**: maps an object to its REST endpoint and namespace
//! - **Discovery**: server version, schemas and tagged-object enumeration
//! - **Transport**: single-object verbs (get, create, update, delete)
//!
//! Two implementations are provided:
//! - [`KubeBackend`]: a live cluster through kube-rs
//! - [`MockCluster`]: an in-memory cluster for tests and dry experiments

mod cluster;
mod mock;

pub use cluster::KubeBackend;
pub use mock::{MockCluster, Operation};

use async_trait::async_trait;
use kubesync_core::{ApiObject, DeleteOptions, GcTag, ObjectId};
use serde_json::Value;

use crate::error::{KubeError, Result};

/// REST endpoint serving one kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Plural resource name used in URLs
    pub plural: String,
    pub namespaced: bool,
}

impl Endpoint {
    pub fn new(group: &str, version: &str, kind: &str, plural: &str, namespaced: bool) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural: plural.to_string(),
            namespaced,
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Qualified resource name, e.g. "deployments.apps" or "configmaps"
    pub fn resource_name(&self) -> String {
        if self.group.is_empty() {
            self.plural.clone()
        } else {
            format!("{}.{}", self.plural, self.group)
        }
    }
}

/// Resolved endpoint and effective namespace of one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub endpoint: Endpoint,
    /// `None` for cluster-scoped kinds
    pub namespace: Option<String>,
}

impl Location {
    /// Place an object on an endpoint, applying the default namespace
    ///
    /// A namespace set on a cluster-scoped object is ignored.
    pub fn for_object(endpoint: Endpoint, obj: &ApiObject, default_namespace: &str) -> Result<Self> {
        let namespace = if endpoint.namespaced {
            match obj.namespace() {
                Some(ns) => Some(ns.to_string()),
                None if !default_namespace.is_empty() => Some(default_namespace.to_string()),
                None => {
                    return Err(KubeError::NoNamespace {
                        object: obj.id().to_string(),
                    });
                }
            }
        } else {
            None
        };

        Ok(Self {
            endpoint,
            namespace,
        })
    }

    /// Identity of `name` at this location
    pub fn id_of(&self, name: &str) -> ObjectId {
        ObjectId {
            group: self.endpoint.group.clone(),
            version: self.endpoint.version.clone(),
            kind: self.endpoint.kind.clone(),
            namespace: self.namespace.clone(),
            name: name.to_string(),
        }
    }
}

/// Version information as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub major: String,
    pub minor: String,
    pub git_version: String,
}

/// Maps objects to REST endpoints
pub trait ResourceLocator: Send + Sync {
    /// Resolve the endpoint and namespace of an object
    ///
    /// Fails with [`KubeError::NoResourceMapping`] for kinds the server does not
    /// serve and [`KubeError::NoNamespace`] when a namespaced object has no
    /// namespace to use.
    fn locate(&self, obj: &ApiObject, default_namespace: &str) -> Result<Location>;
}

/// Read-only knowledge about the server
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Version reported by the server
    async fn server_version(&self) -> Result<VersionInfo>;

    /// JSON schema for the object's (group, version, kind), `None` if unpublished
    async fn schema_for(&self, obj: &ApiObject) -> Result<Option<Value>>;

    /// Every listable object labelled with the tag, across all kinds
    async fn list_tagged(&self, tag: &GcTag) -> Result<Vec<ApiObject>>;
}

/// Single-object verbs
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the live object, `None` if it does not exist
    async fn get(&self, location: &Location, name: &str) -> Result<Option<ApiObject>>;

    async fn create(&self, location: &Location, obj: &ApiObject) -> Result<ApiObject>;

    async fn update(&self, location: &Location, obj: &ApiObject) -> Result<ApiObject>;

    /// Delete an object; a missing object is reported as [`KubeError::NotFound`]
    async fn delete(&self, location: &Location, name: &str, options: &DeleteOptions) -> Result<()>;
}

/// Everything the engine needs from a cluster
pub trait Backend: ResourceLocator + Discovery + Transport {}

impl<T: ResourceLocator + Discovery + Transport> Backend for T {}
