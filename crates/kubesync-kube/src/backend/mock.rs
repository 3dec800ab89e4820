//! In-memory cluster for testing
//!
//! Serves a fixed set of kinds, keeps objects in memory and records every
//! transport call so tests can assert on the exact sequence of operations
//! without requiring a Kubernetes cluster.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kubesync_core::{ApiObject, DeleteOptions, GC_TAG_LABEL, GcTag, ObjectId};
use serde_json::Value;

use super::{Discovery, Endpoint, Location, ResourceLocator, Transport, VersionInfo};
use crate::error::{KubeError, Result};

/// A call observed by the mock cluster
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Get(ObjectId),
    Create(ObjectId),
    Update(ObjectId),
    Delete { id: ObjectId, options: DeleteOptions },
    ListTagged(String),
}

impl Operation {
    /// Whether the call changes cluster state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::Create(_) | Operation::Update(_) | Operation::Delete { .. }
        )
    }

    /// Short form used in test assertions, e.g. "create Namespace ns1"
    pub fn describe(&self) -> String {
        match self {
            Operation::Get(id) => format!("get {}", id),
            Operation::Create(id) => format!("create {}", id),
            Operation::Update(id) => format!("update {}", id),
            Operation::Delete { id, .. } => format!("delete {}", id),
            Operation::ListTagged(tag) => format!("list tag={}", tag),
        }
    }
}

struct MockState {
    endpoints: Vec<Endpoint>,
    /// Keyed by unversioned identity
    objects: BTreeMap<ObjectId, ApiObject>,
    operations: Vec<Operation>,
    version: Option<VersionInfo>,
    schemas: HashMap<(String, String, String), Value>,
    /// (verb, object name) -> error message
    failures: HashMap<(String, String), String>,
    /// kind -> apiVersion reported by `list_tagged`
    list_aliases: HashMap<String, String>,
    next_uid: u64,
}

/// In-memory cluster for testing
#[derive(Clone)]
pub struct MockCluster {
    state: Arc<RwLock<MockState>>,
}

impl MockCluster {
    /// Create an empty cluster serving the common built-in kinds at version 1.31
    pub fn new() -> Self {
        let endpoints = vec![
            Endpoint::new("apiextensions.k8s.io", "v1", "CustomResourceDefinition", "customresourcedefinitions", false),
            Endpoint::new("", "v1", "Namespace", "namespaces", false),
            Endpoint::new("", "v1", "ResourceQuota", "resourcequotas", true),
            Endpoint::new("rbac.authorization.k8s.io", "v1", "ClusterRole", "clusterroles", false),
            Endpoint::new("rbac.authorization.k8s.io", "v1", "ClusterRoleBinding", "clusterrolebindings", false),
            Endpoint::new("rbac.authorization.k8s.io", "v1", "Role", "roles", true),
            Endpoint::new("rbac.authorization.k8s.io", "v1", "RoleBinding", "rolebindings", true),
            Endpoint::new("", "v1", "ServiceAccount", "serviceaccounts", true),
            Endpoint::new("", "v1", "ConfigMap", "configmaps", true),
            Endpoint::new("", "v1", "Secret", "secrets", true),
            Endpoint::new("storage.k8s.io", "v1", "StorageClass", "storageclasses", false),
            Endpoint::new("", "v1", "PersistentVolumeClaim", "persistentvolumeclaims", true),
            Endpoint::new("", "v1", "Service", "services", true),
            Endpoint::new("networking.k8s.io", "v1", "Ingress", "ingresses", true),
            Endpoint::new("apps", "v1", "Deployment", "deployments", true),
            Endpoint::new("apps", "v1", "StatefulSet", "statefulsets", true),
            Endpoint::new("apps", "v1", "DaemonSet", "daemonsets", true),
            Endpoint::new("", "v1", "Pod", "pods", true),
            Endpoint::new("batch", "v1", "Job", "jobs", true),
            Endpoint::new("batch", "v1", "CronJob", "cronjobs", true),
            Endpoint::new("autoscaling", "v1", "HorizontalPodAutoscaler", "horizontalpodautoscalers", true),
            Endpoint::new("autoscaling", "v2", "HorizontalPodAutoscaler", "horizontalpodautoscalers", true),
        ];

        Self {
            state: Arc::new(RwLock::new(MockState {
                endpoints,
                objects: BTreeMap::new(),
                operations: Vec::new(),
                version: Some(VersionInfo {
                    major: "1".to_string(),
                    minor: "31".to_string(),
                    git_version: "v1.31.0".to_string(),
                }),
                schemas: HashMap::new(),
                failures: HashMap::new(),
                list_aliases: HashMap::new(),
                next_uid: 0,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve an additional kind
    pub fn with_endpoint(self, endpoint: Endpoint) -> Self {
        self.write().endpoints.push(endpoint);
        self
    }

    /// Report this version from discovery
    pub fn with_version(self, major: &str, minor: &str) -> Self {
        self.write().version = Some(VersionInfo {
            major: major.to_string(),
            minor: minor.to_string(),
            git_version: String::new(),
        });
        self
    }

    /// Make version discovery fail
    pub fn without_version(self) -> Self {
        self.write().version = None;
        self
    }

    /// Publish a schema for (apiVersion, kind)
    pub fn with_schema(self, api_version: &str, kind: &str, schema: Value) -> Self {
        let (group, version) = split_api_version(api_version);
        self.write()
            .schemas
            .insert((group.to_string(), version.to_string(), kind.to_string()), schema);
        self
    }

    /// Seed an object as if it already existed on the server
    pub fn with_object(self, obj: ApiObject) -> Self {
        self.insert(obj);
        self
    }

    /// Fail the given verb ("get", "create", "update", "delete") for an object name
    pub fn fail_on(self, verb: &str, name: &str, message: &str) -> Self {
        self.write()
            .failures
            .insert((verb.to_string(), name.to_string()), message.to_string());
        self
    }

    /// List objects of `kind` under another apiVersion, as a server serving
    /// the kind through several API groups may do
    pub fn listed_as(self, kind: &str, api_version: &str) -> Self {
        self.write()
            .list_aliases
            .insert(kind.to_string(), api_version.to_string());
        self
    }

    /// Store an object without recording an operation
    ///
    /// Objects without a uid get one assigned.
    pub fn insert(&self, obj: ApiObject) {
        let mut state = self.write();
        let key = match state.locate(&obj, "default") {
            Ok(location) => location.id_of(obj.name()).unversioned(),
            Err(_) => obj.id().unversioned(),
        };
        let obj = match obj.uid() {
            Some(_) => obj,
            None => {
                let uid = state.assign_uid();
                with_metadata(&obj, "uid", &uid)
            }
        };
        state.objects.insert(key, obj);
    }

    /// Look up a stored object
    pub fn object(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<ApiObject> {
        let (group, _) = split_api_version(api_version);
        let key = ObjectId {
            group: group.to_string(),
            version: String::new(),
            kind: kind.to_string(),
            namespace: namespace.map(String::from),
            name: name.to_string(),
        };
        self.read().objects.get(&key).cloned()
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.read().objects.len()
    }

    /// Every recorded call, in order
    pub fn operations(&self) -> Vec<Operation> {
        self.read().operations.clone()
    }

    /// Recorded creates, updates and deletes, in order
    pub fn mutations(&self) -> Vec<Operation> {
        self.read()
            .operations
            .iter()
            .filter(|op| op.is_mutation())
            .cloned()
            .collect()
    }

    /// Recorded mutations in their short form
    pub fn mutation_log(&self) -> Vec<String> {
        self.mutations().iter().map(Operation::describe).collect()
    }

    /// Forget recorded operations
    pub fn reset_operations(&self) {
        self.write().operations.clear();
    }
}

impl Default for MockCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    fn locate(&self, obj: &ApiObject, default_namespace: &str) -> Result<Location> {
        let endpoint = self
            .endpoints
            .iter()
            .find(|e| e.group == obj.group() && e.version == obj.version() && e.kind == obj.kind())
            .cloned()
            .ok_or_else(|| KubeError::NoResourceMapping {
                api_version: obj.api_version().to_string(),
                kind: obj.kind().to_string(),
            })?;
        Location::for_object(endpoint, obj, default_namespace)
    }

    fn assign_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("uid-{}", self.next_uid)
    }

    fn check_failure(&self, verb: &str, name: &str) -> Result<()> {
        match self.failures.get(&(verb.to_string(), name.to_string())) {
            Some(message) => Err(KubeError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

/// Copy of `obj` with one metadata field replaced
fn with_metadata(obj: &ApiObject, field: &str, value: &str) -> ApiObject {
    let mut raw = obj.as_value().clone();
    if let Some(metadata) = raw.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.insert(field.to_string(), Value::String(value.to_string()));
    }
    ApiObject::from_value(raw).unwrap_or_else(|_| obj.clone())
}

/// Copy of `obj` reported under another apiVersion
fn with_api_version(obj: &ApiObject, api_version: &str) -> ApiObject {
    let mut raw = obj.as_value().clone();
    raw["apiVersion"] = Value::String(api_version.to_string());
    ApiObject::from_value(raw).unwrap_or_else(|_| obj.clone())
}

fn split_api_version(api_version: &str) -> (&str, &str) {
    api_version.rsplit_once('/').unwrap_or(("", api_version))
}

impl ResourceLocator for MockCluster {
    fn locate(&self, obj: &ApiObject, default_namespace: &str) -> Result<Location> {
        self.read().locate(obj, default_namespace)
    }
}

#[async_trait]
impl Discovery for MockCluster {
    async fn server_version(&self) -> Result<VersionInfo> {
        self.read()
            .version
            .clone()
            .ok_or_else(|| KubeError::Transport("version endpoint unavailable".to_string()))
    }

    async fn schema_for(&self, obj: &ApiObject) -> Result<Option<Value>> {
        let key = (
            obj.group().to_string(),
            obj.version().to_string(),
            obj.kind().to_string(),
        );
        Ok(self.read().schemas.get(&key).cloned())
    }

    async fn list_tagged(&self, tag: &GcTag) -> Result<Vec<ApiObject>> {
        let mut state = self.write();
        state
            .operations
            .push(Operation::ListTagged(tag.as_str().to_string()));

        Ok(state
            .objects
            .values()
            .filter(|obj| obj.label(GC_TAG_LABEL) == Some(tag.as_str()))
            .map(|obj| match state.list_aliases.get(obj.kind()) {
                Some(api_version) => with_api_version(obj, api_version),
                None => obj.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl Transport for MockCluster {
    async fn get(&self, location: &Location, name: &str) -> Result<Option<ApiObject>> {
        let mut state = self.write();
        let id = location.id_of(name);
        state.operations.push(Operation::Get(id.clone()));
        state.check_failure("get", name)?;
        Ok(state.objects.get(&id.unversioned()).cloned())
    }

    async fn create(&self, location: &Location, obj: &ApiObject) -> Result<ApiObject> {
        let mut state = self.write();
        let id = location.id_of(obj.name());
        state.operations.push(Operation::Create(id.clone()));
        state.check_failure("create", obj.name())?;

        let key = id.unversioned();
        if state.objects.contains_key(&key) {
            return Err(KubeError::Transport(format!("{} already exists", id)));
        }
        let uid = state.assign_uid();
        let created = with_metadata(obj, "uid", &uid);
        state.objects.insert(key, created.clone());
        Ok(created)
    }

    async fn update(&self, location: &Location, obj: &ApiObject) -> Result<ApiObject> {
        let mut state = self.write();
        let id = location.id_of(obj.name());
        state.operations.push(Operation::Update(id.clone()));
        state.check_failure("update", obj.name())?;

        let key = id.unversioned();
        let Some(uid) = state
            .objects
            .get(&key)
            .map(|live| live.uid().unwrap_or_default().to_string())
        else {
            return Err(KubeError::NotFound {
                object: id.to_string(),
            });
        };
        let updated = with_metadata(obj, "uid", &uid);
        state.objects.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, location: &Location, name: &str, options: &DeleteOptions) -> Result<()> {
        let mut state = self.write();
        let id = location.id_of(name);
        state.operations.push(Operation::Delete {
            id: id.clone(),
            options: *options,
        });
        state.check_failure("delete", name)?;

        match state.objects.remove(&id.unversioned()) {
            Some(_) => Ok(()),
            None => Err(KubeError::NotFound {
                object: id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubesync_core::ServerVersion;
    use serde_json::json;

    fn config_map(name: &str) -> ApiObject {
        ApiObject::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": name, "namespace": "default"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let cluster = MockCluster::new();
        let obj = config_map("a");
        let location = cluster.locate(&obj, "default").unwrap();

        assert!(cluster.get(&location, "a").await.unwrap().is_none());
        cluster.create(&location, &obj).await.unwrap();
        assert!(cluster.get(&location, "a").await.unwrap().is_some());
        assert_eq!(cluster.object_count(), 1);

        let opts = DeleteOptions::for_version(ServerVersion::new(1, 31), -1);
        cluster.delete(&location, "a", &opts).await.unwrap();
        assert_eq!(cluster.object_count(), 0);

        let err = cluster.delete(&location, "a", &opts).await.unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(
            cluster.mutation_log(),
            vec![
                "create ConfigMap default/a",
                "delete ConfigMap default/a",
                "delete ConfigMap default/a"
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let cluster = MockCluster::new();
        let widget = ApiObject::from_value(json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w"}
        }))
        .unwrap();

        let err = cluster.locate(&widget, "default").unwrap_err();
        assert!(matches!(err, KubeError::NoResourceMapping { .. }));

        let cluster = cluster.with_endpoint(Endpoint::new("example.com", "v1", "Widget", "widgets", true));
        assert!(cluster.locate(&widget, "default").is_ok());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let cluster = MockCluster::new().fail_on("create", "a", "admission webhook denied");
        let obj = config_map("a");
        let location = cluster.locate(&obj, "default").unwrap();

        let err = cluster.create(&location, &obj).await.unwrap_err();
        assert!(err.to_string().contains("admission webhook denied"));
        assert_eq!(cluster.object_count(), 0);
    }

    #[tokio::test]
    async fn test_list_tagged_uses_label() {
        let tagged = ApiObject::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "t", "namespace": "default", "labels": {"kubesync.io/gc-tag": "r1"}}
        }))
        .unwrap();
        let cluster = MockCluster::new()
            .with_object(tagged)
            .with_object(config_map("untagged"));

        let tag = GcTag::parse("r1").unwrap().unwrap();
        let listed = cluster.list_tagged(&tag).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name(), "t");
    }

    #[tokio::test]
    async fn test_uid_kept_across_updates() {
        let cluster = MockCluster::new();
        let obj = config_map("a");
        let location = cluster.locate(&obj, "default").unwrap();

        let created = cluster.create(&location, &obj).await.unwrap();
        let uid = created.uid().unwrap().to_string();
        let updated = cluster.update(&location, &obj).await.unwrap();
        assert_eq!(updated.uid(), Some(uid.as_str()));
    }

    #[tokio::test]
    async fn test_listed_under_alias_group() {
        let mut ingress = ApiObject::from_value(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": {"name": "web", "namespace": "default"}
        }))
        .unwrap();
        let tag = GcTag::parse("r1").unwrap().unwrap();
        tag.stamp(&mut ingress);
        let cluster = MockCluster::new()
            .with_object(ingress)
            .listed_as("Ingress", "extensions/v1beta1");

        let listed = cluster.list_tagged(&tag).await.unwrap();
        assert_eq!(listed[0].api_version(), "extensions/v1beta1");
        assert!(listed[0].uid().is_some());
        assert!(
            cluster
                .object("networking.k8s.io/v1", "Ingress", Some("default"), "web")
                .is_some()
        );
    }
}
