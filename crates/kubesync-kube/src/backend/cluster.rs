//! Live cluster backend on kube-rs
//!
//! Kinds are resolved through API discovery, which is run once when the backend
//! is built. Updates use Server-Side Apply with a forced field manager so that
//! repeated runs converge on the manifests. Deletes are sent as raw requests
//! because `orphanDependents` is not expressible through `DeleteParams`.

use async_trait::async_trait;
use kube::{
    Client, Config, Resource,
    api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams},
    config::KubeConfigOptions,
    core::{GroupVersionKind, TypeMeta},
    discovery::{self, ApiCapabilities, ApiResource, Scope, verbs},
};
use kubesync_core::{ApiObject, DeleteOptions, GcTag};
use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::OnceCell;

use super::{Discovery, Endpoint, Location, ResourceLocator, Transport, VersionInfo};
use crate::error::{KubeError, Result};

/// Field manager name for Server-Side Apply
const FIELD_MANAGER: &str = "kubesync";

/// Path of the aggregated OpenAPI v2 document
const OPENAPI_PATH: &str = "/openapi/v2";

/// Definitions whose wire form may be a number or a string
const LOOSE_STRING_DEFINITIONS: &[&str] = &[
    "io.k8s.apimachinery.pkg.api.resource.Quantity",
    "io.k8s.apimachinery.pkg.util.intstr.IntOrString",
];

/// Backend talking to a live cluster
pub struct KubeBackend {
    client: Client,
    discovery: discovery::Discovery,
    /// Normalized OpenAPI definitions, fetched on first schema lookup
    definitions: OnceCell<serde_json::Map<String, Value>>,
}

impl KubeBackend {
    /// Build a backend from an existing client, running API discovery
    pub async fn new(client: Client) -> Result<Self> {
        let discovery = discovery::Discovery::new(client.clone())
            .run()
            .await
            .map_err(KubeError::Api)?;

        Ok(Self {
            client,
            discovery,
            definitions: OnceCell::new(),
        })
    }

    /// Build a backend from the local kubeconfig
    ///
    /// `context` selects a kubeconfig context, the current one is used otherwise.
    /// In-cluster configuration is picked up when no kubeconfig is present.
    pub async fn from_context(context: Option<&str>) -> Result<Self> {
        let client = match context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.to_string()),
                    ..Default::default()
                };
                let config = Config::from_kubeconfig(&options)
                    .await
                    .map_err(|e| KubeError::InvalidConfig(e.to_string()))?;
                Client::try_from(config)?
            }
            None => Client::try_default().await?,
        };

        tracing::debug!(context = ?context, "connected to cluster");
        Self::new(client).await
    }

    fn resolve(&self, api_version: &str, kind: &str) -> Option<(ApiResource, ApiCapabilities)> {
        let gvk = gvk_from_type_meta(&TypeMeta {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
        });
        self.discovery.resolve_gvk(&gvk)
    }

    fn api_for(&self, location: &Location) -> Api<DynamicObject> {
        let resource = api_resource(&location.endpoint);
        match &location.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }

    async fn definitions(&self) -> Result<&serde_json::Map<String, Value>> {
        self.definitions
            .get_or_try_init(|| async {
                let request = http::Request::get(OPENAPI_PATH)
                    .body(Vec::new())
                    .map_err(|e| KubeError::Transport(e.to_string()))?;
                let document: Value = self.client.request(request).await?;

                let mut definitions = match document.get("definitions") {
                    Some(Value::Object(defs)) => defs.clone(),
                    _ => serde_json::Map::new(),
                };
                for (name, definition) in definitions.iter_mut() {
                    normalize_definition(name, definition);
                }

                tracing::debug!(count = definitions.len(), "loaded OpenAPI definitions");
                Ok::<_, KubeError>(definitions)
            })
            .await
    }
}

impl ResourceLocator for KubeBackend {
    fn locate(&self, obj: &ApiObject, default_namespace: &str) -> Result<Location> {
        let (resource, capabilities) =
            self.resolve(obj.api_version(), obj.kind())
                .ok_or_else(|| KubeError::NoResourceMapping {
                    api_version: obj.api_version().to_string(),
                    kind: obj.kind().to_string(),
                })?;

        let endpoint = Endpoint {
            group: resource.group,
            version: resource.version,
            kind: resource.kind,
            plural: resource.plural,
            namespaced: capabilities.scope == Scope::Namespaced,
        };
        Location::for_object(endpoint, obj, default_namespace)
    }
}

#[async_trait]
impl Discovery for KubeBackend {
    async fn server_version(&self) -> Result<VersionInfo> {
        let info = self.client.apiserver_version().await?;
        Ok(VersionInfo {
            major: info.major,
            minor: info.minor,
            git_version: info.git_version,
        })
    }

    async fn schema_for(&self, obj: &ApiObject) -> Result<Option<Value>> {
        let definitions = self.definitions().await?;
        let Some(name) = find_definition(definitions, obj.group(), obj.version(), obj.kind())
        else {
            return Ok(None);
        };

        Ok(Some(serde_json::json!({
            "definitions": definitions,
            "$ref": format!("#/definitions/{}", name),
        })))
    }

    async fn list_tagged(&self, tag: &GcTag) -> Result<Vec<ApiObject>> {
        let params = ListParams::default().labels(&tag.label_selector());
        let mut seen = HashSet::new();
        let mut objects = Vec::new();

        for group in self.discovery.groups() {
            for (resource, capabilities) in group.recommended_resources() {
                if !capabilities.supports_operation(verbs::LIST) {
                    continue;
                }

                let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
                let list = match api.list(&params).await {
                    Ok(list) => list,
                    // Listing may be forbidden for some kinds; they cannot be ours
                    Err(kube::Error::Api(resp)) if resp.code == 403 || resp.code == 405 => {
                        tracing::debug!(resource = %resource.plural, code = resp.code, "skipping unlistable resource");
                        continue;
                    }
                    Err(e) => return Err(KubeError::Api(e)),
                };

                for mut item in list.items {
                    // The same object can be served by several groups (e.g. events)
                    if let Some(uid) = item.metadata.uid.clone()
                        && !seen.insert(uid)
                    {
                        continue;
                    }

                    item.types = Some(TypeMeta {
                        api_version: resource.api_version.clone(),
                        kind: resource.kind.clone(),
                    });
                    objects.push(ApiObject::from_value(serde_json::to_value(&item)?)?);
                }
            }
        }

        Ok(objects)
    }
}

#[async_trait]
impl Transport for KubeBackend {
    async fn get(&self, location: &Location, name: &str) -> Result<Option<ApiObject>> {
        let api = self.api_for(location);
        match api.get_opt(name).await? {
            Some(mut live) => {
                if live.types.is_none() {
                    live.types = Some(TypeMeta {
                        api_version: location.endpoint.api_version(),
                        kind: location.endpoint.kind.clone(),
                    });
                }
                Ok(Some(ApiObject::from_value(serde_json::to_value(&live)?)?))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, location: &Location, obj: &ApiObject) -> Result<ApiObject> {
        let api = self.api_for(location);
        let desired: DynamicObject = serde_json::from_value(obj.as_value().clone())?;
        let created = api.create(&PostParams::default(), &desired).await?;
        Ok(ApiObject::from_value(serde_json::to_value(&created)?)?)
    }

    async fn update(&self, location: &Location, obj: &ApiObject) -> Result<ApiObject> {
        let api = self.api_for(location);
        let desired: DynamicObject = serde_json::from_value(obj.as_value().clone())?;

        let mut params = PatchParams::apply(FIELD_MANAGER);
        params.force = true;

        let updated = api
            .patch(obj.name(), &params, &Patch::Apply(&desired))
            .await?;
        Ok(ApiObject::from_value(serde_json::to_value(&updated)?)?)
    }

    async fn delete(&self, location: &Location, name: &str, options: &DeleteOptions) -> Result<()> {
        let resource = api_resource(&location.endpoint);
        let url = format!(
            "{}/{}",
            DynamicObject::url_path(&resource, location.namespace.as_deref()),
            name
        );
        let body = serde_json::to_vec(&options.to_body())?;
        let request = http::Request::delete(url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body)
            .map_err(|e| KubeError::Transport(e.to_string()))?;

        match self.client.request_text(request).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Err(KubeError::NotFound {
                object: location.id_of(name).to_string(),
            }),
            Err(e) => Err(KubeError::Api(e)),
        }
    }
}

fn api_resource(endpoint: &Endpoint) -> ApiResource {
    ApiResource {
        group: endpoint.group.clone(),
        version: endpoint.version.clone(),
        api_version: endpoint.api_version(),
        kind: endpoint.kind.clone(),
        plural: endpoint.plural.clone(),
    }
}

/// Convert TypeMeta to GroupVersionKind
///
/// - "apps/v1" -> group="apps", version="v1"
/// - "v1" -> group="", version="v1" (core API)
fn gvk_from_type_meta(tm: &TypeMeta) -> GroupVersionKind {
    let (group, version) = match tm.api_version.rsplit_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), tm.api_version.clone()),
    };

    GroupVersionKind {
        group,
        version,
        kind: tm.kind.clone(),
    }
}

/// Find the definition tagged with a (group, version, kind)
fn find_definition<'a>(
    definitions: &'a serde_json::Map<String, Value>,
    group: &str,
    version: &str,
    kind: &str,
) -> Option<&'a str> {
    definitions.iter().find_map(|(name, definition)| {
        let gvks = definition
            .get("x-kubernetes-group-version-kind")
            .and_then(Value::as_array)?;
        gvks.iter()
            .any(|gvk| {
                gvk.get("group").and_then(Value::as_str).unwrap_or("") == group
                    && gvk.get("version").and_then(Value::as_str) == Some(version)
                    && gvk.get("kind").and_then(Value::as_str) == Some(kind)
            })
            .then_some(name.as_str())
    })
}

/// Relax string types that also accept numbers on the wire
fn normalize_definition(name: &str, definition: &mut Value) {
    if LOOSE_STRING_DEFINITIONS.contains(&name) {
        if let Value::Object(map) = definition {
            map.remove("type");
        }
        return;
    }
    relax_int_or_string(definition);
}

fn relax_int_or_string(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let loose = map.get("format").and_then(Value::as_str) == Some("int-or-string")
                || map.get("x-kubernetes-int-or-string").and_then(Value::as_bool) == Some(true);
            if loose {
                map.remove("type");
            }
            for child in map.values_mut() {
                relax_int_or_string(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(relax_int_or_string),
        _ => {}
    }
}
