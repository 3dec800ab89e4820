//! Kind registry: creation precedence and scope of well-known kinds
//!
//! Ordering is driven only by the kind, never by references between objects.
//! Container-like kinds (CRDs, namespaces) and other cluster-scoped kinds rank first so that everything that
//! lives inside them can be created afterwards, and deleted before them.

use serde::{Deserialize, Serialize};

/// Creation precedence of a kind; lower ranks are created first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KindRank {
    /// CustomResourceDefinition - installed first
    Crd = 0,
    /// Namespace - created before namespace-scoped resources
    Namespace = 1,
    /// ResourceQuota, LimitRange, PodSecurityPolicy
    NamespaceConfig = 2,
    /// Other cluster-scoped kinds, e.g. PriorityClass or RuntimeClass
    ClusterScoped = 5,
    /// ClusterRole, ClusterRoleBinding
    ClusterRbac = 10,
    /// Role, RoleBinding, ServiceAccount
    NamespacedRbac = 11,
    /// ConfigMap, Secret
    Config = 20,
    /// StorageClass, PersistentVolume, PersistentVolumeClaim
    Storage = 21,
    /// NetworkPolicy, Service, Endpoints, Ingress
    Network = 30,
    /// Deployment, StatefulSet, DaemonSet, ReplicaSet, Pod
    Workload = 40,
    /// Job, CronJob
    Batch = 50,
    /// HorizontalPodAutoscaler, VerticalPodAutoscaler, PodDisruptionBudget
    Autoscaling = 60,
    /// Custom resources (non-core API groups)
    CustomResource = 70,
    /// Everything else
    Other = 100,
}

/// API groups served by Kubernetes itself
const CORE_GROUPS: &[&str] = &[
    "",
    "apps",
    "batch",
    "autoscaling",
    "policy",
    "extensions",
    "networking.k8s.io",
    "rbac.authorization.k8s.io",
    "storage.k8s.io",
    "admissionregistration.k8s.io",
    "apiextensions.k8s.io",
    "apiregistration.k8s.io",
    "certificates.k8s.io",
    "coordination.k8s.io",
    "discovery.k8s.io",
    "events.k8s.io",
    "flowcontrol.apiserver.k8s.io",
    "node.k8s.io",
    "scheduling.k8s.io",
];

impl KindRank {
    /// Rank from the fixed table only, `None` for kinds it does not list
    pub fn of_known_kind(kind: &str) -> Option<Self> {
        let rank = match kind {
            "CustomResourceDefinition" | "ThirdPartyResource" => Self::Crd,
            "Namespace" => Self::Namespace,
            "ResourceQuota" | "LimitRange" | "PodSecurityPolicy" => Self::NamespaceConfig,
            "ClusterRole" | "ClusterRoleBinding" => Self::ClusterRbac,
            "Role" | "RoleBinding" | "ServiceAccount" => Self::NamespacedRbac,
            "ConfigMap" | "Secret" => Self::Config,
            "StorageClass" | "PersistentVolume" | "PersistentVolumeClaim" => Self::Storage,
            "NetworkPolicy" | "Service" | "Endpoints" | "Ingress" | "IngressClass" => Self::Network,
            "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "ReplicationController"
            | "Pod" => Self::Workload,
            "Job" | "CronJob" => Self::Batch,
            "HorizontalPodAutoscaler" | "VerticalPodAutoscaler" | "PodDisruptionBudget" => {
                Self::Autoscaling
            }
            _ => return None,
        };
        Some(rank)
    }

    /// Rank a kind, using its group and scope when the table does not list it
    pub fn classify(kind: &str, group: &str, namespaced: bool) -> Self {
        if let Some(rank) = Self::of_known_kind(kind) {
            return rank;
        }
        if !namespaced {
            Self::ClusterScoped
        } else if is_custom_group(group) {
            Self::CustomResource
        } else {
            Self::Other
        }
    }
}

/// Whether a group belongs to a custom (non-Kubernetes) API
///
/// - "stable.example.com" -> true
/// - "apps" -> false
pub fn is_custom_group(group: &str) -> bool {
    !CORE_GROUPS.contains(&group)
}

/// Whether a well-known kind lives inside a namespace
///
/// `None` means the kind is not in the registry and the scope has to come from
/// discovery.
pub fn is_namespaced(kind: &str) -> Option<bool> {
    let namespaced = match kind {
        "CustomResourceDefinition" | "ThirdPartyResource" | "Namespace" | "PodSecurityPolicy"
        | "ClusterRole" | "ClusterRoleBinding" | "StorageClass" | "PersistentVolume"
        | "IngressClass" | "Node" | "PriorityClass" | "APIService"
        | "MutatingWebhookConfiguration" | "ValidatingWebhookConfiguration" => false,
        "ResourceQuota" | "LimitRange" | "Role" | "RoleBinding" | "ServiceAccount"
        | "ConfigMap" | "Secret" | "PersistentVolumeClaim" | "NetworkPolicy" | "Service"
        | "Endpoints" | "Ingress" | "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet"
        | "ReplicationController" | "Pod" | "Job" | "CronJob" | "HorizontalPodAutoscaler"
        | "VerticalPodAutoscaler" | "PodDisruptionBudget" | "Event" | "Lease" => true,
        _ => return None,
    };
    Some(namespaced)
}
