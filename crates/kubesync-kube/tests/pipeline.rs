//! End-to-end pipeline tests against the in-memory cluster

use std::sync::Arc;

use kubesync_core::{
    ApiObject, DeletePropagation, GC_TAG_ANNOTATION, GC_TAG_LABEL, GcTag, PropagationPolicy,
    parse_documents,
};
use kubesync_kube::{
    DeleteCommandOptions, Endpoint, KubeError, MemoryProgress, MockCluster, Operation,
    ProgressRecord, ProgressSink, RunContext, SyncClient, UpdateOptions,
};
use tokio_util::sync::CancellationToken;

const MANIFESTS: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: cm1
  namespace: ns1
data:
  greeting: hello
---
apiVersion: v1
kind: Namespace
metadata:
  name: ns1
"#;

fn manifests() -> Vec<ApiObject> {
    parse_documents(MANIFESTS, "manifests.yaml").unwrap()
}

fn tag(value: &str) -> GcTag {
    GcTag::parse(value).unwrap().unwrap()
}

/// Requests cancellation as soon as the first object is reported
struct CancelOnFirstRecord(CancellationToken);

impl ProgressSink for CancelOnFirstRecord {
    fn record(&self, _record: &ProgressRecord) {
        self.0.cancel();
    }
}

fn update_options(gc_tag: &str) -> UpdateOptions {
    UpdateOptions::default()
        .skip_validation()
        .with_gc_tag(tag(gc_tag))
}

mod update_pipeline {
    use super::*;

    #[tokio::test]
    async fn test_namespace_created_before_config_map() {
        let client = SyncClient::new(MockCluster::new());
        let progress = Arc::new(MemoryProgress::new());
        let ctx = RunContext::default().with_progress(progress.clone());

        let report = client
            .update(&ctx, manifests(), &update_options("run1"))
            .await
            .unwrap();

        assert_eq!(
            client.backend().mutation_log(),
            vec!["create Namespace ns1", "create ConfigMap ns1/cm1"]
        );
        for (kind, ns, name) in [("Namespace", None, "ns1"), ("ConfigMap", Some("ns1"), "cm1")] {
            let obj = client.backend().object("v1", kind, ns, name).unwrap();
            assert_eq!(obj.annotation(GC_TAG_ANNOTATION), Some("run1"));
            assert_eq!(obj.label(GC_TAG_LABEL), Some("run1"));
        }

        assert_eq!(
            progress.lines(),
            vec!["created Namespace ns1", "created ConfigMap ns1/cm1"]
        );
        let gc = report.gc.unwrap();
        assert_eq!(gc.listed, 2);
        assert!(gc.stale.is_empty());
    }

    #[tokio::test]
    async fn test_second_run_creates_nothing() {
        let client = SyncClient::new(MockCluster::new());
        let ctx = RunContext::default();
        let options = update_options("run1");

        client.update(&ctx, manifests(), &options).await.unwrap();
        client.backend().reset_operations();
        let report = client.update(&ctx, manifests(), &options).await.unwrap();

        assert!(report.reconcile.created.is_empty());
        assert_eq!(report.reconcile.updated.len(), 2);
        assert!(
            client
                .backend()
                .mutations()
                .iter()
                .all(|op| matches!(op, Operation::Update(_)))
        );
        assert_eq!(client.backend().object_count(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_never_mutates() {
        let stale = ApiObject::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "old",
                "namespace": "ns1",
                "labels": {"kubesync.io/gc-tag": "run1"},
                "annotations": {"kubesync.io/gc-tag": "run1"}
            }
        }))
        .unwrap();
        let client = SyncClient::new(MockCluster::new().with_object(stale));

        let report = client
            .update(
                &RunContext::default(),
                manifests(),
                &update_options("run1").dry_run(),
            )
            .await
            .unwrap();

        assert!(client.backend().mutations().is_empty());
        assert_eq!(report.reconcile.created.len(), 2);
        assert_eq!(report.gc.unwrap().stale.len(), 1);
        assert_eq!(client.backend().object_count(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_still_orders_and_fails() {
        let mut objects = manifests();
        objects.push(
            ApiObject::from_value(serde_json::json!({
                "apiVersion": "example.com/v1",
                "kind": "Widget",
                "metadata": {"name": "w", "namespace": "ns1"}
            }))
            .unwrap(),
        );
        let client = SyncClient::new(MockCluster::new());

        let err = client
            .update(&RunContext::default(), objects, &update_options("run1").dry_run())
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::NoResourceMapping { .. }));
        assert!(client.backend().operations().is_empty());
    }

    #[tokio::test]
    async fn test_create_disabled_aborts_before_gc() {
        let client = SyncClient::new(MockCluster::new());
        let mut options = update_options("run1");
        options.create = false;

        let err = client
            .update(&RunContext::default(), manifests(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::CreateDisabled { .. }));
        assert!(
            !client
                .backend()
                .operations()
                .iter()
                .any(|op| matches!(op, Operation::ListTagged(_)))
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_stops() {
        let client = SyncClient::new(MockCluster::new());
        let ctx = RunContext::default();
        ctx.cancellation().cancel();

        let err = client
            .update(&ctx, manifests(), &update_options("run1"))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(client.backend().mutations().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_first_write_keeps_it() {
        let client = SyncClient::new(MockCluster::new());
        let ctx = RunContext::default();
        let ctx = ctx
            .clone()
            .with_progress(Arc::new(CancelOnFirstRecord(ctx.cancellation().clone())));

        let err = client
            .update(&ctx, manifests(), &update_options("run1"))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(client.backend().mutation_log(), vec!["create Namespace ns1"]);
        assert!(client.backend().object("v1", "Namespace", None, "ns1").is_some());
        assert!(
            !client
                .backend()
                .operations()
                .iter()
                .any(|op| matches!(op, Operation::ListTagged(_)))
        );
    }
}

mod garbage_collection {
    use super::*;

    fn config_map(name: &str, tag: Option<&str>) -> ApiObject {
        let mut obj = ApiObject::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": name, "namespace": "ns1"}
        }))
        .unwrap();
        if let Some(tag) = tag {
            super::tag(tag).stamp(&mut obj);
        }
        obj
    }

    #[tokio::test]
    async fn test_only_stale_object_deleted() {
        let cluster = MockCluster::new()
            .with_object(config_map("a", Some("r1")))
            .with_object(config_map("b", Some("r1")))
            .with_object(config_map("c", Some("r1")))
            .with_object(config_map("other", Some("r2")))
            .with_object(config_map("manual", None));
        let client = SyncClient::new(cluster);

        let desired = vec![config_map("a", None), config_map("b", None)];
        client
            .update(&RunContext::default(), desired, &update_options("r1"))
            .await
            .unwrap();

        let deletes: Vec<String> = client
            .backend()
            .mutations()
            .iter()
            .filter(|op| matches!(op, Operation::Delete { .. }))
            .map(Operation::describe)
            .collect();
        assert_eq!(deletes, vec!["delete ConfigMap ns1/c"]);
        assert!(client.backend().object("v1", "ConfigMap", Some("ns1"), "other").is_some());
        assert!(client.backend().object("v1", "ConfigMap", Some("ns1"), "manual").is_some());
    }

    #[tokio::test]
    async fn test_object_listed_under_alias_group_is_kept() {
        let ingress = ApiObject::from_value(serde_json::json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": {"name": "web", "namespace": "ns1"}
        }))
        .unwrap();
        let cluster = MockCluster::new()
            .with_endpoint(Endpoint::new("extensions", "v1beta1", "Ingress", "ingresses", true))
            .listed_as("Ingress", "extensions/v1beta1");
        let client = SyncClient::new(cluster);
        let ctx = RunContext::default();

        client
            .update(&ctx, vec![ingress.clone()], &update_options("r1"))
            .await
            .unwrap();
        client.backend().reset_operations();

        let report = client
            .update(&ctx, vec![ingress], &update_options("r1"))
            .await
            .unwrap();

        let gc = report.gc.unwrap();
        assert_eq!(gc.listed, 1);
        assert!(gc.stale.is_empty());
        assert_eq!(client.backend().mutation_log(), vec!["update Ingress ns1/web"]);
        assert!(
            client
                .backend()
                .object("networking.k8s.io/v1", "Ingress", Some("ns1"), "web")
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_skip_gc() {
        let cluster = MockCluster::new().with_object(config_map("c", Some("r1")));
        let client = SyncClient::new(cluster);

        let report = client
            .update(
                &RunContext::default(),
                vec![config_map("a", None)],
                &update_options("r1").skip_gc(),
            )
            .await
            .unwrap();
        assert!(report.gc.is_none());
        assert!(client.backend().object("v1", "ConfigMap", Some("ns1"), "c").is_some());
    }

    #[tokio::test]
    async fn test_gc_uses_foreground_on_modern_servers() {
        let cluster = MockCluster::new()
            .with_version("1", "20")
            .with_object(config_map("c", Some("r1")));
        let client = SyncClient::new(cluster);

        client
            .update(&RunContext::default(), Vec::new(), &update_options("r1"))
            .await
            .unwrap();

        let Some(Operation::Delete { options, .. }) = client.backend().mutations().pop() else {
            panic!("expected a delete");
        };
        assert_eq!(
            options.propagation,
            DeletePropagation::Modern {
                propagation_policy: PropagationPolicy::Foreground
            }
        );
        assert_eq!(options.grace_period_seconds, None);
    }
}

mod delete_pipeline {
    use super::*;

    #[tokio::test]
    async fn test_delete_reverse_order_and_absent_is_ok() {
        let client = SyncClient::new(MockCluster::new());
        let ctx = RunContext::default();
        client
            .update(&ctx, manifests(), &UpdateOptions::default().skip_validation())
            .await
            .unwrap();
        client.backend().reset_operations();

        let options = DeleteCommandOptions::default().with_grace_period(0);
        let report = client.delete(&ctx, manifests(), &options).await.unwrap();
        assert_eq!(
            client.backend().mutation_log(),
            vec!["delete ConfigMap ns1/cm1", "delete Namespace ns1"]
        );
        assert_eq!(report.deleted.len(), 2);

        let report = client.delete(&ctx, manifests(), &options).await.unwrap();
        assert_eq!(report.absent.len(), 2);
    }

    #[tokio::test]
    async fn test_legacy_server_orphan_dependents_false() {
        let client = SyncClient::new(MockCluster::new().with_version("1", "5"));
        client
            .delete(
                &RunContext::default(),
                manifests(),
                &DeleteCommandOptions::default().with_grace_period(30),
            )
            .await
            .unwrap();

        for op in client.backend().mutations() {
            let Operation::Delete { options, .. } = op else {
                panic!("unexpected operation {:?}", op);
            };
            assert_eq!(
                options.to_body(),
                serde_json::json!({
                    "kind": "DeleteOptions",
                    "apiVersion": "v1",
                    "orphanDependents": false,
                    "gracePeriodSeconds": 30
                })
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_version_uses_default() {
        let client = SyncClient::new(MockCluster::new().without_version());
        client
            .delete(&RunContext::default(), manifests(), &DeleteCommandOptions::default())
            .await
            .unwrap();

        // Default 1.8 is past the 1.6 cut-over
        let Some(Operation::Delete { options, .. }) = client.backend().mutations().pop() else {
            panic!("expected a delete");
        };
        assert!(matches!(options.propagation, DeletePropagation::Modern { .. }));
    }
}
