//! Create-or-update engine
//!
//! Walks a [`DependencyOrder`] forward, one object at a time. Each object is
//! read first; missing objects are created (when allowed), existing ones are
//! updated. The first failure aborts the phase and completed writes are kept.

use kubesync_core::GcTag;

use crate::backend::Transport;
use crate::context::RunContext;
use crate::error::{KubeError, Result};
use crate::order::DependencyOrder;
use crate::progress::{Action, Phase, ProgressRecord};
use crate::report::ReconcileReport;

/// Applies ordered objects to the cluster
pub struct Reconciler<'a> {
    transport: &'a dyn Transport,
    create: bool,
    dry_run: bool,
    gc_tag: Option<GcTag>,
}

impl<'a> Reconciler<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            create: true,
            dry_run: false,
            gc_tag: None,
        }
    }

    /// Allow creating objects that do not exist yet
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Read and report without writing
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stamp this tag on every object before it is written
    pub fn gc_tag(mut self, tag: Option<GcTag>) -> Self {
        self.gc_tag = tag;
        self
    }

    /// Create or update every object in order
    pub async fn run(&self, ctx: &RunContext, order: &mut DependencyOrder) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        for item in order.iter_mut() {
            ctx.check_cancelled()?;

            if let Some(tag) = &self.gc_tag {
                tag.stamp(&mut item.object);
            }

            let id = item.id();
            report.desired.insert(id.unversioned());

            let live = ctx
                .guard(self.transport.get(&item.location, item.object.name()))
                .await
                .map_err(|e| e.during("getting", &id))?;

            let action = match live {
                None if !self.create => {
                    return Err(KubeError::CreateDisabled {
                        object: id.to_string(),
                    });
                }
                None => {
                    if !self.dry_run {
                        let created = ctx
                            .guard(self.transport.create(&item.location, &item.object))
                            .await
                            .map_err(|e| e.during("creating", &id))?;
                        report.uids.extend(created.uid().map(String::from));
                    }
                    report.created.push(id.clone());
                    Action::Created
                }
                Some(live) => {
                    report.uids.extend(live.uid().map(String::from));
                    if !self.dry_run {
                        let updated = ctx
                            .guard(self.transport.update(&item.location, &item.object))
                            .await
                            .map_err(|e| e.during("updating", &id))?;
                        report.uids.extend(updated.uid().map(String::from));
                    }
                    report.updated.push(id.clone());
                    Action::Updated
                }
            };

            tracing::info!(object = %id, action = action.as_str(), dry_run = self.dry_run, "reconciled");
            ctx.record(ProgressRecord::new(Phase::Update, action, id, self.dry_run));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockCluster, Operation};
    use crate::progress::{MemoryProgress, ProgressSink};
    use kubesync_core::{ApiObject, GC_TAG_ANNOTATION};
    use serde_json::json;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    /// Requests cancellation as soon as the first object is reported
    struct CancelOnFirstRecord(CancellationToken);

    impl ProgressSink for CancelOnFirstRecord {
        fn record(&self, _record: &ProgressRecord) {
            self.0.cancel();
        }
    }

    fn manifests() -> Vec<ApiObject> {
        vec![
            ApiObject::from_value(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "cm1", "namespace": "ns1"},
                "data": {"k": "v"}
            }))
            .unwrap(),
            ApiObject::from_value(json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": {"name": "ns1"}
            }))
            .unwrap(),
        ]
    }

    fn order(cluster: &MockCluster) -> DependencyOrder {
        DependencyOrder::build(manifests(), cluster, "default").unwrap()
    }

    #[tokio::test]
    async fn test_creates_in_order_with_tag() {
        let cluster = MockCluster::new();
        let mut order = order(&cluster);
        let tag = GcTag::parse("run1").unwrap();

        let report = Reconciler::new(&cluster)
            .gc_tag(tag)
            .run(&RunContext::default(), &mut order)
            .await
            .unwrap();

        assert_eq!(
            cluster.mutation_log(),
            vec!["create Namespace ns1", "create ConfigMap ns1/cm1"]
        );
        assert_eq!(report.created.len(), 2);
        assert!(report.updated.is_empty());
        assert_eq!(report.uids.len(), 2);

        let cm = cluster.object("v1", "ConfigMap", Some("ns1"), "cm1").unwrap();
        assert_eq!(cm.annotation(GC_TAG_ANNOTATION), Some("run1"));
        let ns = cluster.object("v1", "Namespace", None, "ns1").unwrap();
        assert_eq!(ns.annotation(GC_TAG_ANNOTATION), Some("run1"));
    }

    #[tokio::test]
    async fn test_second_run_updates() {
        let cluster = MockCluster::new();
        let ctx = RunContext::default();

        Reconciler::new(&cluster)
            .run(&ctx, &mut order(&cluster))
            .await
            .unwrap();
        cluster.reset_operations();

        let report = Reconciler::new(&cluster)
            .run(&ctx, &mut order(&cluster))
            .await
            .unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.updated.len(), 2);
        assert!(
            cluster
                .mutations()
                .iter()
                .all(|op| matches!(op, Operation::Update(_)))
        );
    }

    #[tokio::test]
    async fn test_dry_run_reads_only() {
        let cluster = MockCluster::new();
        let progress = Arc::new(MemoryProgress::new());
        let ctx = RunContext::default().with_progress(progress.clone());

        let report = Reconciler::new(&cluster)
            .dry_run(true)
            .run(&ctx, &mut order(&cluster))
            .await
            .unwrap();

        assert!(cluster.mutations().is_empty());
        assert_eq!(cluster.operations().len(), 2);
        assert_eq!(report.created.len(), 2);
        assert_eq!(
            progress.lines(),
            vec![
                "created Namespace ns1 (dry run)",
                "created ConfigMap ns1/cm1 (dry run)"
            ]
        );
    }

    #[tokio::test]
    async fn test_create_disabled() {
        let cluster = MockCluster::new();
        let err = Reconciler::new(&cluster)
            .create(false)
            .run(&RunContext::default(), &mut order(&cluster))
            .await
            .unwrap_err();

        assert!(matches!(err, KubeError::CreateDisabled { .. }));
        assert!(err.to_string().contains("Namespace ns1"));
        assert!(cluster.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_first_failure_stops() {
        let cluster = MockCluster::new().fail_on("create", "ns1", "quota exceeded");
        let err = Reconciler::new(&cluster)
            .run(&RunContext::default(), &mut order(&cluster))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "error creating Namespace ns1: transport error: quota exceeded"
        );
        assert_eq!(cluster.mutation_log(), vec!["create Namespace ns1"]);
        assert_eq!(cluster.object_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_object() {
        let cluster = MockCluster::new();
        let ctx = RunContext::default();
        ctx.cancellation().cancel();

        let err = Reconciler::new(&cluster)
            .run(&ctx, &mut order(&cluster))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(cluster.operations().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_between_objects_keeps_completed_writes() {
        let cluster = MockCluster::new();
        let ctx = RunContext::default();
        let ctx = ctx
            .clone()
            .with_progress(Arc::new(CancelOnFirstRecord(ctx.cancellation().clone())));

        let err = Reconciler::new(&cluster)
            .run(&ctx, &mut order(&cluster))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(cluster.mutation_log(), vec!["create Namespace ns1"]);
        assert!(cluster.object("v1", "Namespace", None, "ns1").is_some());
        assert!(cluster.object("v1", "ConfigMap", Some("ns1"), "cm1").is_none());
    }
}
