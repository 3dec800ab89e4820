//! Garbage collection of objects a run no longer declares
//!
//! Candidates are the server objects labelled with the run's tag whose tag
//! annotation also matches. Desired objects (by identity or by a uid the run
//! applied), controller-owned objects and objects opting out with the
//! gc-strategy annotation are kept. What remains is deleted in reverse
//! dependency order.

use kubesync_core::{DeleteOptions, GcStrategy, GcTag};

use crate::backend::Backend;
use crate::context::RunContext;
use crate::delete::Deleter;
use crate::error::Result;
use crate::order::DependencyOrder;
use crate::progress::Phase;
use crate::report::{GcReport, ReconcileReport};

/// Removes stale tagged objects
pub struct GarbageCollector<'a, B: Backend> {
    backend: &'a B,
    tag: GcTag,
    options: DeleteOptions,
    dry_run: bool,
}

impl<'a, B: Backend> GarbageCollector<'a, B> {
    pub fn new(backend: &'a B, tag: GcTag, options: DeleteOptions) -> Self {
        Self {
            backend,
            tag,
            options,
            dry_run: false,
        }
    }

    /// List and report stale objects without deleting them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Delete tagged objects outside the desired set of a finished update
    pub async fn collect(&self, ctx: &RunContext, desired: &ReconcileReport) -> Result<GcReport> {
        ctx.check_cancelled()?;
        let listed = ctx.guard(self.backend.list_tagged(&self.tag)).await?;

        let mut report = GcReport {
            listed: listed.len(),
            ..Default::default()
        };
        let mut stale = Vec::new();

        for obj in listed {
            // The label may have been set by hand; the annotation is authoritative
            if !self.tag.is_carried_by(&obj) {
                continue;
            }

            if desired.is_desired_object(&obj) {
                continue;
            }
            let id = obj.id();
            if obj.has_controller_owner() {
                tracing::debug!(object = %id, "controlled by another object, keeping");
                report.kept.push((id, "controlled by owner".to_string()));
                continue;
            }
            if GcStrategy::of(&obj) == GcStrategy::Ignore {
                tracing::debug!(object = %id, "gc-strategy is ignore, keeping");
                report.kept.push((id, "gc-strategy annotation".to_string()));
                continue;
            }

            stale.push(obj);
        }

        if stale.is_empty() {
            tracing::info!(tag = %self.tag, listed = report.listed, "nothing to collect");
            return Ok(report);
        }

        let order =
            DependencyOrder::build(stale, self.backend, &ctx.default_namespace)?.reverse();
        report.stale = order.ids();
        tracing::info!(tag = %self.tag, stale = report.stale.len(), "collecting stale objects");

        report.deletes = Deleter::new(self.backend, self.options)
            .dry_run(self.dry_run)
            .phase(Phase::Gc)
            .run(ctx, &order)
            .await?;

        Ok(report)
    }
}
