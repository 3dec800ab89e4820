//! High-level client for kubesync operations
//!
//! Runs the full pipelines behind the `update`, `delete` and `validate`
//! commands against any [`Backend`].

use kubesync_core::{ApiObject, DeleteOptions};

use crate::actions::{DeleteCommandOptions, UpdateOptions, ValidateOptions};
use crate::backend::{Backend, KubeBackend};
use crate::context::RunContext;
use crate::delete::Deleter;
use crate::error::Result;
use crate::gc::GarbageCollector;
use crate::order::DependencyOrder;
use crate::reconcile::Reconciler;
use crate::report::{DeleteReport, UpdateReport};
use crate::validate::SchemaValidator;
use crate::version::resolve_version;

/// High-level client for kubesync
pub struct SyncClient<B: Backend> {
    backend: B,
}

impl SyncClient<KubeBackend> {
    /// Connect to the cluster selected by the local kubeconfig
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        Ok(Self::new(KubeBackend::from_context(context).await?))
    }
}

impl<B: Backend> SyncClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ========== Validate ==========

    /// Check every object against its server schema
    pub async fn validate(
        &self,
        ctx: &RunContext,
        objects: &[ApiObject],
        options: &ValidateOptions,
    ) -> Result<()> {
        SchemaValidator::new(&self.backend)
            .ignore_unknown(options.ignore_unknown)
            .validate(ctx, objects)
            .await
    }

    // ========== Update ==========

    /// Create or update objects, then collect stale tagged ones
    ///
    /// Validation and ordering failures abort before the first write. Garbage
    /// collection only runs once every object was written.
    pub async fn update(
        &self,
        ctx: &RunContext,
        objects: Vec<ApiObject>,
        options: &UpdateOptions,
    ) -> Result<UpdateReport> {
        if options.validate {
            SchemaValidator::new(&self.backend)
                .ignore_unknown(options.ignore_unknown)
                .validate(ctx, &objects)
                .await?;
        }

        let version = resolve_version(&self.backend, ctx).await?;
        let mut order = DependencyOrder::build(objects, &self.backend, &ctx.default_namespace)?;

        let reconcile = Reconciler::new(&self.backend)
            .create(options.create)
            .dry_run(options.dry_run)
            .gc_tag(options.gc_tag.clone())
            .run(ctx, &mut order)
            .await?;
        tracing::info!(summary = %reconcile.summary(), "update finished");

        let gc = match options.gc_enabled_tag() {
            Some(tag) => {
                let delete_options = DeleteOptions::for_version(version, -1);
                let report = GarbageCollector::new(&self.backend, tag.clone(), delete_options)
                    .dry_run(options.dry_run)
                    .collect(ctx, &reconcile)
                    .await?;
                tracing::info!(summary = %report.summary(), "garbage collection finished");
                Some(report)
            }
            None => None,
        };

        Ok(UpdateReport { reconcile, gc })
    }

    // ========== Delete ==========

    /// Delete objects in reverse dependency order
    pub async fn delete(
        &self,
        ctx: &RunContext,
        objects: Vec<ApiObject>,
        options: &DeleteCommandOptions,
    ) -> Result<DeleteReport> {
        let version = resolve_version(&self.backend, ctx).await?;
        let delete_options = DeleteOptions::for_version(version, options.grace_period);
        let order =
            DependencyOrder::build(objects, &self.backend, &ctx.default_namespace)?.reverse();

        let report = Deleter::new(&self.backend, delete_options)
            .dry_run(options.dry_run)
            .run(ctx, &order)
            .await?;
        tracing::info!(summary = %report.summary(), "delete finished");

        Ok(report)
    }
}
