//! Deletion engine

use kubesync_core::DeleteOptions;

use crate::backend::Transport;
use crate::context::RunContext;
use crate::error::Result;
use crate::order::DependencyOrder;
use crate::progress::{Action, Phase, ProgressRecord};
use crate::report::DeleteReport;

/// Deletes objects in the order it is given
///
/// Callers pass a reversed [`DependencyOrder`] so dependents go first. A
/// missing object counts as deleted; any other failure aborts the phase.
pub struct Deleter<'a> {
    transport: &'a dyn Transport,
    options: DeleteOptions,
    dry_run: bool,
    phase: Phase,
}

impl<'a> Deleter<'a> {
    pub fn new(transport: &'a dyn Transport, options: DeleteOptions) -> Self {
        Self {
            transport,
            options,
            dry_run: false,
            phase: Phase::Delete,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Phase named in progress records
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub async fn run(&self, ctx: &RunContext, order: &DependencyOrder) -> Result<DeleteReport> {
        let mut report = DeleteReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        for item in order.iter() {
            ctx.check_cancelled()?;
            let id = item.id();

            let action = if self.dry_run {
                let live = ctx
                    .guard(self.transport.get(&item.location, item.object.name()))
                    .await
                    .map_err(|e| e.during("getting", &id))?;
                if live.is_some() {
                    report.deleted.push(id.clone());
                    Action::Deleted
                } else {
                    report.absent.push(id.clone());
                    Action::Absent
                }
            } else {
                match ctx
                    .guard(self.transport.delete(&item.location, item.object.name(), &self.options))
                    .await
                {
                    Ok(()) => {
                        report.deleted.push(id.clone());
                        Action::Deleted
                    }
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(object = %id, "already absent");
                        report.absent.push(id.clone());
                        Action::Absent
                    }
                    Err(e) => return Err(e.during("deleting", &id)),
                }
            };

            tracing::info!(object = %id, action = action.as_str(), dry_run = self.dry_run, "deleted");
            ctx.record(ProgressRecord::new(self.phase, action, id, self.dry_run));
        }

        Ok(report)
    }
}
