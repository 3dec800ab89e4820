//! CLI commands

pub mod delete;
pub mod update;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use kubesync_core::{ApiObject, load_paths};
use kubesync_kube::{
    ConsoleProgress, JsonProgress, KubeBackend, ProgressSink, RunContext, SyncClient,
};
use tokio_util::sync::CancellationToken;

use crate::error::{CliError, Result};

/// Settings shared by every command of one invocation
pub struct Session {
    /// Kubeconfig context, the current one when unset
    pub context: Option<String>,
    pub namespace: String,
    pub json: bool,
    pub cancel: CancellationToken,
}

impl Session {
    /// Run context for one command, reporting progress in the chosen format
    pub fn run_context(&self) -> RunContext {
        let progress: Arc<dyn ProgressSink> = if self.json {
            Arc::new(JsonProgress::new())
        } else {
            Arc::new(ConsoleProgress::new())
        };

        RunContext::new(self.namespace.clone())
            .with_cancellation(self.cancel.clone())
            .with_progress(progress)
    }

    pub async fn connect(&self) -> Result<SyncClient<KubeBackend>> {
        let client = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(CliError::Interrupted),
            client = SyncClient::connect(self.context.as_deref()) => client?,
        };
        Ok(client)
    }
}

/// Read every object from the given files and directories
pub fn load_manifests(paths: &[PathBuf]) -> Result<Vec<ApiObject>> {
    if paths.is_empty() {
        return Err(CliError::usage("no manifest files or directories given"));
    }

    let objects = load_paths(paths)?;
    if objects.is_empty() {
        tracing::warn!("no objects found in the given manifests");
    }
    tracing::debug!(count = objects.len(), "loaded manifests");
    Ok(objects)
}
