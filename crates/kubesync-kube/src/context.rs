//! Per-run context shared by every phase

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{KubeError, Result};
use crate::progress::{ProgressRecord, ProgressSink, SilentProgress};

/// Default namespace, cancellation and progress for one run
#[derive(Clone)]
pub struct RunContext {
    /// Namespace applied to namespaced objects that carry none
    pub default_namespace: String,
    cancel: CancellationToken,
    progress: Arc<dyn ProgressSink>,
}

impl RunContext {
    pub fn new(default_namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: default_namespace.into(),
            cancel: CancellationToken::new(),
            progress: Arc::new(SilentProgress),
        }
    }

    /// Use an existing cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Send progress records to a sink
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail with [`KubeError::Cancelled`] once cancellation was requested
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(KubeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Race a transport call against cancellation
    pub async fn guard<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(KubeError::Cancelled),
            result = call => result,
        }
    }

    pub fn record(&self, record: ProgressRecord) {
        self.progress.record(&record);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_passes_result_through() {
        let ctx = RunContext::default();
        let value = ctx.guard(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_guard_stops_on_cancel() {
        let ctx = RunContext::default();
        ctx.cancellation().cancel();

        let result: Result<()> = ctx.guard(std::future::pending()).await;
        assert!(matches!(result, Err(KubeError::Cancelled)));
        assert!(ctx.check_cancelled().is_err());
    }
}
