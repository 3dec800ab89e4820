//! kubesync Kube - Reconciling manifests against a Kubernetes cluster
//!
//! This crate provides:
//! - **Backends**: the locator, discovery and transport traits, a kube-rs
//!   implementation and an in-memory mock cluster
//! - **Dependency Ordering**: kind precedence with exact reversal for deletes
//! - **Schema Validation**: against the server's OpenAPI definitions
//! - **Reconciler**: create-or-update in dependency order with GC tagging
//! - **Garbage Collection**: removal of tagged objects no longer declared
//! - **Deleter**: version-aware delete options, NotFound tolerated
//! - **Progress Reporting**: one record per processed object

pub mod actions;
pub mod backend;
pub mod client;
pub mod context;
pub mod delete;
pub mod error;
pub mod gc;
pub mod order;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod validate;
pub mod version;

pub use actions::{DeleteCommandOptions, UpdateOptions, ValidateOptions};
pub use backend::{
    Backend, Discovery, Endpoint, KubeBackend, Location, MockCluster, Operation, ResourceLocator,
    Transport, VersionInfo,
};
pub use client::SyncClient;
pub use context::RunContext;
pub use delete::Deleter;
pub use error::{KubeError, Result};
pub use gc::GarbageCollector;
pub use order::{DependencyOrder, OrderedObject};
pub use progress::{
    Action, ConsoleProgress, JsonProgress, MemoryProgress, Phase, ProgressRecord, ProgressSink,
    SilentProgress,
};
pub use reconcile::Reconciler;
pub use report::{DeleteReport, GcReport, ReconcileReport, UpdateReport};
pub use validate::SchemaValidator;
pub use version::resolve_version;
