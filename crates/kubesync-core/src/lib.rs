//! kubesync Core - Core types for reconciling manifests against a cluster
//!
//! This crate provides the foundational types used throughout kubesync:
//! - `ApiObject`: A schema-less resource manifest and its `ObjectId`
//! - `KindRank`: Creation precedence of resource kinds
//! - `ServerVersion`: The control plane's (major, minor) version
//! - `GcTag`: The marker tying objects to the run that manages them
//! - `DeleteOptions`: Version-aware delete semantics
//! - `manifest`: Loading objects from local YAML/JSON files

pub mod delete;
pub mod error;
pub mod gc;
pub mod kinds;
pub mod manifest;
pub mod object;
pub mod version;

pub use delete::{DeleteOptions, DeletePropagation, PropagationPolicy};
pub use error::{CoreError, Result};
pub use gc::{GC_STRATEGY_ANNOTATION, GC_TAG_ANNOTATION, GC_TAG_LABEL, GcStrategy, GcTag, eligible_for_gc};
pub use kinds::KindRank;
pub use manifest::{load_paths, parse_documents};
pub use object::{ApiObject, ObjectId};
pub use version::ServerVersion;
