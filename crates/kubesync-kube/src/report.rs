//! Outcome summaries of each phase

use std::collections::BTreeSet;

use kubesync_core::{ApiObject, ObjectId};
use serde::Serialize;

/// Outcome of the update phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Created objects, in processing order
    pub created: Vec<ObjectId>,
    /// Updated objects, in processing order
    pub updated: Vec<ObjectId>,
    /// Unversioned identities of every desired object
    #[serde(skip)]
    pub desired: BTreeSet<ObjectId>,
    /// Server uids of the objects read or written by this run
    #[serde(skip)]
    pub uids: BTreeSet<String>,
    pub dry_run: bool,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.created.len() + self.updated.len()
    }

    /// Whether an identity belongs to the desired set, whatever its version
    pub fn is_desired(&self, id: &ObjectId) -> bool {
        self.desired.contains(&id.unversioned())
    }

    /// Whether a server object is one this run applied
    ///
    /// The uid matches even when the server lists the object under another
    /// API group than the manifest used.
    pub fn is_desired_object(&self, obj: &ApiObject) -> bool {
        obj.uid().is_some_and(|uid| self.uids.contains(uid)) || self.is_desired(&obj.id())
    }

    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.created.is_empty() {
            parts.push(format!("{} created", self.created.len()));
        }
        if !self.updated.is_empty() {
            parts.push(format!("{} updated", self.updated.len()));
        }
        if parts.is_empty() {
            "No resources processed".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Outcome of a delete phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    /// Objects the server accepted a delete for
    pub deleted: Vec<ObjectId>,
    /// Objects that were already gone
    pub absent: Vec<ObjectId>,
    pub dry_run: bool,
}

impl DeleteReport {
    pub fn total(&self) -> usize {
        self.deleted.len() + self.absent.len()
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.deleted.is_empty() {
            parts.push(format!("{} deleted", self.deleted.len()));
        }
        if !self.absent.is_empty() {
            parts.push(format!("{} already absent", self.absent.len()));
        }
        if parts.is_empty() {
            "No resources deleted".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Outcome of garbage collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct GcReport {
    /// Tagged objects found on the server
    pub listed: usize,
    /// Tagged objects kept for a reason other than being desired
    pub kept: Vec<(ObjectId, String)>,
    /// Stale objects in deletion order
    pub stale: Vec<ObjectId>,
    pub deletes: DeleteReport,
}

impl GcReport {
    pub fn summary(&self) -> String {
        if self.stale.is_empty() {
            return format!("{} tagged, nothing to collect", self.listed);
        }
        format!(
            "{} tagged, {} stale: {}",
            self.listed,
            self.stale.len(),
            self.deletes.summary()
        )
    }
}

/// Outcome of a whole update run
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub reconcile: ReconcileReport,
    /// `None` when garbage collection was not requested
    pub gc: Option<GcReport>,
}

impl UpdateReport {
    pub fn summary(&self) -> String {
        match &self.gc {
            Some(gc) => format!("{}; gc: {}", self.reconcile.summary(), gc.summary()),
            None => self.reconcile.summary(),
        }
    }
}
