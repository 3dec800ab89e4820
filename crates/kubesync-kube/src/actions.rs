//! Action options for update, delete and validate operations

use kubesync_core::GcTag;

/// Options for update operation
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Create objects that do not exist yet
    pub create: bool,

    /// Do not garbage collect after updating
    pub skip_gc: bool,

    /// Tag stamped on written objects; `None` disables tagging and GC
    pub gc_tag: Option<GcTag>,

    /// Read and report without writing
    pub dry_run: bool,

    /// Validate against server schemas before any write
    pub validate: bool,

    /// Tolerate kinds without a published schema
    pub ignore_unknown: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            create: true,
            skip_gc: false,
            gc_tag: None,
            dry_run: false,
            validate: true,
            ignore_unknown: false,
        }
    }
}

impl UpdateOptions {
    /// Tag written objects and collect stale ones
    pub fn with_gc_tag(mut self, tag: GcTag) -> Self {
        self.gc_tag = Some(tag);
        self
    }

    /// Enable dry-run mode
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Fail on missing objects instead of creating them
    pub fn without_create(mut self) -> Self {
        self.create = false;
        self
    }

    pub fn skip_gc(mut self) -> Self {
        self.skip_gc = true;
        self
    }

    pub fn skip_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    pub fn ignore_unknown(mut self) -> Self {
        self.ignore_unknown = true;
        self
    }

    /// Tag to collect with, `None` when garbage collection does not apply
    pub fn gc_enabled_tag(&self) -> Option<&GcTag> {
        if self.skip_gc {
            None
        } else {
            self.gc_tag.as_ref()
        }
    }
}

/// Options for delete operation
#[derive(Debug, Clone)]
pub struct DeleteCommandOptions {
    /// Seconds given to objects to terminate; negative keeps the server default
    pub grace_period: i64,

    /// Report without deleting
    pub dry_run: bool,
}

impl Default for DeleteCommandOptions {
    fn default() -> Self {
        Self {
            grace_period: -1,
            dry_run: false,
        }
    }
}

impl DeleteCommandOptions {
    pub fn with_grace_period(mut self, seconds: i64) -> Self {
        self.grace_period = seconds;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Options for validate operation
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Tolerate kinds without a published schema
    pub ignore_unknown: bool,
}

impl ValidateOptions {
    pub fn ignore_unknown(mut self) -> Self {
        self.ignore_unknown = true;
        self
    }
}
