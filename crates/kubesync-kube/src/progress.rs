//! Progress reporting for reconcile runs
//!
//! Every processed object produces one [`ProgressRecord`], emitted in
//! processing order to a [`ProgressSink`]. Sinks are provided for:
//! - Styled terminal output
//! - JSON lines for CI/CD integration
//! - In-memory recording for tests

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use console::style;
use kubesync_core::ObjectId;
use serde::Serialize;

/// Pipeline stage a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Validate,
    Update,
    Gc,
    Delete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validate => "validate",
            Phase::Update => "update",
            Phase::Gc => "gc",
            Phase::Delete => "delete",
        }
    }
}

/// What happened to one object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Validated,
    /// No schema published and unknown kinds are tolerated
    Unchecked,
    Created,
    Updated,
    Deleted,
    /// Already gone when the delete was sent
    Absent,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Validated => "validated",
            Action::Unchecked => "unchecked",
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
            Action::Absent => "absent",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Action::Validated => "✓",
            Action::Unchecked => "⊘",
            Action::Created => "+",
            Action::Updated => "~",
            Action::Deleted => "-",
            Action::Absent => "○",
        }
    }

    fn styled_symbol(&self) -> console::StyledObject<&'static str> {
        match self {
            Action::Validated => style(self.symbol()).green(),
            Action::Unchecked => style(self.symbol()).yellow(),
            Action::Created => style(self.symbol()).green(),
            Action::Updated => style(self.symbol()).cyan(),
            Action::Deleted => style(self.symbol()).red(),
            Action::Absent => style(self.symbol()).dim(),
        }
    }
}

/// One processed object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRecord {
    pub phase: Phase,
    pub action: Action,
    #[serde(serialize_with = "serialize_display")]
    pub object: ObjectId,
    pub dry_run: bool,
}

fn serialize_display<S: serde::Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

impl ProgressRecord {
    pub fn new(phase: Phase, action: Action, object: ObjectId, dry_run: bool) -> Self {
        Self {
            phase,
            action,
            object,
            dry_run,
        }
    }

    /// Plain single-line form, e.g. "created ConfigMap ns1/cm1 (dry run)"
    pub fn render(&self) -> String {
        let suffix = if self.dry_run { " (dry run)" } else { "" };
        format!("{} {}{}", self.action.as_str(), self.object, suffix)
    }
}

/// Receiver of progress records
pub trait ProgressSink: Send + Sync {
    fn record(&self, record: &ProgressRecord);
}

/// Styled terminal output on stderr
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressSink for ConsoleProgress {
    fn record(&self, record: &ProgressRecord) {
        let dry_run = if record.dry_run {
            format!(" {}", style("(dry run)").dim())
        } else {
            String::new()
        };

        let _ = writeln!(
            io::stderr(),
            "  {} {} {}{}",
            record.action.styled_symbol(),
            style(record.action.as_str()).bold(),
            record.object,
            dry_run
        );
    }
}

/// JSON lines on stdout
#[derive(Debug, Default)]
pub struct JsonProgress;

impl JsonProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressSink for JsonProgress {
    fn record(&self, record: &ProgressRecord) {
        if let Ok(line) = serde_json::to_string(record) {
            println!("{}", line);
        }
    }
}

/// Discards every record
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn record(&self, _record: &ProgressRecord) {}
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryProgress {
    records: Mutex<Vec<ProgressRecord>>,
}

impl MemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProgressRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records in their plain form
    pub fn lines(&self) -> Vec<String> {
        self.records().iter().map(ProgressRecord::render).collect()
    }
}

impl ProgressSink for MemoryProgress {
    fn record(&self, record: &ProgressRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cm1() -> ObjectId {
        ObjectId {
            group: String::new(),
            version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            namespace: Some("ns1".to_string()),
            name: "cm1".to_string(),
        }
    }

    #[test]
    fn test_render() {
        let record = ProgressRecord::new(Phase::Update, Action::Created, cm1(), false);
        assert_eq!(record.render(), "created ConfigMap ns1/cm1");

        let record = ProgressRecord::new(Phase::Gc, Action::Deleted, cm1(), true);
        assert_eq!(record.render(), "deleted ConfigMap ns1/cm1 (dry run)");
    }

    #[test]
    fn test_json_form() {
        let record = ProgressRecord::new(Phase::Delete, Action::Absent, cm1(), false);
        insta::assert_snapshot!(
            serde_json::to_string(&record).unwrap(),
            @r#"{"phase":"delete","action":"absent","object":"ConfigMap ns1/cm1","dry_run":false}"#
        );
    }

    #[test]
    fn test_memory_progress_keeps_order() {
        let sink = MemoryProgress::new();
        sink.record(&ProgressRecord::new(Phase::Update, Action::Created, cm1(), false));
        sink.record(&ProgressRecord::new(Phase::Update, Action::Updated, cm1(), false));

        assert_eq!(
            sink.lines(),
            vec!["created ConfigMap ns1/cm1", "updated ConfigMap ns1/cm1"]
        );
    }

    #[test]
    fn test_action_symbols() {
        assert_eq!(Action::Created.symbol(), "+");
        assert_eq!(Action::Deleted.symbol(), "-");
        assert_eq!(Action::Absent.symbol(), "○");
    }
}
