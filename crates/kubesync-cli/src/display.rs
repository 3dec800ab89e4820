//! Terminal output for command results

use console::style;
use kubesync_kube::{DeleteReport, GcReport, UpdateReport};

/// Pluralize a word based on count
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Plain summary lines of an update run
pub fn update_lines(report: &UpdateReport) -> Vec<String> {
    let reconcile = &report.reconcile;
    let mut lines = vec![format!(
        "{}, {}",
        pluralize(reconcile.created.len(), "object created", "objects created"),
        pluralize(reconcile.updated.len(), "object updated", "objects updated"),
    )];

    if let Some(gc) = &report.gc {
        lines.extend(gc_lines(gc));
    }
    lines
}

fn gc_lines(gc: &GcReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} tagged on the server, {}",
        gc.listed,
        pluralize(gc.stale.len(), "stale", "stale")
    )];
    for (id, reason) in &gc.kept {
        lines.push(format!("kept {} ({})", id, reason));
    }
    if !gc.stale.is_empty() {
        lines.push(gc.deletes.summary());
    }
    lines
}

pub fn print_update_report(report: &UpdateReport) {
    let prefix = if report.reconcile.dry_run {
        format!("{} ", style("[dry run]").yellow())
    } else {
        String::new()
    };

    println!();
    for (i, line) in update_lines(report).iter().enumerate() {
        if i == 0 {
            println!("{}{} {}", prefix, style("✓").green().bold(), line);
        } else {
            println!("  {}", style(line).dim());
        }
    }
}

pub fn print_delete_report(report: &DeleteReport) {
    let prefix = if report.dry_run {
        format!("{} ", style("[dry run]").yellow())
    } else {
        String::new()
    };
    println!();
    println!("{}{} {}", prefix, style("✓").green().bold(), report.summary());
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubesync_core::ObjectId;
    use kubesync_kube::ReconcileReport;

    fn id(name: &str) -> ObjectId {
        ObjectId {
            group: String::new(),
            version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            namespace: Some("ns1".to_string()),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "error", "errors"), "1 error");
        assert_eq!(pluralize(0, "error", "errors"), "0 errors");
    }

    #[test]
    fn test_update_lines() {
        let report = UpdateReport {
            reconcile: ReconcileReport {
                created: vec![id("a")],
                updated: vec![id("b"), id("c")],
                ..Default::default()
            },
            gc: Some(GcReport {
                listed: 4,
                kept: vec![(id("pinned"), "gc-strategy annotation".to_string())],
                stale: vec![id("old")],
                deletes: DeleteReport {
                    deleted: vec![id("old")],
                    ..Default::default()
                },
            }),
        };

        insta::assert_snapshot!(update_lines(&report).join("\n"), @r"
        1 object created, 2 objects updated
        4 tagged on the server, 1 stale
        kept ConfigMap ns1/pinned (gc-strategy annotation)
        1 deleted
        ");
    }
}
