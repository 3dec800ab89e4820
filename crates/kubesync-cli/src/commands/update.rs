//! Update command - create or update objects and collect stale ones

use console::style;
use kubesync_kube::UpdateOptions;
use std::path::PathBuf;

use super::{Session, load_manifests};
use crate::display;
use crate::error::{CliError, Result};

/// Run the update command
pub async fn run(session: &Session, paths: &[PathBuf], options: UpdateOptions) -> Result<()> {
    let objects = load_manifests(paths)?;

    if !session.json {
        println!(
            "{} Updating {} in namespace {}{}",
            style("→").blue().bold(),
            display::pluralize(objects.len(), "object", "objects"),
            style(&session.namespace).yellow(),
            if options.dry_run { " (dry run)" } else { "" }
        );
        if let Some(tag) = options.gc_enabled_tag() {
            println!("  Garbage collecting objects tagged {}", style(tag).cyan());
        }
    }

    let client = session.connect().await?;
    let report = client
        .update(&session.run_context(), objects, &options)
        .await?;

    if session.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", json);
    } else {
        display::print_update_report(&report);
    }

    Ok(())
}
