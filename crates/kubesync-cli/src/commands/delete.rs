//! Delete command - remove objects in reverse dependency order

use console::style;
use kubesync_kube::DeleteCommandOptions;
use std::path::PathBuf;

use super::{Session, load_manifests};
use crate::display;
use crate::error::{CliError, Result};

/// Run the delete command
pub async fn run(session: &Session, paths: &[PathBuf], options: DeleteCommandOptions) -> Result<()> {
    let objects = load_manifests(paths)?;

    if !session.json {
        println!(
            "{} Deleting {} from namespace {}{}",
            style("→").blue().bold(),
            display::pluralize(objects.len(), "object", "objects"),
            style(&session.namespace).yellow(),
            if options.dry_run { " (dry run)" } else { "" }
        );
    }

    let client = session.connect().await?;
    let report = client
        .delete(&session.run_context(), objects, &options)
        .await?;

    if session.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", json);
    } else {
        display::print_delete_report(&report);
    }

    Ok(())
}
