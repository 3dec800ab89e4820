//! Validate command - check manifests against server schemas

use console::style;
use kubesync_kube::ValidateOptions;
use std::path::PathBuf;

use super::{Session, load_manifests};
use crate::display;
use crate::error::Result;

/// Run the validate command
pub async fn run(session: &Session, paths: &[PathBuf], options: ValidateOptions) -> Result<()> {
    let objects = load_manifests(paths)?;

    if !session.json {
        println!(
            "{} Validating {}",
            style("→").blue().bold(),
            display::pluralize(objects.len(), "object", "objects")
        );
    }

    let client = session.connect().await?;
    client
        .validate(&session.run_context(), &objects, &options)
        .await?;

    if session.json {
        println!(
            "{}",
            serde_json::json!({"valid": true, "objects": objects.len()})
        );
    } else {
        println!();
        println!("{} Validation passed", style("✓").green().bold());
    }

    Ok(())
}
