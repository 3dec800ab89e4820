//! Manifest loading from local files
//!
//! Reads YAML or JSON files (or whole directories of them) into [`ApiObject`]s,
//! preserving the order in which objects appear. Multi-document YAML streams are
//! split, empty documents are skipped and `List` documents are flattened into
//! their items.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::object::ApiObject;

/// File extensions picked up when walking a directory
const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Load every object from a list of files or directories, in order
///
/// Directories are walked recursively and their files are read in sorted path
/// order so that runs are reproducible.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ApiObject>> {
    let mut objects = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::ManifestNotFound {
                path: path.display().to_string(),
            });
        }

        for file in manifest_files(path)? {
            let content = std::fs::read_to_string(&file)?;
            objects.extend(parse_documents(&content, &file.display().to_string())?);
        }
    }

    Ok(objects)
}

/// Collect manifest files under a path (the path itself if it is a file)
fn manifest_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file()
            && let Some(ext) = path.extension()
        {
            let ext = ext.to_string_lossy().to_lowercase();
            if MANIFEST_EXTENSIONS.contains(&ext.as_str()) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Parse a YAML (or JSON) stream into objects
///
/// `source_name` is only used in error messages.
pub fn parse_documents(content: &str, source_name: &str) -> Result<Vec<ApiObject>> {
    let mut objects = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = Value::deserialize(document).map_err(|e| CoreError::InvalidManifest {
            source_name: source_name.to_string(),
            index,
            message: e.to_string(),
        })?;

        if value.is_null() {
            continue;
        }

        flatten_into(value, &mut objects).map_err(|e| CoreError::InvalidManifest {
            source_name: source_name.to_string(),
            index,
            message: e.to_string(),
        })?;
    }

    Ok(objects)
}

/// Push an object, or the items of a `List`, onto `out`
fn flatten_into(value: Value, out: &mut Vec<ApiObject>) -> Result<()> {
    if is_list(&value) {
        let items = match value {
            Value::Object(mut map) => map.remove("items"),
            _ => None,
        };
        if let Some(Value::Array(items)) = items {
            for item in items {
                flatten_into(item, out)?;
            }
        }
        return Ok(());
    }

    out.push(ApiObject::from_value(value)?);
    Ok(())
}

/// `v1/List` and typed lists such as `ConfigMapList`
fn is_list(value: &Value) -> bool {
    let kind = value.get("kind").and_then(Value::as_str).unwrap_or("");
    kind.ends_with("List") && value.get("items").is_some_and(Value::is_array)
}
