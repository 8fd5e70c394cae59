use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

pub const DOCUMENT_FILE_NAME: &str = "cdk.tf.json";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Location of the synthesized document for `stack_name` below `out_dir`.
pub fn document_path(out_dir: &Path, stack_name: &str) -> PathBuf {
    out_dir
        .join("stacks")
        .join(stack_name)
        .join(DOCUMENT_FILE_NAME)
}

/// Writes `document` to its location under `out_dir` and returns the path written.
pub fn write(out_dir: &Path, stack_name: &str, document: &Value) -> Result<PathBuf, Error> {
    let path = document_path(out_dir, stack_name);
    let file_contents = serde_json::to_string_pretty(document)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    fs::write(&path, file_contents).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), "document written");

    return Ok(path);
}
