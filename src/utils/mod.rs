//! Utilities (source loading, artifact export).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::execution::Outcome;

/// Read a source file to run.
/// Currently supports .py, .txt, and files without extension.
pub fn read_source(file_path: &str) -> Result<String> {
    let path = Path::new(file_path);

    if !path.exists() {
        bail!("Source file '{}' does not exist", file_path);
    }
    if !path.is_file() {
        bail!("'{}' is not a file", file_path);
    }

    let extension = path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "py" | "txt" | "" => fs::read_to_string(path)
            .with_context(|| format!("Failed to read file '{}'", file_path)),
        _ => {
            bail!("Unsupported file type: .{}\nCurrently supported: .py, .txt, and files without extension", extension);
        }
    }
}

/// Write every artifact of `outcome` into `dir` as `artifact-<request>-<n>.<ext>`.
pub fn write_artifacts(outcome: &Outcome, dir: &Path) -> Result<Vec<PathBuf>> {
    if outcome.artifacts.is_empty() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(dir).with_context(|| format!("creating artifact directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(outcome.artifacts.len());
    for (n, art) in outcome.artifacts.iter().enumerate() {
        let path = dir.join(format!("artifact-{}-{}.{}", outcome.request_id.0, n + 1, art.extension()));
        fs::write(&path, art.decode()?).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
