//! Component 1 – everything read from disk before generation starts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::generator::SourceFile;

/// Reads a JSON config file. Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<GeneratorConfig> {
    let json = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    GeneratorConfig::from_json(&json)
        .with_context(|| format!("Parsing config {}", path.display()))
}

/// Every `.py` file at or below `input`, sorted by path.
///
/// A single file is returned as is, whatever its extension.
pub fn discover(input: &Path) -> Result<Vec<PathBuf>> {
    let metadata =
        fs::metadata(input).with_context(|| format!("Reading {}", input.display()))?;
    if metadata.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !metadata.is_dir() {
        return Err(anyhow!("{} is neither a file nor a directory", input.display()));
    }

    let mut found = Vec::new();
    walk(input, &mut found)?;
    found.sort();
    debug!(count = found.len(), root = %input.display(), "discovered modules");
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("Listing {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Listing {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            // Skip caches and virtual environments (`__pycache__`, `.venv`).
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || name == "__pycache__" {
                continue;
            }
            walk(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext == "py") {
            found.push(path);
        }
    }
    Ok(())
}

/// Loads the discovered files with their modification times.
pub fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    paths
        .iter()
        .map(|path| SourceFile::read(path).with_context(|| format!("Reading {}", path.display())))
        .collect()
}
