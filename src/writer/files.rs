//! Writes generated modules to the output directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use super::rust::GENERATED_MARKER;
use crate::generator::FileOutput;

pub const INDEX_FILE: &str = "mod.rs";

const GENERATED_SUFFIX: &str = ".py.rs";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub written: Vec<String>,
    pub unchanged: Vec<String>,
    /// Generated files no input maps to any more.
    pub removed: Vec<String>,
}

/// Writes every output that has source, plus a `mod.rs` including them.
///
/// Files whose content is already current are left alone, so their
/// timestamps only move when the bindings actually change. Generated files
/// left behind by deleted or renamed modules are removed; an output that
/// failed this time keeps its previous file.
pub fn emit(outputs: &[FileOutput], out_dir: &Path) -> Result<EmitSummary> {
    fs::create_dir_all(out_dir).with_context(|| format!("Creating {}", out_dir.display()))?;

    let mut summary = EmitSummary::default();
    let mut included: Vec<&str> = Vec::new();
    for output in outputs {
        let Some(source) = &output.source else {
            continue;
        };
        write_if_changed(out_dir, &output.file_name, source, &mut summary)?;
        included.push(&output.file_name);
    }

    included.sort_unstable();
    write_if_changed(out_dir, INDEX_FILE, &index(&included), &mut summary)?;

    let known: Vec<&str> = outputs.iter().map(|o| o.file_name.as_str()).collect();
    remove_stale(out_dir, &known, &mut summary)?;

    info!(
        written = summary.written.len(),
        unchanged = summary.unchanged.len(),
        removed = summary.removed.len(),
        "output written"
    );
    Ok(summary)
}

fn index(files: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_MARKER);
    out.push('\n');
    for file in files {
        out.push_str(&format!("include!({file:?});\n"));
    }
    out
}

fn write_if_changed(dir: &Path, name: &str, content: &str, summary: &mut EmitSummary) -> Result<()> {
    let path = dir.join(name);
    match fs::read_to_string(&path) {
        Ok(existing) if existing == content => {
            debug!(file = name, "unchanged");
            summary.unchanged.push(name.to_string());
            return Ok(());
        }
        Ok(existing) if !existing.starts_with(GENERATED_MARKER) => {
            bail!("Refusing to overwrite {}: not a generated file", path.display());
        }
        _ => {}
    }

    fs::write(&path, content).with_context(|| format!("Writing {}", path.display()))?;
    debug!(file = name, "written");
    summary.written.push(name.to_string());
    Ok(())
}

fn remove_stale(dir: &Path, known: &[&str], summary: &mut EmitSummary) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("Reading {}", dir.display()))?;
    let mut stale = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Reading {}", dir.display()))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(GENERATED_SUFFIX) || known.contains(&name) || !path.is_file() {
            continue;
        }
        // Hand-written files that happen to share the suffix stay.
        let generated = fs::read_to_string(&path)
            .map(|text| text.starts_with(GENERATED_MARKER))
            .unwrap_or(false);
        if generated {
            stale.push(name.to_string());
        }
    }

    stale.sort_unstable();
    for name in stale {
        let path = dir.join(&name);
        fs::remove_file(&path).with_context(|| format!("Removing {}", path.display()))?;
        debug!(file = %name, "removed");
        summary.removed.push(name);
    }
    Ok(())
}
