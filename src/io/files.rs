//! Input enumeration — expand files and directories into a concrete list
//! of sequence files.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Extensions recognized as sequence files, optionally `.gz`-suffixed.
const SEQUENCE_EXTENSIONS: &[&str] = &["fa", "fasta", "fna", "fq", "fastq"];

/// Whether a path looks like a sequence file by extension.
fn is_sequence_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };
    let name = name.strip_suffix(".gz").unwrap_or(name);
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && SEQUENCE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        }
        None => false,
    }
}

/// Expand the given inputs into sequence file paths.
///
/// Explicit file paths are taken as-is; directories contribute the
/// sequence files they contain, descending into sub-directories only when
/// `recursive` is set. The result is sorted and deduplicated; an empty
/// result is an error.
pub fn resolve_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let meta = std::fs::metadata(input)
            .with_context(|| format!("cannot access input path {}", input.display()))?;
        if meta.is_dir() {
            collect_dir(input, recursive, &mut files)?;
        } else {
            files.push(input.clone());
        }
    }

    files.sort();
    files.dedup();
    if files.is_empty() {
        bail!("no sequence files resolved from the given inputs");
    }
    Ok(files)
}

fn collect_dir(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read directory {}", dir.display()))?;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("cannot read directory entry in {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if recursive {
                collect_dir(&path, recursive, out)?;
            }
        } else if is_sequence_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
