use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::assembler::MatrixAssembler;
use crate::barcode;
use crate::domain::{GroupSpec, Tool, Unit};
use crate::error::MergeError;
use crate::quant::{self, Normalizer};
use crate::translate::Translator;

/// Per-group sample manifest: one sample identifier per line, first
/// tab-delimited field used.
pub const SAMPLE_MANIFEST: &str = "filtered_samples.txt";

fn read_manifest(dir: &Path) -> Result<Vec<String>, MergeError> {
    let path = dir.join(SAMPLE_MANIFEST);
    let content = fs::read_to_string(&path).map_err(|_| MergeError::Manifest(path.clone()))?;
    Ok(content
        .lines()
        .filter_map(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect())
}

/// Processes one provenance group: resolves its manifest and barcodes, reads
/// each sample's quantification records, and appends the survivors to the
/// assembler. Returns the number of samples newly appended.
///
/// A group whose canonical directory path was already processed contributes
/// nothing on repeat, even across cluster rows that reference the same
/// physical directory under different names.
pub fn process_group<N: Normalizer>(
    spec: &GroupSpec,
    tool: Tool,
    unit: Unit,
    translator: &Translator,
    normalizer: &N,
    visited: &mut HashSet<PathBuf>,
    assembler: &mut MatrixAssembler,
) -> Result<usize, MergeError> {
    let canonical = spec
        .path
        .canonicalize()
        .map_err(|err| MergeError::Filesystem(format!("{}: {err}", spec.path.display())))?;
    if !visited.insert(canonical) {
        info!(group = %spec.name, path = %spec.path.display(), "source directory already processed, skipping");
        return Ok(0);
    }

    let samples = read_manifest(&spec.path)?;
    let barcodes = barcode::resolve_barcodes(&spec.path)?;
    info!(group = %spec.name, samples = samples.len(), "processing group");

    let mut appended = 0;
    for sample_id in &samples {
        let sample_dir = spec.path.join(sample_id);
        if !quant::preconditions_met(&sample_dir, sample_id, tool) {
            warn!(group = %spec.name, sample = %sample_id, "required per-sample files missing or empty, skipping sample");
            continue;
        }

        let records = quant::read_records(
            &sample_dir,
            sample_id,
            tool,
            unit,
            translator,
            normalizer,
        )?;
        let label = barcodes
            .get(sample_id)
            .map(String::as_str)
            .unwrap_or(sample_id);
        let ordinal = assembler.append_sample(label, spec.condition, &spec.batch)?;
        debug!(sample = %sample_id, records = records.len(), "read quantification records");
        for (gene_id, value) in &records {
            assembler.set_value(ordinal, gene_id, value);
        }
        appended += 1;
    }

    Ok(appended)
}
