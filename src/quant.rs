use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::{Tool, Unit};
use crate::error::MergeError;
use crate::translate::Translator;
use crate::tsv::{self, HeaderTable};

/// Fixed scale parameter handed to the per-sample normalization utility.
pub const NORMALIZE_SCALE: u32 = 1000;

/// External per-sample normalization utility, invoked as a black box that
/// turns one two-column table into another.
pub trait Normalizer {
    fn normalize(&self, input: &Path, output: &Path, scale: u32) -> Result<(), MergeError>;
}

/// Runs the configured normalization command synchronously:
/// `<cmd> <input> <scale> <output>`. No timeout; a hang in the utility hangs
/// the run.
pub struct SystemNormalizer {
    cmd: String,
}

impl SystemNormalizer {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
        }
    }
}

impl Normalizer for SystemNormalizer {
    fn normalize(&self, input: &Path, output: &Path, scale: u32) -> Result<(), MergeError> {
        let result = Command::new(&self.cmd)
            .arg(input)
            .arg(scale.to_string())
            .arg(output)
            .output()
            .map_err(|err| MergeError::Normalization(format!("{}: {err}", self.cmd)))?;
        if result.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("command failed: {}", self.cmd)
        } else {
            stderr
        };
        Err(MergeError::Normalization(message))
    }
}

fn rsem_genes_results(sample_dir: &Path, sample_id: &str) -> PathBuf {
    sample_dir.join(format!("{sample_id}.genes.results"))
}

fn rsem_isoforms_results(sample_dir: &Path, sample_id: &str) -> PathBuf {
    sample_dir.join(format!("{sample_id}.isoforms.results"))
}

fn stringtie_unit_file(sample_dir: &Path, unit: Unit) -> PathBuf {
    sample_dir.join(format!("genes.{unit}.txt"))
}

/// Precondition for admitting a sample into the matrix: two tool-specific
/// per-sample files must exist non-empty. A miss is a soft skip, not an
/// error; the caller logs and moves on.
pub fn preconditions_met(sample_dir: &Path, sample_id: &str, tool: Tool) -> bool {
    match tool {
        Tool::Rsem => {
            tsv::non_empty(&rsem_genes_results(sample_dir, sample_id))
                && tsv::non_empty(&rsem_isoforms_results(sample_dir, sample_id))
        }
        Tool::Stringtie => {
            tsv::non_empty(&stringtie_unit_file(sample_dir, Unit::Tpm))
                && tsv::non_empty(&stringtie_unit_file(sample_dir, Unit::Fpkm))
        }
    }
}

/// Reads one sample's (gene id, value) records for the requested tool/unit
/// pair. Column-name lookups that fail are fatal format errors naming the
/// offending file.
pub fn read_records<N: Normalizer>(
    sample_dir: &Path,
    sample_id: &str,
    tool: Tool,
    unit: Unit,
    translator: &Translator,
    normalizer: &N,
) -> Result<Vec<(String, String)>, MergeError> {
    match (tool, unit) {
        (Tool::Rsem, Unit::Fpkm) => {
            read_rsem_normalized(sample_dir, sample_id, translator, normalizer)
        }
        (Tool::Rsem, Unit::Tpm) => read_rsem_column(sample_dir, sample_id, "TPM"),
        (Tool::Rsem, Unit::Count) => read_rsem_column(sample_dir, sample_id, "expected_count"),
        // StringTie writes one fixed-name, headerless two-column file per
        // unit; those are taken verbatim.
        (Tool::Stringtie, unit) => tsv::read_two_column(&stringtie_unit_file(sample_dir, unit)),
    }
}

fn project_rsem_column(
    sample_dir: &Path,
    sample_id: &str,
    column: &str,
) -> Result<Vec<(String, String)>, MergeError> {
    let path = rsem_genes_results(sample_dir, sample_id);
    let mut table = HeaderTable::open(&path)?;
    if table.sentinel() != "gene_id" {
        return Err(MergeError::MalformedTable {
            file: path.clone(),
            reason: format!("expected gene_id header, found {:?}", table.sentinel()),
        });
    }
    let value_col = table.column(column)?;

    let mut pairs = Vec::new();
    for row in table.rows() {
        let row = row?;
        if let (Some(gene_id), Some(value)) = (row.get(0), row.get(value_col)) {
            pairs.push((gene_id.to_string(), value.to_string()));
        }
    }
    Ok(pairs)
}

/// TPM/Count path: project the requested column through an intermediate
/// two-column table that is removed once the records are re-read.
fn read_rsem_column(
    sample_dir: &Path,
    sample_id: &str,
    column: &str,
) -> Result<Vec<(String, String)>, MergeError> {
    let pairs = project_rsem_column(sample_dir, sample_id, column)?;

    let mut intermediate = tempfile::Builder::new()
        .prefix(sample_id)
        .suffix(".projected.txt")
        .tempfile_in(sample_dir)
        .map_err(MergeError::fs)?;
    for (gene_id, value) in &pairs {
        writeln!(intermediate, "{gene_id}\t{value}").map_err(MergeError::fs)?;
    }
    intermediate.flush().map_err(MergeError::fs)?;

    // Removed on drop; the normalization path keeps its intermediates instead.
    tsv::read_two_column(intermediate.path())
}

/// FPKM path: project the FPKM column, pre-filter gene ids with no
/// display-symbol translation, hand the table to the normalization utility,
/// and use its output as the record stream. Both intermediate files stay in
/// the sample directory for inspection.
fn read_rsem_normalized<N: Normalizer>(
    sample_dir: &Path,
    sample_id: &str,
    translator: &Translator,
    normalizer: &N,
) -> Result<Vec<(String, String)>, MergeError> {
    let pairs = project_rsem_column(sample_dir, sample_id, "FPKM")?;

    let input = sample_dir.join(format!("{sample_id}.fpkm.txt"));
    let output = sample_dir.join(format!("{sample_id}.fpkm.normalized.txt"));
    let mut file = std::fs::File::create(&input).map_err(MergeError::fs)?;
    for (gene_id, value) in &pairs {
        if translator.symbol(gene_id).is_none() {
            continue;
        }
        writeln!(file, "{gene_id}\t{value}").map_err(MergeError::fs)?;
    }
    file.flush().map_err(MergeError::fs)?;

    normalizer.normalize(&input, &output, NORMALIZE_SCALE)?;
    tsv::read_two_column(&output)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use assert_matches::assert_matches;

    use super::*;

    struct CopyNormalizer {
        calls: RefCell<usize>,
    }

    impl CopyNormalizer {
        fn new() -> Self {
            Self {
                calls: RefCell::new(0),
            }
        }
    }

    impl Normalizer for CopyNormalizer {
        fn normalize(&self, input: &Path, output: &Path, scale: u32) -> Result<(), MergeError> {
            assert_eq!(scale, NORMALIZE_SCALE);
            *self.calls.borrow_mut() += 1;
            std::fs::copy(input, output).map_err(MergeError::fs)?;
            Ok(())
        }
    }

    fn rsem_sample(dir: &Path, sample_id: &str) {
        std::fs::write(
            dir.join(format!("{sample_id}.genes.results")),
            "gene_id\ttranscript_id(s)\tlength\texpected_count\tTPM\tFPKM\n\
             ENSG1\tT1\t100\t12\t1.5\t2.5\n\
             ENSG2\tT2\t200\t30\t3.5\t4.5\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(format!("{sample_id}.isoforms.results")),
            "transcript_id\tgene_id\n",
        )
        .unwrap();
    }

    #[test]
    fn rsem_tpm_projects_column_without_normalizing() {
        let dir = tempfile::tempdir().unwrap();
        rsem_sample(dir.path(), "S1");
        let translator = Translator::from_entries(&[("ENSG1", "GENEA", 1)]);
        let normalizer = CopyNormalizer::new();

        let records =
            read_records(dir.path(), "S1", Tool::Rsem, Unit::Tpm, &translator, &normalizer)
                .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ("ENSG1".to_string(), "1.5".to_string()));
        assert_eq!(*normalizer.calls.borrow(), 0);
        // The projected intermediate is cleaned up on this path.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains("projected"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn rsem_fpkm_filters_then_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        rsem_sample(dir.path(), "S1");
        let translator = Translator::from_entries(&[("ENSG1", "GENEA", 1)]);
        let normalizer = CopyNormalizer::new();

        let records =
            read_records(dir.path(), "S1", Tool::Rsem, Unit::Fpkm, &translator, &normalizer)
                .unwrap();

        assert_eq!(*normalizer.calls.borrow(), 1);
        // ENSG2 has no translation and is filtered before normalization.
        assert_eq!(records, vec![("ENSG1".to_string(), "2.5".to_string())]);
        // Normalization intermediates are retained for inspection.
        assert!(dir.path().join("S1.fpkm.txt").exists());
        assert!(dir.path().join("S1.fpkm.normalized.txt").exists());
    }

    #[test]
    fn rsem_count_uses_expected_count() {
        let dir = tempfile::tempdir().unwrap();
        rsem_sample(dir.path(), "S1");
        let translator = Translator::default();
        let normalizer = CopyNormalizer::new();

        let records = read_records(
            dir.path(),
            "S1",
            Tool::Rsem,
            Unit::Count,
            &translator,
            &normalizer,
        )
        .unwrap();

        assert_eq!(records[1], ("ENSG2".to_string(), "30".to_string()));
        assert_eq!(*normalizer.calls.borrow(), 0);
    }

    #[test]
    fn missing_value_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("S1.genes.results"),
            "gene_id\tlength\nENSG1\t100\n",
        )
        .unwrap();
        let translator = Translator::default();
        let normalizer = CopyNormalizer::new();

        let err = read_records(
            dir.path(),
            "S1",
            Tool::Rsem,
            Unit::Tpm,
            &translator,
            &normalizer,
        )
        .unwrap_err();
        assert_matches!(err, MergeError::MissingColumn { ref column, .. } if column == "TPM");
    }

    #[test]
    fn stringtie_reads_unit_file_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("genes.count.txt"), "ENSG1\t42\nENSG2\t7\n").unwrap();
        let translator = Translator::default();
        let normalizer = CopyNormalizer::new();

        let records = read_records(
            dir.path(),
            "S1",
            Tool::Stringtie,
            Unit::Count,
            &translator,
            &normalizer,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ("ENSG1".to_string(), "42".to_string()));
        assert_eq!(*normalizer.calls.borrow(), 0);
    }

    #[test]
    fn preconditions_require_both_files_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        rsem_sample(dir.path(), "S1");
        assert!(preconditions_met(dir.path(), "S1", Tool::Rsem));

        std::fs::write(dir.path().join("S1.isoforms.results"), "").unwrap();
        assert!(!preconditions_met(dir.path(), "S1", Tool::Rsem));

        assert!(!preconditions_met(dir.path(), "S2", Tool::Rsem));

        std::fs::write(dir.path().join("genes.tpm.txt"), "ENSG1\t1.0\n").unwrap();
        assert!(!preconditions_met(dir.path(), "S1", Tool::Stringtie));
        std::fs::write(dir.path().join("genes.fpkm.txt"), "ENSG1\t2.0\n").unwrap();
        assert!(preconditions_met(dir.path(), "S1", Tool::Stringtie));
    }
}
