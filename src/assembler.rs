use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::{ColumnRange, Condition};
use crate::error::MergeError;
use crate::translate::Translator;

/// Accumulates the global gene-by-sample matrix.
///
/// The sample sequence is append-only: a sample's ordinal position is assigned
/// once, at first append, and the header line grows by one column at the same
/// moment. Column ranges recorded for finished groups therefore stay valid for
/// the whole run without any resorting.
pub struct MatrixAssembler {
    path: PathBuf,
    out: BufWriter<File>,
    samples: Vec<String>,
    /// Sparse store: gene id -> (sample ordinal -> value). Cells never
    /// populated stay absent and serialize as empty fields, not zeros.
    values: BTreeMap<String, HashMap<usize, String>>,
    annotations: Vec<(Condition, String)>,
    ranges: Vec<(String, ColumnRange)>,
}

impl MatrixAssembler {
    /// Opens the matrix output stream and writes the leading identifier
    /// column of the header.
    pub fn create(path: &Path) -> Result<Self, MergeError> {
        let file = File::create(path)
            .map_err(|err| MergeError::Filesystem(format!("create {}: {err}", path.display())))?;
        let mut out = BufWriter::new(file);
        out.write_all(b"Gene").map_err(MergeError::fs)?;
        Ok(Self {
            path: path.to_path_buf(),
            out,
            samples: Vec::new(),
            values: BTreeMap::new(),
            annotations: Vec::new(),
            ranges: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Appends one sample column and its batch annotation, returning the
    /// sample's ordinal position. Annotation order mirrors append order, so
    /// the two sequences always have equal length.
    pub fn append_sample(
        &mut self,
        barcode: &str,
        condition: Condition,
        batch: &str,
    ) -> Result<usize, MergeError> {
        write!(self.out, "\t{barcode}").map_err(MergeError::fs)?;
        self.samples.push(barcode.to_string());
        self.annotations.push((condition, batch.to_string()));
        Ok(self.samples.len() - 1)
    }

    pub fn set_value(&mut self, sample: usize, gene_id: &str, value: &str) {
        self.values
            .entry(gene_id.to_string())
            .or_default()
            .insert(sample, value.to_string());
    }

    /// Records the contiguous column block a finished group owns. `prior` is
    /// the sample count taken before the group started contributing; the +2
    /// offset accounts for the leading identifier column and 1-based
    /// indexing. Ranges are immutable once recorded.
    pub fn record_group(&mut self, group: &str, prior: usize) -> ColumnRange {
        let range = ColumnRange {
            start: prior + 2,
            end: self.samples.len() + 1,
        };
        self.ranges.push((group.to_string(), range));
        range
    }

    pub fn ranges(&self) -> &[(String, ColumnRange)] {
        &self.ranges
    }

    pub fn annotations(&self) -> &[(Condition, String)] {
        &self.annotations
    }

    /// Emits the matrix body and closes the stream. One row per gene with a
    /// display-symbol translation, in sorted gene-id order; untranslated gene
    /// ids never appear in the output, not even under their raw identifier.
    pub fn finish(mut self, translator: &Translator) -> Result<(), MergeError> {
        self.out.write_all(b"\n").map_err(MergeError::fs)?;

        for (gene_id, row) in &self.values {
            let Some(symbol) = translator.symbol(gene_id) else {
                continue;
            };
            self.out.write_all(symbol.as_bytes()).map_err(MergeError::fs)?;
            for sample in 0..self.samples.len() {
                match row.get(&sample) {
                    Some(value) => {
                        write!(self.out, "\t{value}").map_err(MergeError::fs)?;
                    }
                    None => {
                        self.out.write_all(b"\t").map_err(MergeError::fs)?;
                    }
                }
            }
            self.out.write_all(b"\n").map_err(MergeError::fs)?;
        }
        self.out.flush().map_err(MergeError::fs)
    }

    /// Removes the partially written matrix file. Called on any fatal error
    /// after the stream was opened.
    pub fn discard(self) -> Result<(), MergeError> {
        let MatrixAssembler { path, out, .. } = self;
        drop(out);
        std::fs::remove_file(&path)
            .map_err(|err| MergeError::Filesystem(format!("remove {}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler(dir: &Path) -> MatrixAssembler {
        MatrixAssembler::create(&dir.join("matrix.tsv")).unwrap()
    }

    #[test]
    fn ranges_are_contiguous_and_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut asm = assembler(dir.path());

        let prior = asm.sample_count();
        asm.append_sample("A", Condition::Normal, "gtex").unwrap();
        asm.append_sample("B", Condition::Normal, "gtex").unwrap();
        let first = asm.record_group("gtex", prior);

        let prior = asm.sample_count();
        asm.append_sample("C", Condition::Tumor, "tcga").unwrap();
        asm.append_sample("D", Condition::Tumor, "tcga").unwrap();
        let second = asm.record_group("tcga", prior);

        assert_eq!(first, ColumnRange { start: 2, end: 3 });
        assert_eq!(second, ColumnRange { start: 4, end: 5 });
        assert_eq!(first.width(), 2);
        assert_eq!(second.width(), 2);
        assert!(second.start > first.end);
    }

    #[test]
    fn annotations_track_sample_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut asm = assembler(dir.path());

        asm.append_sample("A", Condition::Normal, "gtex").unwrap();
        asm.append_sample("B", Condition::Tumor, "tcga").unwrap();

        assert_eq!(asm.annotations().len(), asm.sample_count());
        assert_eq!(asm.annotations()[0], (Condition::Normal, "gtex".to_string()));
        assert_eq!(asm.annotations()[1], (Condition::Tumor, "tcga".to_string()));
    }

    #[test]
    fn untranslated_genes_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.tsv");
        let mut asm = MatrixAssembler::create(&path).unwrap();
        let idx = asm.append_sample("A", Condition::Normal, "gtex").unwrap();
        asm.set_value(idx, "ENSG1", "1.5");
        asm.set_value(idx, "ENSG_UNKNOWN", "9.9");

        let translator = Translator::from_entries(&[("ENSG1", "GENEA", 100)]);
        asm.finish(&translator).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Gene\tA\nGENEA\t1.5\n");
        assert!(!content.contains("ENSG_UNKNOWN"));
    }

    #[test]
    fn missing_cells_serialize_as_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.tsv");
        let mut asm = MatrixAssembler::create(&path).unwrap();
        let a = asm.append_sample("A", Condition::Normal, "gtex").unwrap();
        let b = asm.append_sample("B", Condition::Normal, "gtex").unwrap();
        asm.set_value(a, "ENSG1", "1.5");
        asm.set_value(b, "ENSG2", "2.5");

        let translator =
            Translator::from_entries(&[("ENSG1", "GENEA", 1), ("ENSG2", "GENEB", 2)]);
        asm.finish(&translator).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Gene\tA\tB\nGENEA\t1.5\t\nGENEB\t\t2.5\n");
    }

    #[test]
    fn discard_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.tsv");
        let mut asm = MatrixAssembler::create(&path).unwrap();
        asm.append_sample("A", Condition::Normal, "gtex").unwrap();
        asm.discard().unwrap();
        assert!(!path.exists());
    }
}
