use std::collections::HashMap;
use std::path::Path;

use regex::Regex;

use crate::error::MergeError;
use crate::tsv::HeaderTable;

/// Dialect A: SRA run metadata exported alongside the source directory.
pub const SRA_RUN_TABLE: &str = "SraRunTable.txt";
/// Dialect B: CGHub-style analysis summary.
pub const ANALYSIS_SUMMARY: &str = "summary.tsv";

const SRA_SENTINEL: &str = "Assay_Type_s";
const SUMMARY_MARKER: &str = r"^study";

/// Maps internal sample/run identifiers to human-readable barcodes using
/// whichever metadata dialect is present next to the source directory.
///
/// Column names are matched exactly (case-sensitive) against the header row;
/// a miss is a fatal format error naming the file. A directory with neither
/// metadata file is a fatal format error naming the directory.
pub fn resolve_barcodes(dir: &Path) -> Result<HashMap<String, String>, MergeError> {
    let sra_path = dir.join(SRA_RUN_TABLE);
    if sra_path.is_file() {
        return read_sra_run_table(&sra_path);
    }

    let summary_path = dir.join(ANALYSIS_SUMMARY);
    if summary_path.is_file() {
        return read_analysis_summary(&summary_path);
    }

    Err(MergeError::MetadataDialect(dir.to_path_buf()))
}

fn read_sra_run_table(path: &Path) -> Result<HashMap<String, String>, MergeError> {
    let mut table = HeaderTable::open(path)?;
    if table.sentinel() != SRA_SENTINEL {
        return Err(MergeError::MetadataDialect(path.to_path_buf()));
    }
    let run_col = table.column("Run_s")?;
    let name_col = table.column("Sample_Name_s")?;

    let mut barcodes = HashMap::new();
    for row in table.rows() {
        let row = row?;
        if let (Some(run), Some(name)) = (row.get(run_col), row.get(name_col)) {
            barcodes.insert(run.to_string(), name.to_string());
        }
    }
    Ok(barcodes)
}

fn read_analysis_summary(path: &Path) -> Result<HashMap<String, String>, MergeError> {
    let mut table = HeaderTable::open(path)?;
    let marker = Regex::new(SUMMARY_MARKER).map_err(MergeError::fs)?;
    if !marker.is_match(table.sentinel()) {
        return Err(MergeError::MetadataDialect(path.to_path_buf()));
    }
    let id_col = table.column("analysis_id")?;
    let barcode_col = table.column("barcode")?;

    let mut barcodes = HashMap::new();
    for row in table.rows() {
        let row = row?;
        if let (Some(id), Some(barcode)) = (row.get(id_col), row.get(barcode_col)) {
            barcodes.insert(id.to_string(), barcode.to_string());
        }
    }
    Ok(barcodes)
}
