use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::domain::ColumnRange;
use crate::error::MergeError;
use crate::translate::Translator;

/// Extracts one group's column block from a finished matrix and writes the
/// finalized per-group file: `Hugo_Symbol`, the secondary numeric gene id
/// (sentinel 0 when the symbol has no entry), then the in-range sample
/// columns. Pure function of its inputs, so re-splitting the same matrix and
/// range is byte-identical.
pub fn split_group(
    matrix: &Path,
    range: ColumnRange,
    translator: &Translator,
    out_path: &Path,
) -> Result<(), MergeError> {
    let source = File::open(matrix)
        .map_err(|err| MergeError::Filesystem(format!("open {}: {err}", matrix.display())))?;
    let mut lines = BufReader::new(source).lines();

    let out = File::create(out_path)
        .map_err(|err| MergeError::Filesystem(format!("create {}: {err}", out_path.display())))?;
    let mut out = BufWriter::new(out);

    let header = lines
        .next()
        .transpose()
        .map_err(MergeError::fs)?
        .ok_or_else(|| MergeError::MalformedTable {
            file: matrix.to_path_buf(),
            reason: "empty matrix".to_string(),
        })?;
    let fields: Vec<&str> = header.split('\t').collect();
    out.write_all(b"Hugo_Symbol\tEntrez_Gene_Id").map_err(MergeError::fs)?;
    for field in select(&fields, range) {
        write!(out, "\t{field}").map_err(MergeError::fs)?;
    }
    out.write_all(b"\n").map_err(MergeError::fs)?;

    for line in lines {
        let line = line.map_err(MergeError::fs)?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let symbol = fields.first().copied().unwrap_or("");
        let secondary = translator.secondary_id(symbol);
        write!(out, "{symbol}\t{secondary}").map_err(MergeError::fs)?;
        for field in select(&fields, range) {
            write!(out, "\t{field}").map_err(MergeError::fs)?;
        }
        out.write_all(b"\n").map_err(MergeError::fs)?;
    }
    out.flush().map_err(MergeError::fs)
}

/// Selects the 1-indexed inclusive column range from a tab-split row. The
/// leading identifier column is handled by the caller.
fn select<'a>(fields: &'a [&'a str], range: ColumnRange) -> impl Iterator<Item = &'a str> {
    fields
        .iter()
        .copied()
        .skip(range.start - 1)
        .take(range.width())
}
