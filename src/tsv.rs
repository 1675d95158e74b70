use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;

use crate::error::MergeError;

/// Opens a tab-delimited file, transparently decompressing `.gz` paths.
pub fn open_reader(path: &Path) -> Result<Box<dyn Read>, MergeError> {
    let file = File::open(path)
        .map_err(|err| MergeError::Filesystem(format!("open {}: {err}", path.display())))?;
    let gz = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if gz {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Streaming reader over a tab-delimited table with a header row. Column
/// positions are resolved by exact name once, up front, and a lookup miss is
/// a format error naming the file.
pub struct HeaderTable {
    path: PathBuf,
    header: StringRecord,
    reader: csv::Reader<Box<dyn Read>>,
}

impl HeaderTable {
    pub fn open(path: &Path) -> Result<Self, MergeError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(open_reader(path)?);
        let header = reader
            .headers()
            .map_err(|err| MergeError::MalformedTable {
                file: path.to_path_buf(),
                reason: err.to_string(),
            })?
            .clone();
        Ok(Self {
            path: path.to_path_buf(),
            header,
            reader,
        })
    }

    /// First header field, used for dialect sentinels.
    pub fn sentinel(&self) -> &str {
        self.header.get(0).unwrap_or("")
    }

    pub fn column(&self, name: &str) -> Result<usize, MergeError> {
        self.header
            .iter()
            .position(|field| field == name)
            .ok_or_else(|| MergeError::MissingColumn {
                file: self.path.clone(),
                column: name.to_string(),
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&mut self) -> impl Iterator<Item = Result<StringRecord, MergeError>> + '_ {
        let path = self.path.clone();
        self.reader.records().map(move |record| {
            record.map_err(|err| MergeError::MalformedTable {
                file: path.clone(),
                reason: err.to_string(),
            })
        })
    }
}

/// Reads a headerless two-column table verbatim as (key, value) pairs. Rows
/// with fewer than two fields are rejected as malformed.
pub fn read_two_column(path: &Path) -> Result<Vec<(String, String)>, MergeError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(open_reader(path)?);

    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| MergeError::MalformedTable {
            file: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        match (record.get(0), record.get(1)) {
            (Some(key), Some(value)) => pairs.push((key.to_string(), value.to_string())),
            _ => {
                return Err(MergeError::MalformedTable {
                    file: path.to_path_buf(),
                    reason: format!("expected 2 columns, got {}", record.len()),
                });
            }
        }
    }
    Ok(pairs)
}

/// True when the file exists and has at least one byte of content.
pub fn non_empty(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.len() > 0)
        .unwrap_or(false)
}
