use std::collections::HashMap;
use std::path::Path;

use crate::error::MergeError;
use crate::tsv;

/// Gene identifier translation tables, loaded once per run from a 3-column
/// table: source gene id, display symbol, secondary numeric id.
///
/// The id-to-symbol mapping is many-to-one onto symbols; gene ids with no
/// entry are dropped from the matrix entirely. A symbol with no secondary id
/// falls back to the sentinel 0, which is never an error.
#[derive(Debug, Default)]
pub struct Translator {
    symbol_by_id: HashMap<String, String>,
    secondary_by_symbol: HashMap<String, u64>,
}

impl Translator {
    pub fn load(path: &Path) -> Result<Self, MergeError> {
        let mut translator = Translator::default();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(tsv::open_reader(path)?);

        for record in reader.records() {
            let record =
                record.map_err(|_| MergeError::TranslationTable(path.to_path_buf()))?;
            let (Some(gene_id), Some(symbol)) = (record.get(0), record.get(1)) else {
                return Err(MergeError::TranslationTable(path.to_path_buf()));
            };
            if gene_id.is_empty() || symbol.is_empty() {
                continue;
            }
            translator
                .symbol_by_id
                .insert(gene_id.to_string(), symbol.to_string());
            if let Some(secondary) = record.get(2).and_then(|field| field.parse::<u64>().ok()) {
                translator
                    .secondary_by_symbol
                    .insert(symbol.to_string(), secondary);
            }
        }
        Ok(translator)
    }

    pub fn symbol(&self, gene_id: &str) -> Option<&str> {
        self.symbol_by_id.get(gene_id).map(String::as_str)
    }

    pub fn secondary_id(&self, symbol: &str) -> u64 {
        self.secondary_by_symbol.get(symbol).copied().unwrap_or(0)
    }

    /// Builds a table from in-memory entries; a secondary id of 0 stands for
    /// "no entry", matching the sentinel returned by [`Translator::secondary_id`].
    pub fn from_entries(entries: &[(&str, &str, u64)]) -> Self {
        let mut translator = Translator::default();
        for (gene_id, symbol, secondary) in entries {
            translator
                .symbol_by_id
                .insert(gene_id.to_string(), symbol.to_string());
            if *secondary != 0 {
                translator
                    .secondary_by_symbol
                    .insert(symbol.to_string(), *secondary);
            }
        }
        translator
    }
}
