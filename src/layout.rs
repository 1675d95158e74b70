use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{GroupSpec, Tool, Unit};
use crate::error::MergeError;

/// Derives every output path of a run deterministically from the work
/// directory, cluster identity, tool, and unit.
#[derive(Debug, Clone)]
pub struct Layout {
    work_dir: Utf8PathBuf,
}

impl Layout {
    pub fn new(work_dir: &Path) -> Result<Self, MergeError> {
        let work_dir = Utf8PathBuf::from_path_buf(work_dir.to_path_buf())
            .map_err(|_| MergeError::Filesystem("non-utf8 work directory".to_string()))?;
        Ok(Self { work_dir })
    }

    pub fn work_dir(&self) -> &Utf8Path {
        &self.work_dir
    }

    pub fn ensure_work_dir(&self) -> Result<(), MergeError> {
        std::fs::create_dir_all(self.work_dir.as_std_path()).map_err(MergeError::fs)
    }

    pub fn matrix_path(&self, cluster: &str, tool: Tool, unit: Unit) -> PathBuf {
        self.work_dir
            .join(format!("{cluster}.{tool}.{unit}.matrix.tsv"))
            .into_std_path_buf()
    }

    pub fn corrected_path(&self, cluster: &str, tool: Tool, unit: Unit) -> PathBuf {
        self.work_dir
            .join(format!("{cluster}.{tool}.{unit}.matrix.corrected.tsv"))
            .into_std_path_buf()
    }

    pub fn batch_path(&self, cluster: &str, tool: Tool, unit: Unit) -> PathBuf {
        self.work_dir
            .join(format!("{cluster}.{tool}.{unit}.batches.tsv"))
            .into_std_path_buf()
    }

    /// Per-group split output, suffixed with the group's condition role.
    pub fn split_path(&self, group: &GroupSpec, tool: Tool, unit: Unit) -> PathBuf {
        self.work_dir
            .join(format!(
                "{name}.{tool}.{unit}.{condition}.tsv",
                name = group.name,
                condition = group.condition
            ))
            .into_std_path_buf()
    }
}
