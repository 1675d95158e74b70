use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Quantification tool whose per-sample output dialect we can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Rsem,
    Stringtie,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Rsem => write!(f, "rsem"),
            Tool::Stringtie => write!(f, "stringtie"),
        }
    }
}

impl FromStr for Tool {
    type Err = MergeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rsem" => Ok(Tool::Rsem),
            "stringtie" => Ok(Tool::Stringtie),
            _ => Err(MergeError::ConfigParse(format!("unknown tool: {value}"))),
        }
    }
}

/// Expression unit carried through the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Tpm,
    Count,
    Fpkm,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Tpm => write!(f, "tpm"),
            Unit::Count => write!(f, "count"),
            Unit::Fpkm => write!(f, "fpkm"),
        }
    }
}

impl FromStr for Unit {
    type Err = MergeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tpm" => Ok(Unit::Tpm),
            "count" | "counts" => Ok(Unit::Count),
            "fpkm" => Ok(Unit::Fpkm),
            _ => Err(MergeError::ConfigParse(format!("unknown unit: {value}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Normal,
    Tumor,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Normal => write!(f, "normal"),
            Condition::Tumor => write!(f, "tumor"),
        }
    }
}

/// One provenance group: a tissue/cohort source directory with its declared
/// condition and batch label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub path: PathBuf,
    pub condition: Condition,
    pub batch: String,
}

/// A named, ordered list of provenance groups processed in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub groups: Vec<GroupSpec>,
}

/// Where one group's samples landed in the matrix: a 1-indexed inclusive
/// span over tab-separated fields, where column 1 is the gene identifier
/// column. Recorded once, never resorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn width(&self) -> usize {
        self.end + 1 - self.start
    }
}
