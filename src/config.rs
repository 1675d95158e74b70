use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{Cluster, Condition, GroupSpec};
use crate::error::MergeError;

/// On-disk run configuration. Cluster rows point at provenance-group source
/// directories; everything else is paths and external tool commands.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub work_dir: PathBuf,
    pub translation_table: PathBuf,
    #[serde(default = "default_normalize_cmd")]
    pub normalize_cmd: String,
    #[serde(default = "default_correct_cmd")]
    pub correct_cmd: String,
    #[serde(default)]
    pub clusters: Vec<ClusterEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ClusterEntry {
    pub name: String,
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GroupEntry {
    pub name: String,
    pub path: PathBuf,
    pub condition: Condition,
    pub batch: String,
}

fn default_normalize_cmd() -> String {
    "quartile_norm.pl".to_string()
}

fn default_correct_cmd() -> String {
    "run_combat.R".to_string()
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: &str) -> Result<Config, MergeError> {
        let config_path = PathBuf::from(path);
        let content = fs::read_to_string(&config_path)
            .map_err(|_| MergeError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| MergeError::ConfigParse(err.to_string()))
    }

    /// Selects a cluster by name prefix. Zero matches and multiple matches are
    /// both configuration errors, reported before any matrix work begins.
    pub fn select_cluster(config: &Config, name: &str) -> Result<Cluster, MergeError> {
        let matches: Vec<&ClusterEntry> = config
            .clusters
            .iter()
            .filter(|entry| entry.name.starts_with(name))
            .collect();

        match matches.as_slice() {
            [] => Err(MergeError::ClusterNotFound(name.to_string())),
            [entry] => Ok(Cluster {
                name: entry.name.clone(),
                groups: entry
                    .groups
                    .iter()
                    .map(|group| GroupSpec {
                        name: group.name.clone(),
                        path: group.path.clone(),
                        condition: group.condition,
                        batch: group.batch.clone(),
                    })
                    .collect(),
            }),
            many => Err(MergeError::AmbiguousCluster {
                name: name.to_string(),
                matches: many.iter().map(|entry| entry.name.clone()).collect(),
            }),
        }
    }
}
