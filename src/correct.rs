use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::domain::Condition;
use crate::error::MergeError;
use crate::tsv;

/// External batch-effect correction procedure. Consumes the assembled matrix
/// and the parallel batch-annotation file, produces the corrected matrix.
pub trait CorrectionRunner {
    fn correct(&self, matrix: &Path, batches: &Path, output: &Path) -> Result<(), MergeError>;
}

/// Runs the configured correction command synchronously:
/// `<cmd> <matrix> <batches> <output>`. No timeout, no retries.
pub struct SystemCorrectionRunner {
    cmd: String,
}

impl SystemCorrectionRunner {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
        }
    }
}

impl CorrectionRunner for SystemCorrectionRunner {
    fn correct(&self, matrix: &Path, batches: &Path, output: &Path) -> Result<(), MergeError> {
        let result = Command::new(&self.cmd)
            .arg(matrix)
            .arg(batches)
            .arg(output)
            .output()
            .map_err(|err| MergeError::Correction {
                procedure: self.cmd.clone(),
                message: err.to_string(),
            })?;
        if result.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        Err(MergeError::Correction {
            procedure: self.cmd.clone(),
            message: if stderr.is_empty() {
                "command failed".to_string()
            } else {
                stderr
            },
        })
    }
}

/// Writes the batch-annotation file: condition and batch label, tab
/// separated, one row per sample in append order, with a trailing blank
/// line. Row count equals sample count by construction.
pub fn write_batch_file(
    path: &Path,
    annotations: &[(Condition, String)],
) -> Result<(), MergeError> {
    let mut file = File::create(path)
        .map_err(|err| MergeError::Filesystem(format!("create {}: {err}", path.display())))?;
    for (condition, batch) in annotations {
        writeln!(file, "{condition}\t{batch}").map_err(MergeError::fs)?;
    }
    file.write_all(b"\n").map_err(MergeError::fs)?;
    file.flush().map_err(MergeError::fs)
}

/// Invokes the correction procedure and validates its postcondition. An
/// already-present non-empty corrected matrix short-circuits the invocation,
/// making re-runs idempotent. A missing or empty output afterwards is fatal
/// and names the procedure.
pub fn run_correction<C: CorrectionRunner>(
    runner: &C,
    procedure: &str,
    matrix: &Path,
    batches: &Path,
    corrected: &Path,
) -> Result<(), MergeError> {
    if tsv::non_empty(corrected) {
        info!(path = %corrected.display(), "corrected matrix already present, skipping correction");
        return Ok(());
    }

    runner.correct(matrix, batches, corrected)?;

    if !tsv::non_empty(corrected) {
        return Err(MergeError::Correction {
            procedure: procedure.to_string(),
            message: "produced no corrected matrix".to_string(),
        });
    }
    Ok(())
}
