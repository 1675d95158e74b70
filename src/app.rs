use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::assembler::MatrixAssembler;
use crate::correct::{self, CorrectionRunner};
use crate::domain::{Cluster, ColumnRange, GroupSpec, Tool, Unit};
use crate::error::MergeError;
use crate::group;
use crate::layout::Layout;
use crate::quant::Normalizer;
use crate::split;
use crate::translate::Translator;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub tool: Tool,
    pub unit: Unit,
    /// Run the external batch-effect correction and split the corrected
    /// matrix instead of the original.
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub cluster: String,
    pub samples: usize,
    pub corrected: bool,
    pub matrix: PathBuf,
    pub groups: Vec<GroupSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub samples: usize,
    pub output: PathBuf,
}

/// The whole pipeline for one run: assemble, annotate, correct, split.
/// Strictly sequential and single-writer; the matrix stream is opened once,
/// closed once, and deleted on any fatal error raised while it is open.
pub struct Pipeline<N: Normalizer, C: CorrectionRunner> {
    layout: Layout,
    translator: Translator,
    normalizer: N,
    corrector: C,
    procedure: String,
}

impl<N: Normalizer, C: CorrectionRunner> Pipeline<N, C> {
    pub fn new(
        layout: Layout,
        translator: Translator,
        normalizer: N,
        corrector: C,
        procedure: &str,
    ) -> Self {
        Self {
            layout,
            translator,
            normalizer,
            corrector,
            procedure: procedure.to_string(),
        }
    }

    pub fn run(&self, cluster: &Cluster, options: RunOptions) -> Result<RunSummary, MergeError> {
        self.layout.ensure_work_dir()?;
        let matrix_path = self.layout.matrix_path(&cluster.name, options.tool, options.unit);
        let mut assembler = MatrixAssembler::create(&matrix_path)?;

        let ranges = match self.assemble(cluster, options, &mut assembler) {
            Ok(ranges) => ranges,
            Err(err) => {
                // Do not leave a partial matrix behind.
                let _ = assembler.discard();
                return Err(err);
            }
        };

        let samples = assembler.sample_count();
        let annotations = assembler.annotations().to_vec();
        if let Err(err) = assembler.finish(&self.translator) {
            let _ = std::fs::remove_file(&matrix_path);
            return Err(err);
        }
        info!(samples, genes_file = %matrix_path.display(), "matrix assembled");

        let batch_path = self.layout.batch_path(&cluster.name, options.tool, options.unit);
        correct::write_batch_file(&batch_path, &annotations)?;

        let source = if options.correct {
            let corrected =
                self.layout.corrected_path(&cluster.name, options.tool, options.unit);
            correct::run_correction(
                &self.corrector,
                &self.procedure,
                &matrix_path,
                &batch_path,
                &corrected,
            )?;
            corrected
        } else {
            matrix_path.clone()
        };

        let mut groups = Vec::new();
        for (spec, range) in &ranges {
            let out_path = self.layout.split_path(spec, options.tool, options.unit);
            split::split_group(&source, *range, &self.translator, &out_path)?;
            info!(group = %spec.name, output = %out_path.display(), "wrote group output");
            groups.push(GroupSummary {
                name: spec.name.clone(),
                samples: range.width(),
                output: out_path,
            });
        }

        Ok(RunSummary {
            cluster: cluster.name.clone(),
            samples,
            corrected: options.correct,
            matrix: matrix_path,
            groups,
        })
    }

    /// Processes every group in cluster order, recording a column range for
    /// each group that contributed at least one sample. Repeated source
    /// directories contribute nothing and get no range.
    fn assemble(
        &self,
        cluster: &Cluster,
        options: RunOptions,
        assembler: &mut MatrixAssembler,
    ) -> Result<Vec<(GroupSpec, ColumnRange)>, MergeError> {
        let mut visited = HashSet::new();
        let mut ranges = Vec::new();
        for spec in &cluster.groups {
            let prior = assembler.sample_count();
            let appended = group::process_group(
                spec,
                options.tool,
                options.unit,
                &self.translator,
                &self.normalizer,
                &mut visited,
                assembler,
            )?;
            if appended > 0 {
                let range = assembler.record_group(&spec.name, prior);
                ranges.push((spec.clone(), range));
            }
        }
        Ok(ranges)
    }
}
