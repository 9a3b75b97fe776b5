//! Pipeline execution service
//!
//! Drives a pipeline through its stages:
//! - stages run strictly one at a time, in declaration order
//! - a stage starts only after the previous one has terminated
//! - the first failing stage ends the run; later stages are never launched
//!
//! Failures are not retried and nothing is rolled back: whatever earlier
//! stages wrote stays on disk.

use pdfline_core::domain::log::LogLevel;
use pdfline_core::domain::pipeline::{PipelineDefinition, PipelineOutcome, PipelineRun};
use pdfline_core::domain::stage::StageResult;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::executor::StageExecutor;
use crate::sinks::LogSink;

/// Runs pipelines with a given stage executor
pub struct PipelineService {
    executor: Arc<dyn StageExecutor>,
    /// How many trailing output lines a failure carries
    diagnostic_lines: usize,
}

impl PipelineService {
    /// Creates a new pipeline service
    ///
    /// # Arguments
    /// * `executor` - Launches each stage
    pub fn new(executor: Arc<dyn StageExecutor>) -> Self {
        Self {
            executor,
            diagnostic_lines: 20,
        }
    }

    pub fn with_diagnostic_lines(mut self, lines: usize) -> Self {
        self.diagnostic_lines = lines;
        self
    }

    /// Runs every stage of `definition` in order, stopping at the first failure
    ///
    /// # Arguments
    /// * `definition` - The stages to run
    /// * `sink` - Receives stage output as it is produced, plus lifecycle messages
    ///
    /// # Returns
    /// The finished run. A failed stage is reported through the run's outcome,
    /// never as an error.
    pub async fn run_pipeline(
        &self,
        definition: &PipelineDefinition,
        sink: &mut dyn LogSink,
    ) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let started_at = chrono::Utc::now();
        let total = definition.stages.len();

        info!(
            "Starting run {} of pipeline '{}' ({} stage(s))",
            run_id, definition.name, total
        );

        let mut results = Vec::with_capacity(total);

        for (idx, stage) in definition.stages.iter().enumerate() {
            info!("Executing stage {}/{}: {}", idx + 1, total, stage.name);
            debug!("Command: {}", stage.command_line());

            sink.write(
                &stage.name,
                LogLevel::Info,
                &format!("Starting stage {}/{}: {}", idx + 1, total, stage.name),
            );

            let cause = match self.executor.run_stage(idx, stage, sink).await {
                Ok(result) => {
                    let failure = result.failure(self.diagnostic_lines);
                    let duration = result.duration;
                    results.push(result);

                    match failure {
                        None => {
                            sink.write(
                                &stage.name,
                                LogLevel::Info,
                                &format!("Stage '{}' completed in {:.1?}", stage.name, duration),
                            );
                            continue;
                        }
                        Some(cause) => cause,
                    }
                }
                Err(cause) => cause,
            };

            sink.write(
                &stage.name,
                LogLevel::Error,
                &format!("Stage '{}' failed: {}", stage.name, cause),
            );

            if idx + 1 < total {
                info!(
                    "Skipping {} remaining stage(s) after failure of '{}'",
                    total - idx - 1,
                    stage.name
                );
            }

            return Self::finish(
                run_id,
                definition,
                started_at,
                results,
                PipelineOutcome::FailedAtStage {
                    index: idx,
                    stage: stage.name.clone(),
                    cause,
                },
            );
        }

        info!("Run {} completed successfully", run_id);
        Self::finish(
            run_id,
            definition,
            started_at,
            results,
            PipelineOutcome::AllSucceeded,
        )
    }

    fn finish(
        run_id: Uuid,
        definition: &PipelineDefinition,
        started_at: chrono::DateTime<chrono::Utc>,
        results: Vec<StageResult>,
        outcome: PipelineOutcome,
    ) -> PipelineRun {
        PipelineRun {
            run_id,
            pipeline: definition.name.clone(),
            started_at,
            finished_at: chrono::Utc::now(),
            results,
            outcome,
        }
    }
}
