//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

use crate::domain::stage::{StageDescriptor, StageResult};
use crate::error::{DefinitionError, StageError};

/// Ordered list of stages, as built by the driver or loaded from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub stages: Vec<StageDescriptor>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>, stages: Vec<StageDescriptor>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }

    /// Parses and validates a JSON pipeline definition
    pub fn from_json(source: &str) -> Result<Self, DefinitionError> {
        let definition: PipelineDefinition = serde_json::from_str(source)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Reads, parses and validates a JSON pipeline definition file
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let source = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&source)
    }

    /// Validates the definition
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.stages.is_empty() {
            return Err(DefinitionError::Invalid(
                "pipeline must declare at least one stage".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (idx, stage) in self.stages.iter().enumerate() {
            if stage.name.trim().is_empty() {
                return Err(DefinitionError::Invalid(format!(
                    "stage {} has an empty name",
                    idx
                )));
            }

            if !seen.insert(stage.name.as_str()) {
                return Err(DefinitionError::Invalid(format!(
                    "duplicate stage name '{}'",
                    stage.name
                )));
            }

            if stage.program.trim().is_empty() {
                return Err(DefinitionError::Invalid(format!(
                    "stage '{}' has an empty program",
                    stage.name
                )));
            }

            if let Some(key) = stage
                .env
                .keys()
                .find(|key| key.is_empty() || key.contains('=') || key.contains('\0'))
            {
                return Err(DefinitionError::Invalid(format!(
                    "stage '{}' has an invalid environment variable name {:?}",
                    stage.name, key
                )));
            }
        }

        Ok(())
    }
}

/// Terminal state of a pipeline run
#[derive(Debug)]
pub enum PipelineOutcome {
    AllSucceeded,
    FailedAtStage {
        /// Zero-based position of the failed stage
        index: usize,
        stage: String,
        cause: StageError,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::AllSucceeded)
    }

    /// Index of the failed stage, if the run failed
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            PipelineOutcome::AllSucceeded => None,
            PipelineOutcome::FailedAtStage { index, .. } => Some(*index),
        }
    }
}

/// One invocation of a whole pipeline
///
/// Exists only for the duration of the program; nothing is persisted.
#[derive(Debug)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub pipeline: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// Results of every stage that reached termination, in order
    pub results: Vec<StageResult>,
    pub outcome: PipelineOutcome,
}

impl PipelineRun {
    /// Process exit code for the run
    pub const FAILURE_EXIT_CODE: i32 = 1;

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Names of the stages that completed successfully
    pub fn completed_stages(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|result| result.is_success())
            .map(|result| result.name.as_str())
            .collect()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            Self::FAILURE_EXIT_CODE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stage::ExitStatus;
    use std::time::Duration;

    fn two_stage_json() -> &'static str {
        r#"{
            "name": "facturas",
            "stages": [
                {
                    "name": "extract",
                    "program": "python3",
                    "script": "scripts/extract.py",
                    "args": ["PDF-PEDIDOS", "output/data.xlsx", "output/log.txt"],
                    "env": {"PYTHONUNBUFFERED": "1"}
                },
                {
                    "name": "detect",
                    "program": "python3",
                    "script": "scripts/detect.py",
                    "args": ["PDF-FACTURAS", "output/data.xlsx", "--log_file", "output/log_facturas.txt"]
                }
            ]
        }"#
    }

    #[test]
    fn test_from_json_keeps_order_and_args() {
        let definition = PipelineDefinition::from_json(two_stage_json()).unwrap();

        assert_eq!(definition.name, "facturas");
        assert_eq!(definition.stages.len(), 2);
        assert_eq!(definition.stages[0].name, "extract");
        assert_eq!(definition.stages[1].name, "detect");
        assert_eq!(
            definition.stages[1].args,
            vec![
                "PDF-FACTURAS",
                "output/data.xlsx",
                "--log_file",
                "output/log_facturas.txt"
            ]
        );
        assert_eq!(
            definition.stages[0].env.get("PYTHONUNBUFFERED"),
            Some(&"1".to_string())
        );
    }

    #[test]
    fn test_validation_rejects_empty_pipeline() {
        let err = PipelineDefinition::from_json(r#"{"name": "empty", "stages": []}"#).unwrap_err();
        assert!(matches!(err, DefinitionError::Invalid(_)));
    }

    #[test]
    fn test_validation_rejects_bad_stages() {
        let duplicate = PipelineDefinition::new(
            "dup",
            vec![
                StageDescriptor::new("extract", "python3"),
                StageDescriptor::new("extract", "python3"),
            ],
        );
        assert!(duplicate.validate().is_err());

        let no_program = PipelineDefinition::new("p", vec![StageDescriptor::new("extract", " ")]);
        assert!(no_program.validate().is_err());

        let no_name = PipelineDefinition::new("p", vec![StageDescriptor::new("", "python3")]);
        assert!(no_name.validate().is_err());

        let bad_env = PipelineDefinition::new(
            "p",
            vec![StageDescriptor::new("extract", "python3").with_env("A=B", "1")],
        );
        assert!(bad_env.validate().is_err());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = PipelineDefinition::from_json("{not json").unwrap_err();
        assert!(matches!(err, DefinitionError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineDefinition::load(Path::new("/nonexistent/pdfline.json")).unwrap_err();
        assert!(matches!(err, DefinitionError::Io { .. }));
    }

    #[test]
    fn test_run_exit_code_and_completed_stages() {
        let result = |index: usize, name: &str, status: ExitStatus| StageResult {
            index,
            name: name.to_string(),
            status,
            output: vec![],
            duration: Duration::ZERO,
        };

        let failed = PipelineRun {
            run_id: Uuid::new_v4(),
            pipeline: "facturas".to_string(),
            started_at: chrono::Utc::now(),
            finished_at: chrono::Utc::now(),
            results: vec![
                result(0, "extract", ExitStatus::Success),
                result(1, "detect", ExitStatus::Failure(2)),
            ],
            outcome: PipelineOutcome::FailedAtStage {
                index: 1,
                stage: "detect".to_string(),
                cause: StageError::RuntimeFailure {
                    status: ExitStatus::Failure(2),
                    diagnostic: vec![],
                },
            },
        };

        assert!(!failed.is_success());
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(failed.outcome.failed_index(), Some(1));
        assert_eq!(failed.completed_stages(), vec!["extract"]);

        let succeeded = PipelineRun {
            outcome: PipelineOutcome::AllSucceeded,
            results: vec![result(0, "extract", ExitStatus::Success)],
            ..failed
        };
        assert_eq!(succeeded.exit_code(), 0);
        assert_eq!(succeeded.outcome.failed_index(), None);
    }
}
