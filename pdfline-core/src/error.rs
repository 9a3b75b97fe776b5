//! Error types for pdfline

use thiserror::Error;

use crate::domain::stage::ExitStatus;

/// Why a stage did not complete successfully
///
/// None of these are retried: each one ends the pipeline.
#[derive(Debug, Error)]
pub enum StageError {
    /// The program could not be launched (not found, not executable, ...)
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but terminated unsuccessfully
    #[error("stage terminated unsuccessfully ({status})")]
    RuntimeFailure {
        status: ExitStatus,
        /// Tail of the output captured before termination
        diagnostic: Vec<String>,
    },

    /// Reading the program's output failed
    #[error("failed to read stage output: {source}")]
    Stream {
        #[source]
        source: std::io::Error,
        /// Tail of the output read before the failure
        diagnostic: Vec<String>,
    },
}

impl StageError {
    /// Output captured before the failure, if any
    pub fn diagnostic(&self) -> &[String] {
        match self {
            StageError::RuntimeFailure { diagnostic, .. }
            | StageError::Stream { diagnostic, .. } => diagnostic,
            StageError::Spawn { .. } => &[],
        }
    }

    /// Check if the stage never started
    pub fn is_spawn_error(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }

    /// Short label for reports
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Spawn { .. } => "spawn error",
            StageError::RuntimeFailure { .. } => "runtime failure",
            StageError::Stream { .. } => "stream error",
        }
    }
}

/// Errors raised while loading a pipeline definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The definition file could not be read
    #[error("failed to read pipeline definition {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The definition is not valid JSON for a pipeline
    #[error("failed to parse pipeline definition: {0}")]
    Parse(#[from] serde_json::Error),

    /// The definition parsed but describes an unusable pipeline
    #[error("invalid pipeline definition: {0}")]
    Invalid(String),
}
