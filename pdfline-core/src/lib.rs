//! pdfline Core
//!
//! Core types and abstractions for the pdfline pipeline runner.
//!
//! This crate contains:
//! - Domain types: stage descriptors, stage results, pipeline runs and log entries
//! - Errors: the stage failure taxonomy and pipeline definition errors

pub mod domain;
pub mod error;

pub use domain::log::{LogEntry, LogLevel};
pub use domain::pipeline::{PipelineDefinition, PipelineOutcome, PipelineRun};
pub use domain::stage::{ExitStatus, OutputLine, StageDescriptor, StageResult, StreamKind};
pub use error::{DefinitionError, StageError};
