//! pdfline Runner
//!
//! The pipeline engine: runs stages one after another as subprocesses,
//! streams their output to a log sink while they run, and stops at the first
//! stage that fails.
//!
//! - `executor`: launching a stage and relaying its output
//! - `sinks`: where output and lifecycle messages go
//! - `service`: the pipeline loop and log buffering

pub mod executor;
pub mod service;
pub mod sinks;

#[cfg(test)]
mod testing;

pub use executor::{ProcessExecutor, StageExecutor};
pub use service::{InMemoryLogBuffer, LogBufferService, PipelineService};
pub use sinks::{BufferedLogSink, LogSink, TracingLogSink};
