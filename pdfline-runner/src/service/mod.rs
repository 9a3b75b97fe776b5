//! Service layer
//!
//! Services contain the runner's business logic: driving a pipeline through
//! its stages and collecting logs.

mod execution;
mod log_buffer;

pub use execution::PipelineService;
pub use log_buffer::{InMemoryLogBuffer, LogBufferService};
