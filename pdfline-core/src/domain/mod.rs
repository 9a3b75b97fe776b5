//! Core domain types
//!
//! This module contains the structures shared between the runner (which
//! executes stages) and the CLI (which builds pipelines and reports on them).

pub mod log;
pub mod pipeline;
pub mod stage;
