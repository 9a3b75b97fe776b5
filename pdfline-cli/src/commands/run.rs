//! Run command handler
//!
//! Executes the pipeline, relaying stage output through `tracing` while the
//! stages run, then prints a summary. On failure the summary goes to stderr
//! and names the failed stage, the cause and the captured output tail.

use anyhow::Result;
use colored::*;
use pdfline_core::domain::pipeline::{PipelineOutcome, PipelineRun};
use pdfline_runner::{PipelineService, ProcessExecutor, TracingLogSink};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::pipeline;

pub async fn handle_run_command(config: &Config) -> Result<i32> {
    let definition = pipeline::resolve(config)?;
    info!(
        "Loaded pipeline '{}' with {} stage(s)",
        definition.name,
        definition.stages.len()
    );

    let executor = ProcessExecutor::new().with_diagnostic_lines(config.diagnostic_lines);
    let service = PipelineService::new(Arc::new(executor))
        .with_diagnostic_lines(config.diagnostic_lines);

    let mut sink = TracingLogSink::new();
    let run = service.run_pipeline(&definition, &mut sink).await;

    match &run.outcome {
        PipelineOutcome::AllSucceeded => print_success(&run),
        PipelineOutcome::FailedAtStage { .. } => print_failure(&run, definition.stages.len()),
    }

    Ok(run.exit_code())
}

fn print_success(run: &PipelineRun) {
    println!(
        "{}",
        format!("✓ Pipeline '{}' completed successfully!", run.pipeline)
            .green()
            .bold()
    );
    for result in &run.results {
        println!(
            "  {} {} {}",
            "▸".cyan(),
            result.name.bold(),
            format!("({:.1?})", result.duration).dimmed()
        );
    }
    println!("  Run ID: {}", run.run_id.to_string().dimmed());
}

fn print_failure(run: &PipelineRun, total: usize) {
    let PipelineOutcome::FailedAtStage {
        index,
        stage,
        cause,
    } = &run.outcome
    else {
        return;
    };

    eprintln!();
    eprintln!(
        "{}",
        format!(
            "✗ Pipeline '{}' failed at stage {}/{} ({})",
            run.pipeline,
            index + 1,
            total,
            stage
        )
        .red()
        .bold()
    );
    eprintln!("  {} {}", format!("{}:", cause.kind()).yellow(), cause);

    let diagnostic = cause.diagnostic();
    if !diagnostic.is_empty() {
        eprintln!("  {}", "Last output:".bold());
        eprintln!("  {}", "─".repeat(60).dimmed());
        for line in diagnostic {
            eprintln!("  {}", line);
        }
        eprintln!("  {}", "─".repeat(60).dimmed());
    }

    let completed = run.completed_stages();
    if completed.is_empty() {
        eprintln!("  Completed stages: {}", "none".dimmed());
    } else {
        eprintln!("  Completed stages: {}", completed.join(", "));
        eprintln!(
            "  {}",
            "Artifacts written by completed stages were left in place.".dimmed()
        );
    }

    let skipped = total.saturating_sub(index + 1);
    if skipped > 0 {
        eprintln!("  Skipped stages:   {}", skipped);
    }
    eprintln!("  Run ID: {}", run.run_id.to_string().dimmed());
}
