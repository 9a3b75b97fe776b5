//! Plan command handler
//!
//! Prints the resolved pipeline without launching anything.

use anyhow::Result;
use colored::*;
use pdfline_core::domain::pipeline::PipelineDefinition;

use crate::config::Config;
use crate::pipeline;

pub fn handle_plan_command(config: &Config) -> Result<i32> {
    let definition = pipeline::resolve(config)?;
    print_plan(&definition);
    Ok(0)
}

fn print_plan(definition: &PipelineDefinition) {
    println!(
        "{}",
        format!(
            "Pipeline '{}' ({} stage(s)):",
            definition.name,
            definition.stages.len()
        )
        .bold()
    );
    println!();

    for (idx, stage) in definition.stages.iter().enumerate() {
        println!("  {} {}", format!("{}.", idx + 1).cyan(), stage.name.bold());
        println!("     $ {}", stage.command_line());
        if let Some(dir) = &stage.working_dir {
            println!("     cwd: {}", dir.display().to_string().dimmed());
        }
        for (key, value) in &stage.env {
            println!("     env: {}", format!("{}={}", key, value).dimmed());
        }
        println!();
    }
}
