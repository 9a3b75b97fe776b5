//! pdfline CLI
//!
//! Runs the order/invoice PDF pipeline: each stage is an external script,
//! run one after another with its output streamed live. The first failing
//! stage stops the pipeline and the process exits non-zero.

mod commands;
mod config;
mod pipeline;

use clap::Parser;
use colored::*;
use commands::{Commands, handle_command};
use config::{Config, LogFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pdfline")]
#[command(about = "Sequential runner for the order/invoice PDF pipeline", long_about = None)]
struct Cli {
    /// JSON pipeline definition to run instead of the built-in pipeline
    #[arg(long, env = "PDFLINE_PIPELINE", global = true)]
    pipeline: Option<PathBuf>,

    /// Python interpreter for the built-in stages
    #[arg(long, env = "PDFLINE_PYTHON", default_value = config::DEFAULT_PYTHON, global = true)]
    python: String,

    /// Directory containing extract.py and detect.py
    #[arg(long, env = "PDFLINE_SCRIPTS_DIR", default_value = config::DEFAULT_SCRIPTS_DIR, global = true)]
    scripts_dir: PathBuf,

    /// Directory of order PDFs
    #[arg(long, env = "PDFLINE_ORDERS_DIR", default_value = config::DEFAULT_ORDERS_DIR, global = true)]
    orders_dir: PathBuf,

    /// Directory of invoice PDFs
    #[arg(long, env = "PDFLINE_INVOICES_DIR", default_value = config::DEFAULT_INVOICES_DIR, global = true)]
    invoices_dir: PathBuf,

    /// Spreadsheet shared by both stages
    #[arg(long, env = "PDFLINE_WORKBOOK", default_value = config::DEFAULT_WORKBOOK, global = true)]
    workbook: PathBuf,

    /// Log file of the extract stage
    #[arg(long, env = "PDFLINE_EXTRACT_LOG", default_value = config::DEFAULT_EXTRACT_LOG, global = true)]
    extract_log: PathBuf,

    /// Log file of the detect stage
    #[arg(long, env = "PDFLINE_DETECT_LOG", default_value = config::DEFAULT_DETECT_LOG, global = true)]
    detect_log: PathBuf,

    /// Output lines of a failed stage to repeat in the error report
    #[arg(long, env = "PDFLINE_DIAGNOSTIC_LINES", default_value_t = config::DEFAULT_DIAGNOSTIC_LINES, global = true)]
    diagnostic_lines: usize,

    /// Format of pdfline's own log output
    #[arg(long, env = "PDFLINE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn config(&self) -> Config {
        let config = Config {
            python: self.python.clone(),
            scripts_dir: self.scripts_dir.clone(),
            orders_dir: self.orders_dir.clone(),
            invoices_dir: self.invoices_dir.clone(),
            workbook: self.workbook.clone(),
            extract_log: self.extract_log.clone(),
            detect_log: self.detect_log.clone(),
            pipeline_file: None,
            diagnostic_lines: self.diagnostic_lines,
            log_format: self.log_format,
        };

        match &self.pipeline {
            Some(path) => config.with_pipeline_file(path),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();

    init_tracing(config.log_format);

    let command = cli.command.unwrap_or(Commands::Run);
    let result = match config.validate() {
        Ok(()) => handle_command(command, &config).await,
        Err(e) => Err(e.context("Invalid configuration")),
    };

    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

const DEFAULT_LOG_FILTER: &str = "pdfline_cli=info,pdfline_runner=info";

/// Target of the events carrying stage output
const STAGE_OUTPUT_TARGET: &str = "pdfline_runner::sinks";

/// Builds the filter directives from `RUST_LOG`
///
/// Stage output stays visible at info level unless `RUST_LOG` names its
/// target explicitly.
fn log_directives(rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim) {
        None | Some("") => DEFAULT_LOG_FILTER.to_string(),
        Some(directives) if directives.contains(STAGE_OUTPUT_TARGET) => directives.to_string(),
        Some(directives) => format!("{},{}=info", directives, STAGE_OUTPUT_TARGET),
    }
}

/// Initializes logging; `RUST_LOG` adjusts the default filter
fn init_tracing(format: LogFormat) {
    let rust_log = std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV).ok();
    let filter = tracing_subscriber::EnvFilter::new(log_directives(rust_log.as_deref()));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_arguments() {
        let cli = Cli::try_parse_from(["pdfline"]).unwrap();
        assert!(cli.command.is_none());

        let config = cli.config();
        assert_eq!(config.python, "python3");
        assert_eq!(config.invoices_dir, PathBuf::from("PDF-FACTURAS"));
        assert_eq!(config.detect_log, PathBuf::from("output/log_facturas.txt"));
        assert!(config.pipeline_file.is_none());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pdfline",
            "plan",
            "--python",
            "python3.11",
            "--pipeline",
            "custom.json",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Commands::Plan));
        let config = cli.config();
        assert_eq!(config.python, "python3.11");
        assert_eq!(config.pipeline_file, Some(PathBuf::from("custom.json")));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_log_directives_default() {
        assert_eq!(log_directives(None), DEFAULT_LOG_FILTER);
        assert_eq!(log_directives(Some("  ")), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_log_directives_keep_stage_output() {
        assert_eq!(log_directives(Some("warn")), "warn,pdfline_runner::sinks=info");
        assert_eq!(
            log_directives(Some("pdfline_runner::sinks=error")),
            "pdfline_runner::sinks=error"
        );
    }

    #[test]
    fn test_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["pdfline", "deploy"]).is_err());
    }
}
