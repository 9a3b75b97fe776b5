//! CLI configuration
//!
//! Paths and settings the built-in pipeline is assembled from. Every field
//! can be set on the command line or through a `PDFLINE_*` environment
//! variable (see `main.rs`); unset fields fall back to the defaults below.

use anyhow::bail;
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_SCRIPTS_DIR: &str = "scripts";
pub const DEFAULT_ORDERS_DIR: &str = "PDF-PEDIDOS";
pub const DEFAULT_INVOICES_DIR: &str = "PDF-FACTURAS";
pub const DEFAULT_WORKBOOK: &str = "output/data.xlsx";
pub const DEFAULT_EXTRACT_LOG: &str = "output/log.txt";
pub const DEFAULT_DETECT_LOG: &str = "output/log_facturas.txt";
pub const DEFAULT_DIAGNOSTIC_LINES: usize = 20;

/// Output format of the process's own log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Interpreter used for the built-in stages
    pub python: String,

    /// Directory holding `extract.py` and `detect.py`
    pub scripts_dir: PathBuf,

    /// Input directory of order PDFs (extract stage)
    pub orders_dir: PathBuf,

    /// Input directory of invoice PDFs (detect stage)
    pub invoices_dir: PathBuf,

    /// Spreadsheet written by extract and updated by detect
    pub workbook: PathBuf,

    pub extract_log: PathBuf,
    pub detect_log: PathBuf,

    /// JSON pipeline definition replacing the built-in pipeline
    pub pipeline_file: Option<PathBuf>,

    /// Trailing output lines shown when a stage fails
    pub diagnostic_lines: usize,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            scripts_dir: PathBuf::from(DEFAULT_SCRIPTS_DIR),
            orders_dir: PathBuf::from(DEFAULT_ORDERS_DIR),
            invoices_dir: PathBuf::from(DEFAULT_INVOICES_DIR),
            workbook: PathBuf::from(DEFAULT_WORKBOOK),
            extract_log: PathBuf::from(DEFAULT_EXTRACT_LOG),
            detect_log: PathBuf::from(DEFAULT_DETECT_LOG),
            pipeline_file: None,
            diagnostic_lines: DEFAULT_DIAGNOSTIC_LINES,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Uses a JSON pipeline definition instead of the built-in pipeline
    pub fn with_pipeline_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pipeline_file = Some(path.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.python.trim().is_empty() {
            bail!("python cannot be empty");
        }

        let paths = [
            ("scripts_dir", &self.scripts_dir),
            ("orders_dir", &self.orders_dir),
            ("invoices_dir", &self.invoices_dir),
            ("workbook", &self.workbook),
            ("extract_log", &self.extract_log),
            ("detect_log", &self.detect_log),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                bail!("{} cannot be empty", name);
            }
        }

        if let Some(file) = &self.pipeline_file {
            if file.as_os_str().is_empty() {
                bail!("pipeline file cannot be empty");
            }
        }

        if self.diagnostic_lines == 0 {
            bail!("diagnostic_lines must be greater than 0");
        }

        Ok(())
    }
}
