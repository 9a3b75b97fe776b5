//! Pipeline resolution
//!
//! Either the built-in two-stage invoice pipeline, assembled from the
//! configuration, or a JSON definition file given with `--pipeline`.

use anyhow::{Context, Result};
use pdfline_core::domain::pipeline::PipelineDefinition;
use pdfline_core::domain::stage::StageDescriptor;
use std::path::Path;

use crate::config::Config;

/// Name of the built-in pipeline
pub const BUILTIN_NAME: &str = "pedidos-facturas";

/// Returns the pipeline the configuration asks for
pub fn resolve(config: &Config) -> Result<PipelineDefinition> {
    match &config.pipeline_file {
        Some(path) => PipelineDefinition::load(path)
            .with_context(|| format!("Failed to load pipeline from {}", path.display())),
        None => {
            let definition = builtin(config);
            definition
                .validate()
                .context("Built-in pipeline is invalid")?;
            Ok(definition)
        }
    }
}

/// Builds the built-in pipeline
///
/// 1. `extract`: reads order PDFs and writes the workbook (log path positional)
/// 2. `detect`: reads invoice PDFs and updates the same workbook (`--log_file`)
pub fn builtin(config: &Config) -> PipelineDefinition {
    let extract = python_stage(config, "extract", "extract.py").with_args([
        path_arg(&config.orders_dir),
        path_arg(&config.workbook),
        path_arg(&config.extract_log),
    ]);

    let detect = python_stage(config, "detect", "detect.py").with_args([
        path_arg(&config.invoices_dir),
        path_arg(&config.workbook),
        "--log_file".to_string(),
        path_arg(&config.detect_log),
    ]);

    PipelineDefinition::new(BUILTIN_NAME, vec![extract, detect])
}

fn python_stage(config: &Config, name: &str, script: &str) -> StageDescriptor {
    StageDescriptor::new(name, config.python.clone())
        .with_script(config.scripts_dir.join(script))
        .with_env("PYTHONUNBUFFERED", "1")
        .with_env("PYTHONIOENCODING", "utf-8")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_builtin_pipeline_matches_script_contracts() {
        let definition = builtin(&Config::default());

        assert_eq!(definition.name, BUILTIN_NAME);
        assert_eq!(definition.stages.len(), 2);

        let extract = &definition.stages[0];
        assert_eq!(
            extract.command_line(),
            "python3 scripts/extract.py PDF-PEDIDOS output/data.xlsx output/log.txt"
        );

        let detect = &definition.stages[1];
        assert_eq!(
            detect.command_line(),
            "python3 scripts/detect.py PDF-FACTURAS output/data.xlsx --log_file output/log_facturas.txt"
        );
        assert_eq!(detect.env.get("PYTHONUNBUFFERED"), Some(&"1".to_string()));
    }

    #[test]
    fn test_builtin_pipeline_uses_configured_interpreter_and_paths() {
        let config = Config {
            python: "/opt/venv/bin/python".to_string(),
            scripts_dir: PathBuf::from("/srv/scripts"),
            workbook: PathBuf::from("/data/out.xlsx"),
            ..Config::default()
        };

        let definition = builtin(&config);
        for stage in &definition.stages {
            assert_eq!(stage.program, "/opt/venv/bin/python");
            assert!(stage.args.contains(&"/data/out.xlsx".to_string()));
        }
        assert_eq!(
            definition.stages[1].script,
            Some(PathBuf::from("/srv/scripts/detect.py"))
        );
    }

    #[test]
    fn test_resolve_defaults_to_builtin() {
        let definition = resolve(&Config::default()).unwrap();
        assert_eq!(definition.name, BUILTIN_NAME);
    }

    #[test]
    fn test_resolve_reports_missing_file() {
        let config = Config::default().with_pipeline_file("/nonexistent/pipeline.json");
        let err = resolve(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/pipeline.json"));
    }

    #[test]
    fn test_resolve_loads_definition_file() {
        let path = std::env::temp_dir().join(format!("pdfline-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"name": "custom", "stages": [{"name": "only", "program": "true"}]}"#,
        )
        .unwrap();

        let result = resolve(&Config::default().with_pipeline_file(&path));
        std::fs::remove_file(&path).unwrap();

        let definition = result.unwrap();
        assert_eq!(definition.name, "custom");
        assert_eq!(definition.stages[0].program, "true");
    }
}
