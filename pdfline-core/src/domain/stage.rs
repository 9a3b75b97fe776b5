//! Stage domain types
//!
//! A stage is one external program invocation. The descriptor says what to
//! launch, the result records how it terminated and what it printed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::StageError;

/// Description of a single pipeline stage
///
/// The program is always explicit: a Python stage names its interpreter
/// (`python3`) here and passes the script through `script`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Human-readable label used in logs and reports
    pub name: String,

    /// Executable to launch, resolved through `PATH` when not a path
    pub program: String,

    /// Script handed to the program as its first argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,

    /// Arguments passed verbatim after the script
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides applied on top of the inherited environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Working directory of the subprocess (inherited when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl StageDescriptor {
    /// Creates a descriptor that runs `program` with no arguments
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            script: None,
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Full argument vector handed to the program: script first, then args
    pub fn argv(&self) -> Vec<OsString> {
        self.script
            .iter()
            .map(|script| script.as_os_str().to_os_string())
            .chain(self.args.iter().map(OsString::from))
            .collect()
    }

    /// Renders the invocation as a single line for logs and `plan` output
    ///
    /// Display only: arguments are never passed through a shell.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(
                self.argv()
                    .iter()
                    .map(|arg| quote_for_display(&arg.to_string_lossy())),
            )
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_for_display(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        format!("{:?}", arg)
    } else {
        arg.to_string()
    }
}

/// How a stage's subprocess terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    Success,
    /// Exited with a non-zero code
    Failure(i32),
    /// Terminated by a signal
    Signal(i32),
}

impl ExitStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if status.success() {
            return ExitStatus::Success;
        }

        if let Some(code) = status.code() {
            return ExitStatus::Failure(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitStatus::Signal(signal);
            }
        }

        ExitStatus::Failure(-1)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Success => write!(f, "exit code 0"),
            ExitStatus::Failure(code) => write!(f, "exit code {}", code),
            ExitStatus::Signal(signal) => write!(f, "terminated by signal {}", signal),
        }
    }
}

/// Output stream a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// A single line of stage output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: StreamKind,
    pub line: String,
}

impl OutputLine {
    pub fn stdout(line: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stdout,
            line: line.into(),
        }
    }

    pub fn stderr(line: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stderr,
            line: line.into(),
        }
    }
}

/// Last `limit` lines of stderr in `output`, or of stdout when there is no stderr
pub fn diagnostic_tail(output: &[OutputLine], limit: usize) -> Vec<String> {
    let tail = |stream: StreamKind| -> Vec<String> {
        let lines: Vec<&OutputLine> = output.iter().filter(|line| line.stream == stream).collect();
        let skip = lines.len().saturating_sub(limit);
        lines
            .into_iter()
            .skip(skip)
            .map(|line| line.line.clone())
            .collect()
    };

    let stderr = tail(StreamKind::Stderr);
    if stderr.is_empty() {
        tail(StreamKind::Stdout)
    } else {
        stderr
    }
}

/// Result of one stage invocation
///
/// Only lives for the duration of the run; later stages never see it.
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Zero-based position of the stage in the pipeline
    pub index: usize,
    pub name: String,
    pub status: ExitStatus,
    /// Every line the stage printed, in arrival order
    pub output: Vec<OutputLine>,
    pub duration: Duration,
}

impl StageResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Last `limit` lines of stderr, or of stdout when stderr stayed empty
    pub fn diagnostic(&self, limit: usize) -> Vec<String> {
        diagnostic_tail(&self.output, limit)
    }

    /// Converts a non-successful termination into a runtime failure
    pub fn failure(&self, diagnostic_lines: usize) -> Option<StageError> {
        if self.is_success() {
            return None;
        }

        Some(StageError::RuntimeFailure {
            status: self.status,
            diagnostic: self.diagnostic(diagnostic_lines),
        })
    }
}
