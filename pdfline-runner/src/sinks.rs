//! Log sinks
//!
//! A sink receives everything a pipeline run has to say: the output lines of
//! each stage as they are produced, and the runner's own lifecycle messages.
//! - `TracingLogSink` relays to `tracing` (what the CLI uses)
//! - `BufferedLogSink` collects entries into a `LogBufferService`

use pdfline_core::domain::log::{LogEntry, LogLevel};
use pdfline_core::domain::stage::{OutputLine, StreamKind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::service::LogBufferService;

/// Trait for log sinks
///
/// Writes happen from one stage at a time, in the order the lines arrive.
pub trait LogSink: Send + Sync {
    /// Write a log message
    ///
    /// # Arguments
    /// * `stage` - Name of the stage the message belongs to
    /// * `level` - The log level
    /// * `message` - The message content
    fn write(&mut self, stage: &str, level: LogLevel, message: &str);

    /// Write one line of stage output
    ///
    /// stdout lines are logged at info level, stderr lines at warning level.
    fn output(&mut self, stage: &str, line: &OutputLine) {
        let level = match line.stream {
            StreamKind::Stdout => LogLevel::Info,
            StreamKind::Stderr => LogLevel::Warning,
        };
        self.write(stage, level, &line.line);
    }
}

/// Sink that relays everything to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl TracingLogSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingLogSink {
    fn write(&mut self, stage: &str, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => debug!(stage = %stage, "{}", message),
            LogLevel::Info => info!(stage = %stage, "{}", message),
            LogLevel::Warning => warn!(stage = %stage, "{}", message),
            LogLevel::Error => error!(stage = %stage, "{}", message),
        }
    }

    fn output(&mut self, stage: &str, line: &OutputLine) {
        match line.stream {
            StreamKind::Stdout => info!(stage = %stage, stream = "stdout", "{}", line.line),
            StreamKind::Stderr => warn!(stage = %stage, stream = "stderr", "{}", line.line),
        }
    }
}

/// Buffered log sink that writes to a LogBufferService
pub struct BufferedLogSink {
    buffer: Arc<dyn LogBufferService>,
}

impl BufferedLogSink {
    /// Creates a new buffered log sink
    ///
    /// # Arguments
    /// * `buffer` - The log buffer service to write to
    pub fn new(buffer: Arc<dyn LogBufferService>) -> Self {
        Self { buffer }
    }
}

impl LogSink for BufferedLogSink {
    fn write(&mut self, stage: &str, level: LogLevel, message: &str) {
        self.buffer.add_entry(LogEntry::now(level, stage, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::InMemoryLogBuffer;
    use crate::testing::CapturedLogs;

    #[test]
    fn test_buffered_sink_maps_streams_to_levels() {
        let buffer = Arc::new(InMemoryLogBuffer::new());
        let mut sink = BufferedLogSink::new(buffer.clone());

        sink.output("extract", &OutputLine::stdout("Procesando pedido 1"));
        sink.output("extract", &OutputLine::stderr("DeprecationWarning"));
        sink.write("extract", LogLevel::Error, "Stage 'extract' failed");

        let entries = buffer.drain();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].message, "Procesando pedido 1");
        assert_eq!(entries[1].level, LogLevel::Warning);
        assert_eq!(entries[2].level, LogLevel::Error);
        assert!(entries.iter().all(|entry| entry.stage == "extract"));
    }

    #[test]
    fn test_tracing_sink_maps_levels_and_fields() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let mut sink = TracingLogSink::new();
        sink.write("detect", LogLevel::Debug, "debug message");
        sink.write("detect", LogLevel::Error, "error message");
        sink.output("detect", &OutputLine::stdout("stdout line"));
        sink.output("detect", &OutputLine::stderr("stderr line"));

        let contents = logs.contents();
        let line_with = |needle: &str| {
            contents
                .lines()
                .find(|line| line.contains(needle))
                .unwrap_or_else(|| panic!("no log line contains '{}'", needle))
                .to_string()
        };

        assert!(line_with("debug message").contains("DEBUG"));
        assert!(line_with("error message").contains("ERROR"));

        let stdout = line_with("stdout line");
        assert!(stdout.contains("INFO"));
        assert!(stdout.contains("stage=detect"));
        assert!(stdout.contains("stream=\"stdout\""));

        let stderr = line_with("stderr line");
        assert!(stderr.contains("WARN"));
        assert!(stderr.contains("stream=\"stderr\""));
    }
}
