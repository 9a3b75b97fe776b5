//! Stage process execution
//!
//! Launches one stage as a subprocess and relays its output while it runs:
//! - stdout and stderr are piped, stdin is closed
//! - one reader task per stream turns bytes into `OutputLine` events
//! - events travel over a channel and reach the log sink as they arrive
//! - the exit status is collected once both streams are closed

use async_trait::async_trait;
use pdfline_core::domain::stage::{
    OutputLine, StageDescriptor, StageResult, StreamKind, diagnostic_tail,
};
use pdfline_core::error::StageError;
use std::io;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::sinks::LogSink;

/// Executes a single stage to completion
///
/// Implementations must not return before the stage has terminated.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Runs a stage, forwarding every output line to `sink` as it is produced
    ///
    /// # Arguments
    /// * `index` - Zero-based position of the stage in the pipeline
    /// * `stage` - What to launch
    /// * `sink` - Receives output lines while the stage runs
    ///
    /// # Returns
    /// The stage result, whatever the exit status. Errors are reserved for
    /// stages that could not be launched or whose output could not be read.
    async fn run_stage(
        &self,
        index: usize,
        stage: &StageDescriptor,
        sink: &mut dyn LogSink,
    ) -> Result<StageResult, StageError>;
}

/// Runs stages as local subprocesses
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    /// Output lines buffered between the reader tasks and the sink
    channel_capacity: usize,
    /// Trailing output lines kept on a stream error
    diagnostic_lines: usize,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: 256,
            diagnostic_lines: 20,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_diagnostic_lines(mut self, lines: usize) -> Self {
        self.diagnostic_lines = lines;
        self
    }

    fn build_command(stage: &StageDescriptor) -> Command {
        let mut command = Command::new(&stage.program);
        command
            .args(stage.argv())
            .envs(&stage.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &stage.working_dir {
            command.current_dir(dir);
        }

        command
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageExecutor for ProcessExecutor {
    async fn run_stage(
        &self,
        index: usize,
        stage: &StageDescriptor,
        sink: &mut dyn LogSink,
    ) -> Result<StageResult, StageError> {
        debug!("Spawning stage '{}': {}", stage.name, stage.command_line());
        check_working_dir(stage).await?;

        let started = Instant::now();
        let mut child = Self::build_command(stage)
            .spawn()
            .map_err(|source| StageError::Spawn {
                program: stage.program.clone(),
                source,
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill().await;
            return Err(StageError::Stream {
                source: io::Error::other("stage output was not captured"),
                diagnostic: Vec::new(),
            });
        };

        let (tx, mut rx) = mpsc::channel(self.channel_capacity);
        let readers = [
            tokio::spawn(forward_lines(stdout, StreamKind::Stdout, tx.clone())),
            tokio::spawn(forward_lines(stderr, StreamKind::Stderr, tx)),
        ];

        let output = match relay_output(&mut rx, &stage.name, sink, self.diagnostic_lines).await {
            Ok(output) => output,
            Err(err) => {
                for reader in &readers {
                    reader.abort();
                }
                // kill() also reaps the child
                let _ = child.kill().await;
                return Err(err);
            }
        };

        // Channel closed: both readers are done
        for reader in readers {
            if let Err(e) = reader.await {
                let _ = child.kill().await;
                return Err(StageError::Stream {
                    source: io::Error::other(e),
                    diagnostic: diagnostic_tail(&output, self.diagnostic_lines),
                });
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|source| StageError::Stream {
                source,
                diagnostic: diagnostic_tail(&output, self.diagnostic_lines),
            })?;

        let duration = started.elapsed();
        debug!(
            "Stage '{}' exited with {:?} after {:?} ({} line(s) of output)",
            stage.name,
            status,
            duration,
            output.len()
        );

        Ok(StageResult {
            index,
            name: stage.name.clone(),
            status: status.into(),
            output,
            duration,
        })
    }
}

/// Fails before launch when the working directory is unusable
///
/// Without this a missing directory surfaces as the program not being found.
async fn check_working_dir(stage: &StageDescriptor) -> Result<(), StageError> {
    let Some(dir) = &stage.working_dir else {
        return Ok(());
    };

    let source = match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => io::Error::other(format!(
            "working directory '{}' is not a directory",
            dir.display()
        )),
        Err(e) => io::Error::new(
            e.kind(),
            format!("working directory '{}': {}", dir.display(), e),
        ),
    };

    Err(StageError::Spawn {
        program: stage.program.clone(),
        source,
    })
}

/// Hands every line event to `sink` until both senders are gone
///
/// A read error ends the relay with a stream error carrying the tail of the
/// output received so far.
async fn relay_output(
    rx: &mut mpsc::Receiver<io::Result<OutputLine>>,
    stage: &str,
    sink: &mut dyn LogSink,
    diagnostic_lines: usize,
) -> Result<Vec<OutputLine>, StageError> {
    let mut output = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            Ok(line) => {
                sink.output(stage, &line);
                output.push(line);
            }
            Err(source) => {
                warn!("Failed to read output of stage '{}': {}", stage, source);
                return Err(StageError::Stream {
                    source,
                    diagnostic: diagnostic_tail(&output, diagnostic_lines),
                });
            }
        }
    }

    Ok(output)
}

/// Reads `reader` line by line and sends each line as an event
///
/// Stops at end of stream, on the first read error (which is sent along), or
/// when the receiving side has gone away.
async fn forward_lines<R>(
    reader: R,
    stream: StreamKind,
    tx: mpsc::Sender<io::Result<OutputLine>>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = OutputLine {
                    stream,
                    line: decode_line(&buf),
                };
                if tx.send(Ok(line)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}

/// Strips the line terminator and replaces invalid UTF-8
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
