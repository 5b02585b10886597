// crates/dataprep-broker/src/engine/command.rs
// ============================================================================
// Module: Dataprep Command Engine Client
// Description: Statistics engine run as a local executable.
// Purpose: Spawn the engine per analysis and capture its standard output.
// Dependencies: dataprep-core
// ============================================================================

//! ## Overview
//! The executable receives its configured arguments followed by
//! `--concurrency <hint> --start-offset <n> --sample-limit <n> --delimiter <c>
//! --format <fmt> <snapshot path>`. Standard output is the result; a non-zero
//! exit is a failure carrying the tail of standard error. Both pipes are
//! drained on reader threads so a chatty engine cannot block on a full pipe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::io::ErrorKind;
use std::io::Read;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use dataprep_core::AnalysisEngine;
use dataprep_core::EngineError;
use dataprep_core::EngineRequest;

use crate::engine::decode_output;
use crate::engine::parameter_pairs;
use crate::engine::read_capped;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Interval between exit checks while the engine runs.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Characters of standard error kept in failure messages.
const STDERR_TAIL_CHARS: usize = 512;

// ============================================================================
// SECTION: Command Engine
// ============================================================================

/// Engine client that spawns a local executable.
#[derive(Debug, Clone)]
pub struct CommandAnalysisEngine {
    /// Executable path or name resolved through `PATH`.
    program: PathBuf,
    /// Leading arguments placed before the engine parameters.
    args: Vec<OsString>,
    /// Optional wall-clock limit; the process is killed when exceeded.
    timeout: Option<Duration>,
}

impl CommandAnalysisEngine {
    /// Creates a client for the given executable.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Sets the leading arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the wall-clock limit for one analysis.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the process invocation for a request.
    fn command(&self, request: &EngineRequest<'_>) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (name, value) in parameter_pairs(request) {
            command.arg(format!("--{name}")).arg(value);
        }
        command
            .arg(request.content_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl AnalysisEngine for CommandAnalysisEngine {
    fn analyze(&self, request: &EngineRequest<'_>) -> Result<String, EngineError> {
        let mut child = self.command(request).spawn().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                EngineError::Unavailable(format!("{}: {err}", self.program.display()))
            } else {
                EngineError::Io(err.to_string())
            }
        })?;
        let stdout = child.stdout.take().map(|pipe| std::thread::spawn(move || drain(pipe)));
        let stderr = child.stderr.take().map(|pipe| std::thread::spawn(move || drain(pipe)));

        let status = wait(&mut child, self.timeout);
        let output = join(stdout);
        let diagnostics = join(stderr).unwrap_or_default();

        let status = status?;
        if !status.success() {
            return Err(EngineError::Failed(format!(
                "engine exited with {status}: {}",
                stderr_tail(&diagnostics)
            )));
        }
        decode_output(output?)
    }
}

// ============================================================================
// SECTION: Process Helpers
// ============================================================================

/// Waits for the process, killing it once the timeout elapses.
fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, EngineError> {
    let Some(timeout) = timeout else {
        return child.wait().map_err(|err| EngineError::Io(err.to_string()));
    };
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(|err| EngineError::Io(err.to_string()))? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Failed(format!("engine timed out after {} ms", timeout.as_millis())));
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    }
}

/// Reads a pipe up to the output cap, then discards the rest until EOF.
fn drain<R: Read>(mut pipe: R) -> Result<Vec<u8>, EngineError> {
    let bytes = read_capped(&mut pipe);
    let _ = std::io::copy(&mut pipe, &mut std::io::sink());
    bytes
}

/// Collects a pipe reader's bytes.
fn join(reader: Option<JoinHandle<Result<Vec<u8>, EngineError>>>) -> Result<Vec<u8>, EngineError> {
    match reader {
        Some(handle) => handle.join().map_err(|_| EngineError::Io("engine pipe reader panicked".to_string()))?,
        None => Err(EngineError::Io("engine pipe unavailable".to_string())),
    }
}

/// Returns the last characters of standard error, trimmed.
fn stderr_tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(STDERR_TAIL_CHARS);
    text.chars().skip(skip).collect()
}
