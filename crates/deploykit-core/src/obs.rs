//! Severity-marked progress output and run lifecycle events.
//!
//! Operator-facing progress lines carry a grep-able marker (`[INFO]`, `[OK]`,
//! `[WARN]`, `[ERROR]`) and are routed through `tracing`, so they pick up the
//! active `deploykit.run` span and the subscriber's plain or JSON format.

use std::fmt;
use tracing::info;

/// Message severity, rendered as a bracketed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn marker(self) -> &'static str {
        match self {
            Severity::Info => "[INFO]",
            Severity::Success => "[OK]",
            Severity::Warning => "[WARN]",
            Severity::Error => "[ERROR]",
        }
    }

    /// Prefix `message` with this severity's marker.
    pub fn format(self, message: &str) -> String {
        format!("{} {}", self.marker(), message)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

pub fn info(message: impl AsRef<str>) {
    tracing::info!("{}", Severity::Info.format(message.as_ref()));
}

pub fn success(message: impl AsRef<str>) {
    tracing::info!("{}", Severity::Success.format(message.as_ref()));
}

pub fn warn(message: impl AsRef<str>) {
    tracing::warn!("{}", Severity::Warning.format(message.as_ref()));
}

pub fn error(message: impl AsRef<str>) {
    tracing::error!("{}", Severity::Error.format(message.as_ref()));
}

/// Announce an external command before it runs.
pub fn running(command_line: &str) {
    tracing::info!("→ Running: {}", command_line);
}

/// Span that tags every event of one deploy or destroy with its run id.
///
/// Attach it with `tracing::Instrument`.
///
/// ```ignore
/// orchestrator.deploy(&topology, &options).instrument(run_span(&run_id)).await
/// ```
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("deploykit.run", run_id = %run_id)
}

/// Emit event: an orchestrator operation started.
pub fn emit_run_started(run_id: &str, operation: &str, topology: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        operation = %operation,
        topology = %topology,
    );
}

/// Emit event: an orchestrator operation finished.
pub fn emit_run_finished(run_id: &str, operation: &str, duration_ms: u64, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        operation = %operation,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: one orchestration step began.
pub fn emit_step(run_id: &str, step: &str) {
    info!(event = "run.step", run_id = %run_id, step = %step);
}
