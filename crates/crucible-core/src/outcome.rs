//! Immutable results for build, execution, and the overall pipeline.
//!
//! `BuildOutcome` and `ExecutionOutcome` are internal to the harness; only
//! [`PipelineReport`] crosses the caller boundary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::language::Language;

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Result of one compiler invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildOutcome {
    /// Whether the compiler exited with code zero.
    pub succeeded: bool,

    /// Captured compiler stdout.
    pub stdout: String,

    /// Captured compiler stderr.
    pub stderr: String,

    /// Produced artifact path, when the language yields a single binary.
    pub artifact: Option<PathBuf>,

    /// Compiler wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildOutcome {
    /// The text most useful to a caller (or the regeneration collaborator)
    /// for acting on a failure: stderr when present, stdout otherwise.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Terminal state of one supervised run attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Child exited with code zero.
    Success,

    /// Child exited with a non-zero code (or died on a signal).
    RuntimeError,

    /// Wall-clock budget elapsed; the child was terminated.
    Timeout,

    /// The child process could not be started at all.
    LaunchError,
}

/// Result of supervising one child process to completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,

    /// Exit code, absent on launch failure or signal death.
    pub exit_code: Option<i32>,

    /// Drained standard output (partial on timeout).
    pub stdout: String,

    /// Drained standard error (partial on timeout).
    pub stderr: String,

    /// Wall-clock duration from spawn in milliseconds.
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Terminal status of a whole pipeline run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Program built (when applicable) and exited cleanly, or there was
    /// nothing to execute and the workspace was saved.
    Succeeded,

    /// Program launched but exited non-zero.
    RuntimeError,

    /// Program exceeded the execution budget.
    Timeout,

    /// Program (or interpreter) could not be launched.
    LaunchError,

    /// Builds kept failing and the attempt budget ran out.
    RetriesExhausted,

    /// The regeneration collaborator failed or returned nothing usable.
    RegenerationFailed,
}

/// Externally visible outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineReport {
    /// Identity of the run (see `RunSpec`).
    pub run_id: String,

    /// Project name the workspace was created under.
    pub project: String,

    /// Target language.
    pub language: Language,

    pub status: PipelineStatus,

    /// Human-readable summary of what happened.
    pub message: String,

    /// Relative paths written into the workspace on the final attempt.
    pub files: Vec<String>,

    /// Program or compiler stdout, depending on where the run ended.
    pub stdout: String,

    /// Program or compiler stderr — the diagnostic text on failures.
    pub stderr: String,

    /// Pipeline attempts consumed (1 = no regeneration needed).
    pub attempts: u32,

    /// Corrected text from the collaborator, when regeneration ran.
    pub regenerated_code: Option<String>,

    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Whether the run ended in the success state.
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Succeeded
    }
}
