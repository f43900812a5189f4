//! Regeneration collaborator seam.
//!
//! When a build fails, the orchestrator hands the original text and the
//! compiler diagnostic to a [`Regenerator`] and retries with whatever it
//! returns. The collaborator is external: the harness only knows how to
//! invoke it and consume its output.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

use crucible_core::{CrucibleError, Result};

/// What the collaborator receives when a build fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegenerationRequest {
    /// Project whose build failed.
    pub project: String,

    /// The raw text that failed to compile.
    pub original_code: String,

    /// Captured compiler diagnostic.
    pub diagnostic: String,

    /// 1-based regeneration attempt number.
    pub attempt: u32,
}

/// External collaborator that produces corrected source text.
#[async_trait]
pub trait Regenerator: Send + Sync {
    /// Produce corrected raw source text for a failed build.
    async fn regenerate(&self, request: &RegenerationRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Subprocess bridge
// ---------------------------------------------------------------------------

/// Bridges regeneration to an external command.
///
/// The request is written to the command's stdin as JSON; the corrected
/// source text is read from its stdout. A non-zero exit or blank output
/// is a collaborator failure.
#[derive(Debug, Clone)]
pub struct CommandRegenerator {
    command: Vec<String>,
}

impl CommandRegenerator {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Regenerator for CommandRegenerator {
    async fn regenerate(&self, request: &RegenerationRequest) -> Result<String> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(CrucibleError::Regeneration(
                "empty regeneration command".to_string(),
            ));
        };

        info!(command = %program, attempt = request.attempt, "invoking regeneration collaborator");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CrucibleError::Regeneration(format!("failed to launch {program}: {e}"))
            })?;

        let payload = serde_json::to_vec(request)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(|e| {
                CrucibleError::Regeneration(format!("failed to write request: {e}"))
            })?;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            CrucibleError::Regeneration(format!("collaborator did not finish: {e}"))
        })?;

        if !output.status.success() {
            return Err(CrucibleError::Regeneration(format!(
                "collaborator exited with {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(CrucibleError::Regeneration(
                "collaborator returned empty output".to_string(),
            ));
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Disabled stand-in
// ---------------------------------------------------------------------------

/// Stand-in used when no collaborator is configured; always fails, which
/// terminates the retry chain on the first build failure.
#[derive(Debug, Clone, Default)]
pub struct NullRegenerator;

#[async_trait]
impl Regenerator for NullRegenerator {
    async fn regenerate(&self, _request: &RegenerationRequest) -> Result<String> {
        Err(CrucibleError::Regeneration(
            "no regeneration collaborator configured".to_string(),
        ))
    }
}
