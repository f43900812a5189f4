//! Single-command multi-file compilation.
//!
//! One compiler invocation covers every eligible source file in the
//! workspace; there is deliberately no incremental or per-file
//! compilation. A workspace with nothing to compile fails fast without
//! touching the compiler.

use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::{info, warn};

use crucible_core::{BuildOutcome, Result};

use crate::config::ToolchainConfig;
use crate::workspace::ProjectWorkspace;

/// Invokes the per-language compiler over a materialized workspace.
#[derive(Debug, Clone)]
pub struct BuildInvoker {
    toolchain: ToolchainConfig,
}

impl BuildInvoker {
    pub fn new(toolchain: ToolchainConfig) -> Self {
        Self { toolchain }
    }

    /// Compile the workspace and capture the compiler's output.
    ///
    /// A missing compiler binary or a spawn failure is an environment
    /// problem and propagates as a fatal error; only a real compiler
    /// rejection comes back as a failed [`BuildOutcome`].
    pub async fn build(&self, workspace: &ProjectWorkspace) -> Result<BuildOutcome> {
        let language = workspace.language();
        let Some(extension) = language.compile_extension() else {
            // Interpretable languages have no build step.
            return Ok(BuildOutcome {
                succeeded: true,
                stdout: String::new(),
                stderr: String::new(),
                artifact: None,
                duration_ms: 0,
            });
        };

        let sources = workspace.sources_with_extension(extension);
        if sources.is_empty() {
            warn!(root = %workspace.root().display(), "nothing to compile");
            return Ok(BuildOutcome {
                succeeded: false,
                stdout: String::new(),
                stderr: format!(
                    "no .{extension} source files to compile in {}",
                    workspace.root().display()
                ),
                artifact: None,
                duration_ms: 0,
            });
        }

        let (argv, artifact) = self
            .toolchain
            .compile_command(language, &sources, workspace.root())
            .expect("compiled language has a compile command");

        info!(command = ?argv, "invoking compiler");
        let start = Instant::now();
        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .current_dir(workspace.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let succeeded = output.status.success();
        if succeeded {
            info!(duration_ms, "build succeeded");
        } else {
            warn!(
                exit_code = output.status.code().unwrap_or(-1),
                duration_ms, "build failed"
            );
        }

        Ok(BuildOutcome {
            succeeded,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            artifact: if succeeded { artifact } else { None },
            duration_ms,
        })
    }
}
