//! Retry orchestration.
//!
//! One run: split → materialize → (build →) execute → report. The only
//! back-edge is the regeneration loop: a failed build discards the
//! workspace, asks the collaborator for corrected text, and re-enters the
//! pipeline with it. The loop is bounded by `retry.max_attempts`; the
//! other terminators are a successful build/execution or a collaborator
//! failure.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crucible_core::{
    split_source, ExecutionOutcome, ExecutionStatus, Language, PipelineReport, PipelineStatus,
    Result, RunSpec,
};

use crate::builder::BuildInvoker;
use crate::config::CrucibleConfig;
use crate::regen::{RegenerationRequest, Regenerator};
use crate::supervisor::ExecutionSupervisor;
use crate::workspace::ProjectWorkspace;

/// Drives one generated-code submission through verification.
pub struct Pipeline {
    config: CrucibleConfig,
    builder: BuildInvoker,
    supervisor: ExecutionSupervisor,
    regenerator: Arc<dyn Regenerator>,
}

/// What the regeneration step decided.
enum NextCode {
    /// Corrected text obtained; re-enter the pipeline with it.
    Regenerated(String),

    /// Attempt budget consumed; stop with `RetriesExhausted`.
    Exhausted,

    /// The collaborator failed; stop with `RegenerationFailed`.
    Failed(String),
}

impl Pipeline {
    pub fn new(config: CrucibleConfig, regenerator: Arc<dyn Regenerator>) -> Self {
        let builder = BuildInvoker::new(config.toolchain.clone());
        let supervisor = ExecutionSupervisor::new(config.execution.clone());
        Self {
            config,
            builder,
            supervisor,
            regenerator,
        }
    }

    pub fn config(&self) -> &CrucibleConfig {
        &self.config
    }

    /// Run the full pipeline for one submission.
    ///
    /// Concurrent runs for the same project name are unsupported — each
    /// retry deletes and recreates the project directory, so callers must
    /// serialize per project name.
    pub async fn run(
        &self,
        raw_code: &str,
        language: Language,
        project: &str,
    ) -> Result<PipelineReport> {
        let spec = RunSpec::new(project, language, raw_code)?;
        let start = Instant::now();
        info!(
            run_id = %spec.run_id,
            project,
            language = %language,
            code_digest = %spec.code_digest,
            "pipeline started"
        );

        let mut code = raw_code.to_string();
        let mut regenerated_code: Option<String> = None;
        let mut regens_used: u32 = 0;

        loop {
            let attempt = regens_used + 1;
            debug!(attempt, "splitting source");
            let blocks = split_source(&code, language);
            let workspace = ProjectWorkspace::materialize(
                &self.config.projects_root,
                project,
                language,
                blocks,
            )?;
            let files = workspace.saved_files().to_vec();

            if language.is_compiled() {
                let build = self.builder.build(&workspace).await?;
                if !build.succeeded {
                    warn!(run_id = %spec.run_id, attempt, "build failed; discarding workspace");
                    self.discard(&workspace);
                    match self
                        .next_code(project, &code, build.diagnostic(), &mut regens_used)
                        .await
                    {
                        NextCode::Regenerated(new_code) => {
                            regenerated_code = Some(new_code.clone());
                            code = new_code;
                            continue;
                        }
                        NextCode::Exhausted => {
                            return Ok(self.report(
                                &spec,
                                PipelineStatus::RetriesExhausted,
                                format!(
                                    "build still failing after {regens_used} regeneration attempts"
                                ),
                                files,
                                build.stdout,
                                build.stderr,
                                attempt,
                                regenerated_code,
                                start,
                            ));
                        }
                        NextCode::Failed(reason) => {
                            return Ok(self.report(
                                &spec,
                                PipelineStatus::RegenerationFailed,
                                reason,
                                files,
                                build.stdout,
                                build.stderr,
                                attempt,
                                regenerated_code,
                                start,
                            ));
                        }
                    }
                }

                let Some(artifact) = build.artifact.clone() else {
                    // javac emits class files; nothing to invoke directly
                    return Ok(self.report(
                        &spec,
                        PipelineStatus::Succeeded,
                        "compilation succeeded; no runnable artifact to execute".to_string(),
                        files,
                        build.stdout,
                        build.stderr,
                        attempt,
                        regenerated_code,
                        start,
                    ));
                };

                let argv = vec![artifact.display().to_string()];
                let outcome = self.supervisor.execute(&argv, workspace.root(), &[]).await;

                if outcome.status == ExecutionStatus::RuntimeError
                    && self.config.retry.regenerate_on_runtime_error
                {
                    warn!(
                        run_id = %spec.run_id,
                        attempt,
                        "runtime error fed back into regeneration by policy"
                    );
                    self.discard(&workspace);
                    match self
                        .next_code(project, &code, &outcome.stderr, &mut regens_used)
                        .await
                    {
                        NextCode::Regenerated(new_code) => {
                            regenerated_code = Some(new_code.clone());
                            code = new_code;
                            continue;
                        }
                        NextCode::Exhausted => {
                            return Ok(self.report(
                                &spec,
                                PipelineStatus::RetriesExhausted,
                                format!(
                                    "program still failing after {regens_used} regeneration attempts"
                                ),
                                files,
                                outcome.stdout,
                                outcome.stderr,
                                attempt,
                                regenerated_code,
                                start,
                            ));
                        }
                        NextCode::Failed(reason) => {
                            return Ok(self.report(
                                &spec,
                                PipelineStatus::RegenerationFailed,
                                reason,
                                files,
                                outcome.stdout,
                                outcome.stderr,
                                attempt,
                                regenerated_code,
                                start,
                            ));
                        }
                    }
                }

                return Ok(self.execution_report(
                    &spec,
                    outcome,
                    files,
                    attempt,
                    regenerated_code,
                    start,
                ));
            }

            // Interpretable: no build step.
            let Some(entry) = workspace.entry_file() else {
                return Ok(self.report(
                    &spec,
                    PipelineStatus::Succeeded,
                    "no runnable entry file detected; workspace saved without execution"
                        .to_string(),
                    files,
                    String::new(),
                    String::new(),
                    attempt,
                    regenerated_code,
                    start,
                ));
            };

            let argv = self
                .config
                .toolchain
                .interpreter_command(language, Path::new(entry))
                .expect("interpretable language has an interpreter command");
            let env = self.config.toolchain.run_env(language);
            let outcome = self.supervisor.execute(&argv, workspace.root(), &env).await;
            return Ok(self.execution_report(
                &spec,
                outcome,
                files,
                attempt,
                regenerated_code,
                start,
            ));
        }
    }

    /// One regeneration step: consult the bound, invoke the collaborator,
    /// validate its output.
    async fn next_code(
        &self,
        project: &str,
        original: &str,
        diagnostic: &str,
        regens_used: &mut u32,
    ) -> NextCode {
        if *regens_used >= self.config.retry.max_attempts {
            return NextCode::Exhausted;
        }

        let request = RegenerationRequest {
            project: project.to_string(),
            original_code: original.to_string(),
            diagnostic: diagnostic.to_string(),
            attempt: *regens_used + 1,
        };
        match self.regenerator.regenerate(&request).await {
            Ok(text) if text.trim().is_empty() => {
                NextCode::Failed("collaborator returned empty output".to_string())
            }
            Ok(text) => {
                *regens_used += 1;
                NextCode::Regenerated(text)
            }
            Err(e) => NextCode::Failed(e.to_string()),
        }
    }

    fn execution_report(
        &self,
        spec: &RunSpec,
        outcome: ExecutionOutcome,
        files: Vec<String>,
        attempts: u32,
        regenerated_code: Option<String>,
        start: Instant,
    ) -> PipelineReport {
        let (status, message) = match outcome.status {
            ExecutionStatus::Success => (
                PipelineStatus::Succeeded,
                "program executed successfully".to_string(),
            ),
            ExecutionStatus::RuntimeError => (
                PipelineStatus::RuntimeError,
                match outcome.exit_code {
                    Some(code) => format!("program exited with code {code}"),
                    None => "program was terminated by a signal".to_string(),
                },
            ),
            ExecutionStatus::Timeout => (
                PipelineStatus::Timeout,
                format!(
                    "execution exceeded the {} ms budget",
                    self.config.execution.timeout_ms
                ),
            ),
            ExecutionStatus::LaunchError => (
                PipelineStatus::LaunchError,
                "program could not be launched".to_string(),
            ),
        };
        self.report(
            spec,
            status,
            message,
            files,
            outcome.stdout,
            outcome.stderr,
            attempts,
            regenerated_code,
            start,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        spec: &RunSpec,
        status: PipelineStatus,
        message: String,
        files: Vec<String>,
        stdout: String,
        stderr: String,
        attempts: u32,
        regenerated_code: Option<String>,
        start: Instant,
    ) -> PipelineReport {
        info!(
            run_id = %spec.run_id,
            status = ?status,
            attempts,
            "pipeline finished"
        );
        PipelineReport {
            run_id: spec.run_id.to_string(),
            project: spec.project.clone(),
            language: spec.language,
            status,
            message,
            files,
            stdout,
            stderr,
            attempts,
            regenerated_code,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Best-effort workspace deletion; a failure is logged, never blocks
    /// the regeneration step.
    fn discard(&self, workspace: &ProjectWorkspace) {
        if let Err(e) = workspace.remove() {
            warn!(
                error = %e,
                path = %workspace.root().display(),
                "failed to remove workspace; continuing"
            );
        }
    }
}
