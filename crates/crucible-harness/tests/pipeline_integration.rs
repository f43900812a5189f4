//! Integration tests for the full pipeline, including the regeneration
//! back-edge.
//!
//! The "compiler" here is the shell: `sh main.cpp -o <artifact>` runs the
//! materialized file as a script with `$2` pointing at the artifact path,
//! so a submission can fail, or produce a runnable artifact, entirely
//! under test control.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crucible_core::{CrucibleError, Language, PipelineStatus};
use crucible_harness::{
    CrucibleConfig, NullRegenerator, Pipeline, RegenerationRequest, Regenerator,
};

/// Replays a scripted sequence of collaborator responses and records what
/// it observed when consulted.
struct ScriptedRegenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicU32,
    workspace_root: PathBuf,
    workspace_always_absent: AtomicBool,
    last_diagnostic: Mutex<String>,
}

impl ScriptedRegenerator {
    fn new(workspace_root: PathBuf, responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicU32::new(0),
            workspace_root,
            workspace_always_absent: AtomicBool::new(true),
            last_diagnostic: Mutex::new(String::new()),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Regenerator for ScriptedRegenerator {
    async fn regenerate(&self, request: &RegenerationRequest) -> crucible_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.workspace_root.exists() {
            self.workspace_always_absent.store(false, Ordering::SeqCst);
        }
        *self.last_diagnostic.lock().unwrap() = request.diagnostic.clone();
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(code)) => Ok(code),
            Some(Err(message)) => Err(CrucibleError::Regeneration(message)),
            None => Err(CrucibleError::Regeneration("script exhausted".to_string())),
        }
    }
}

fn shell_compiled_config(projects_root: &std::path::Path) -> CrucibleConfig {
    let mut config = CrucibleConfig::new().with_projects_root(projects_root);
    config.toolchain.cpp_compiler = "sh".to_string();
    config.toolchain.cpp_flags = Vec::new();
    config
}

/// A "source file" that compiles: the script writes a runnable artifact
/// to `$2` (the path after `-o`) and exits zero.
fn compiling_code(artifact_body: &str) -> String {
    format!("// main.cpp\nprintf '#!/bin/sh\\n{artifact_body}\\n' > \"$2\"\nchmod +x \"$2\"\n")
}

#[tokio::test]
async fn test_build_failure_regenerates_and_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace_root = dir.path().join("demo");
    let regen = Arc::new(ScriptedRegenerator::new(
        workspace_root.clone(),
        vec![Ok(compiling_code("echo OK"))],
    ));
    let pipeline = Pipeline::new(shell_compiled_config(dir.path()), regen.clone());

    let broken = "// main.cpp\necho 'boom' >&2\nexit 1\n";
    let report = pipeline
        .run(broken, Language::Cpp, "demo")
        .await
        .expect("run");

    assert_eq!(report.status, PipelineStatus::Succeeded);
    assert_eq!(report.stdout.trim(), "OK");
    assert_eq!(report.attempts, 2);
    assert_eq!(regen.calls(), 1);
    assert!(report.regenerated_code.is_some());

    // the collaborator received the captured diagnostic
    assert!(regen.last_diagnostic.lock().unwrap().contains("boom"));

    // the failed workspace was gone before regeneration began
    assert!(regen.workspace_always_absent.load(Ordering::SeqCst));

    // the successful workspace persists with the corrected file
    let rewritten =
        std::fs::read_to_string(workspace_root.join("main.cpp")).expect("workspace persists");
    assert!(rewritten.contains("echo OK"));
}

#[tokio::test]
async fn test_retries_exhausted_after_bounded_attempts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let broken = "// main.cpp\nexit 1\n".to_string();
    let regen = Arc::new(ScriptedRegenerator::new(
        dir.path().join("demo"),
        vec![Ok(broken.clone()), Ok(broken.clone()), Ok(broken.clone())],
    ));
    let mut config = shell_compiled_config(dir.path());
    config.retry.max_attempts = 2;
    let pipeline = Pipeline::new(config, regen.clone());

    let report = pipeline
        .run(&broken, Language::Cpp, "demo")
        .await
        .expect("run");

    assert_eq!(report.status, PipelineStatus::RetriesExhausted);
    assert_eq!(report.attempts, 3); // initial + two regenerations
    assert_eq!(regen.calls(), 2);
}

#[tokio::test]
async fn test_collaborator_failure_terminates_chain() {
    let dir = tempfile::tempdir().expect("tempdir");
    let regen = Arc::new(ScriptedRegenerator::new(
        dir.path().join("demo"),
        vec![Err("collaborator unreachable".to_string())],
    ));
    let pipeline = Pipeline::new(shell_compiled_config(dir.path()), regen.clone());

    let report = pipeline
        .run("// main.cpp\nexit 1\n", Language::Cpp, "demo")
        .await
        .expect("run");

    assert_eq!(report.status, PipelineStatus::RegenerationFailed);
    assert!(report.message.contains("collaborator unreachable"));
    assert_eq!(report.attempts, 1);
    assert_eq!(regen.calls(), 1);
}

#[tokio::test]
async fn test_no_eligible_sources_fails_without_compiler() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = shell_compiled_config(dir.path());
    // proves the compiler is never spawned on the fast-fail path
    config.toolchain.cpp_compiler = "/nonexistent/compiler".to_string();
    let pipeline = Pipeline::new(config, Arc::new(NullRegenerator));

    let report = pipeline
        .run("// util.h\nint f();\n", Language::Cpp, "demo")
        .await
        .expect("run");

    assert_eq!(report.status, PipelineStatus::RegenerationFailed);
    assert!(report.stderr.contains("no .cpp source files"));
}

#[tokio::test]
async fn test_runtime_error_feedback_policy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let regen = Arc::new(ScriptedRegenerator::new(
        dir.path().join("demo"),
        vec![Ok(compiling_code("echo FIXED"))],
    ));
    let mut config = shell_compiled_config(dir.path());
    config.retry.regenerate_on_runtime_error = true;
    let pipeline = Pipeline::new(config, regen.clone());

    // builds fine, but the produced program exits non-zero
    let report = pipeline
        .run(&compiling_code("exit 5"), Language::Cpp, "demo")
        .await
        .expect("run");

    assert_eq!(report.status, PipelineStatus::Succeeded);
    assert_eq!(report.stdout.trim(), "FIXED");
    assert_eq!(report.attempts, 2);
    assert_eq!(regen.calls(), 1);
}

#[tokio::test]
async fn test_runtime_error_without_policy_is_terminal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let regen = Arc::new(ScriptedRegenerator::new(dir.path().join("demo"), vec![]));
    let pipeline = Pipeline::new(shell_compiled_config(dir.path()), regen.clone());

    let report = pipeline
        .run(&compiling_code("exit 5"), Language::Cpp, "demo")
        .await
        .expect("run");

    assert_eq!(report.status, PipelineStatus::RuntimeError);
    assert_eq!(regen.calls(), 0);
}

#[tokio::test]
async fn test_java_build_only_success() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = CrucibleConfig::new().with_projects_root(dir.path());
    config.toolchain.java_compiler = "true".to_string();
    let pipeline = Pipeline::new(config, Arc::new(NullRegenerator));

    let report = pipeline
        .run(
            "// Main.java\nclass Main { public static void main(String[] a) {} }\n",
            Language::Java,
            "demo",
        )
        .await
        .expect("run");

    assert_eq!(report.status, PipelineStatus::Succeeded);
    assert!(report.message.contains("no runnable artifact"));
    assert_eq!(report.files, vec!["Main.java".to_string()]);
}
