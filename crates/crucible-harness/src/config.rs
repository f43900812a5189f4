//! Harness configuration.
//!
//! Everything a component needs — toolchain paths, budgets, retry policy —
//! is threaded in at construction time; nothing reads ambient global state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crucible_core::{CrucibleError, Language, Result};

/// Default execution timeout in milliseconds (30 seconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default graceful-termination window in milliseconds.
pub const DEFAULT_GRACE_MS: u64 = 5_000;
/// Default liveness poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
/// Default bound on regeneration attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Toolchain
// ---------------------------------------------------------------------------

/// Per-language toolchain commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Python interpreter binary.
    pub python_interpreter: String,

    /// C++ compiler binary.
    pub cpp_compiler: String,

    /// Flags passed to every C++ compilation.
    pub cpp_flags: Vec<String>,

    /// Name of the C++ output artifact inside the workspace.
    pub cpp_artifact_name: String,

    /// Java compiler binary.
    pub java_compiler: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            python_interpreter: "python3".to_string(),
            cpp_compiler: "g++".to_string(),
            cpp_flags: vec!["-std=c++11".to_string()],
            cpp_artifact_name: "main".to_string(),
            java_compiler: "javac".to_string(),
        }
    }
}

impl ToolchainConfig {
    /// One compiler invocation covering every eligible source, plus the
    /// artifact path it produces (C++ only — javac emits class files).
    /// `None` for interpretable languages.
    pub fn compile_command(
        &self,
        language: Language,
        sources: &[PathBuf],
        workspace_root: &Path,
    ) -> Option<(Vec<String>, Option<PathBuf>)> {
        match language {
            Language::Python => None,
            Language::Cpp => {
                let artifact = workspace_root.join(&self.cpp_artifact_name);
                let mut argv = vec![self.cpp_compiler.clone()];
                argv.extend(self.cpp_flags.iter().cloned());
                argv.extend(sources.iter().map(|p| p.display().to_string()));
                argv.push("-o".to_string());
                argv.push(artifact.display().to_string());
                Some((argv, Some(artifact)))
            }
            Language::Java => {
                let mut argv = vec![self.java_compiler.clone()];
                argv.extend(sources.iter().map(|p| p.display().to_string()));
                Some((argv, None))
            }
        }
    }

    /// Command that runs an interpretable entry file, `None` for compiled
    /// languages (those run their artifact directly).
    pub fn interpreter_command(&self, language: Language, entry: &Path) -> Option<Vec<String>> {
        match language {
            Language::Python => Some(vec![
                self.python_interpreter.clone(),
                entry.display().to_string(),
            ]),
            Language::Cpp | Language::Java => None,
        }
    }

    /// Extra environment variables for a supervised run.
    pub fn run_env(&self, language: Language) -> Vec<(String, String)> {
        match language {
            Language::Python => vec![("PYTHONWARNINGS".to_string(), "ignore".to_string())],
            Language::Cpp | Language::Java => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution budgets
// ---------------------------------------------------------------------------

/// Budgets for supervising one child process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Wall-clock budget in milliseconds, measured from spawn.
    pub timeout_ms: u64,

    /// Window between graceful termination and forceful kill.
    pub grace_ms: u64,

    /// Liveness poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            grace_ms: DEFAULT_GRACE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Policy governing the regeneration loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum regeneration attempts before giving up.
    pub max_attempts: u32,

    /// Whether a compiled program that builds but exits non-zero re-enters
    /// the regeneration loop like a build failure.
    pub regenerate_on_runtime_error: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            regenerate_on_runtime_error: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Top-level harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrucibleConfig {
    /// Directory under which project workspaces are created.
    pub projects_root: PathBuf,

    pub toolchain: ToolchainConfig,

    pub execution: ExecutionConfig,

    pub retry: RetryConfig,
}

impl Default for CrucibleConfig {
    fn default() -> Self {
        Self {
            projects_root: PathBuf::from("generated_projects"),
            toolchain: ToolchainConfig::default(),
            execution: ExecutionConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl CrucibleConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workspace root directory.
    pub fn with_projects_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.projects_root = root.into();
        self
    }

    /// Set the execution timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.execution.timeout_ms = timeout_ms;
        self
    }

    /// Set the regeneration attempt bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    /// Load configuration from a TOML file. Missing keys fall back to
    /// defaults section by section.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| CrucibleError::Config(format!("{}: {e}", path.display())))
    }
}
