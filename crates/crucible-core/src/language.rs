//! Closed language variant and per-language descriptor table.
//!
//! Every component dispatches on [`Language`] through this table rather
//! than comparing strings, so adding a language is a single-file change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrucibleError;

/// Target languages the harness can materialize and verify.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Cpp,
    Java,
}

impl Language {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }

    /// Whether the language needs a compile step before execution.
    pub fn is_compiled(&self) -> bool {
        matches!(self, Language::Cpp | Language::Java)
    }

    /// Comment tokens that may open a file-boundary marker line.
    ///
    /// The bold delimiter `**` is accepted for every language in addition
    /// to these; generated text frequently bolds filenames instead of
    /// commenting them.
    pub fn comment_tokens(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["#"],
            Language::Cpp | Language::Java => &["//"],
        }
    }

    /// File extensions a marker line may name.
    pub fn marker_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[".py"],
            Language::Cpp => &[".cpp", ".h"],
            Language::Java => &[".java"],
        }
    }

    /// Extension of the files handed to the compiler, `None` for
    /// interpretable languages.
    pub fn compile_extension(&self) -> Option<&'static str> {
        match self {
            Language::Python => None,
            Language::Cpp => Some("cpp"),
            Language::Java => Some("java"),
        }
    }

    /// Fallback filename when the input carries no markers at all.
    pub fn default_entry_filename(&self) -> &'static str {
        match self {
            Language::Python => "main.py",
            Language::Cpp => "main.cpp",
            Language::Java => "Main.java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = CrucibleError;

    /// Parse a user-facing language tag. Accepts the aliases generation
    /// front-ends actually send: `python`, `cpp`, `c++`, `java`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "cpp" | "c++" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            other => Err(CrucibleError::UnknownLanguage(other.to_string())),
        }
    }
}
