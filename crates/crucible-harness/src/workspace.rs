//! On-disk project workspace.
//!
//! A workspace is created fresh for every pipeline attempt and owned
//! exclusively by the orchestrator until the run ends. Materialization
//! never deletes anything it finds on disk — removal is a separate,
//! explicit operation invoked by the orchestrator after a failed build.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crucible_core::{CrucibleError, FileBlock, Language, Result};

/// Content markers that identify a runnable entry point in an
/// interpretable file.
const RUNNABLE_MAIN_MARKERS: &[&str] = &["if __name__ ==", "def main("];

/// One project's materialized files for one pipeline attempt.
#[derive(Debug, Clone)]
pub struct ProjectWorkspace {
    root: PathBuf,
    language: Language,
    files: Vec<FileBlock>,
    saved_files: Vec<String>,
    entry_file: Option<String>,
}

impl ProjectWorkspace {
    /// Write every block under `<projects_root>/<project>/`, creating
    /// intermediate directories for nested filenames. Each file gets a
    /// trailing newline if its content lacks one.
    ///
    /// For interpretable languages the entry file is the first non-test
    /// file carrying a runnable-main marker; for compiled languages entry
    /// selection belongs to the build step.
    pub fn materialize(
        projects_root: &Path,
        project: &str,
        language: Language,
        blocks: Vec<FileBlock>,
    ) -> Result<Self> {
        let root = projects_root.join(project);
        fs::create_dir_all(&root).map_err(|e| workspace_error(&root, e))?;

        let mut saved_files = Vec::with_capacity(blocks.len());
        let mut entry_file: Option<String> = None;

        for block in &blocks {
            let path = root.join(&block.filename);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| workspace_error(parent, e))?;
            }

            let mut content = block.content.clone();
            if !content.ends_with('\n') {
                content.push('\n');
            }
            fs::write(&path, content).map_err(|e| workspace_error(&path, e))?;
            debug!(file = %block.filename, bytes = block.content.len(), "wrote file");
            saved_files.push(block.filename.clone());

            if !language.is_compiled() && entry_file.is_none() && is_entry_candidate(block) {
                entry_file = Some(block.filename.clone());
            }
        }

        info!(
            root = %root.display(),
            files = saved_files.len(),
            entry = entry_file.as_deref().unwrap_or("-"),
            "workspace materialized"
        );

        Ok(Self {
            root,
            language,
            files: blocks,
            saved_files,
            entry_file,
        })
    }

    /// Workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// The blocks this workspace was materialized from.
    pub fn files(&self) -> &[FileBlock] {
        &self.files
    }

    /// Relative paths written, in materialization order.
    pub fn saved_files(&self) -> &[String] {
        &self.saved_files
    }

    /// Entry file for interpretable languages, if one was recognized.
    pub fn entry_file(&self) -> Option<&str> {
        self.entry_file.as_deref()
    }

    /// Absolute paths of saved files carrying the given extension
    /// (without the leading dot).
    pub fn sources_with_extension(&self, extension: &str) -> Vec<PathBuf> {
        self.saved_files
            .iter()
            .filter(|name| {
                Path::new(name)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .map(|name| self.root.join(name))
            .collect()
    }

    /// Remove the entire workspace directory.
    pub fn remove(&self) -> Result<()> {
        fs::remove_dir_all(&self.root).map_err(|e| workspace_error(&self.root, e))
    }
}

fn workspace_error(path: &Path, source: std::io::Error) -> CrucibleError {
    CrucibleError::Workspace {
        path: path.display().to_string(),
        source,
    }
}

fn is_entry_candidate(block: &FileBlock) -> bool {
    let basename = Path::new(&block.filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if basename.starts_with("test") {
        return false;
    }
    RUNNABLE_MAIN_MARKERS
        .iter()
        .any(|marker| block.content.contains(marker))
}
