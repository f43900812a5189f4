//! Domain-level error taxonomy for Crucible.
//!
//! Only fatal conditions are errors. Build failures, timeouts, runtime
//! errors, and launch failures are statuses on the corresponding outcome
//! types — they are reportable results, not errors.

/// Crucible domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CrucibleError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("invalid run spec: {0}")]
    InvalidRunSpec(String),

    #[error("workspace error at {path}: {source}")]
    Workspace {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("regeneration failed: {0}")]
    Regeneration(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Crucible domain operations.
pub type Result<T> = std::result::Result<T, CrucibleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrucibleError::UnknownLanguage("ruby".to_string());
        assert!(err.to_string().contains("unknown language"));

        let err = CrucibleError::Regeneration("collaborator unreachable".to_string());
        assert!(err.to_string().contains("regeneration failed"));

        let err = CrucibleError::InvalidRunSpec("project cannot be empty".to_string());
        assert!(err.to_string().contains("invalid run spec"));
    }

    #[test]
    fn test_workspace_error_carries_path() {
        let err = CrucibleError::Workspace {
            path: "/tmp/projects/demo".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/projects/demo"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CrucibleError = io.into();
        assert!(matches!(err, CrucibleError::Io(_)));
    }
}
