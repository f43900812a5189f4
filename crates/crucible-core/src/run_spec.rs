//! Pipeline run identity and digest computation.
//!
//! Every pipeline invocation mints a [`RunSpec`]: a uuid plus a stable
//! SHA-256 digest over the submission, used for structured logging and
//! carried into the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{CrucibleError, Result};
use crate::language::Language;

/// Identity of one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSpec {
    /// Unique identifier for this run.
    pub run_id: Uuid,

    /// SHA-256 hex digest computed from the spec fields.
    pub spec_digest: String,

    /// Project name the workspace is created under.
    pub project: String,

    /// Target language.
    pub language: Language,

    /// SHA-256 hex digest of the raw submitted code.
    pub code_digest: String,

    /// When this spec was created.
    pub created_at: DateTime<Utc>,
}

/// Input fields for computing the run spec digest.
#[derive(Debug, Clone, Serialize)]
struct RunSpecFields<'a> {
    project: &'a str,
    language: Language,
    code_digest: &'a str,
}

impl RunSpec {
    /// Create a new run spec with computed digests.
    pub fn new(project: &str, language: Language, raw_code: &str) -> Result<Self> {
        if project.trim().is_empty() {
            return Err(CrucibleError::InvalidRunSpec(
                "project cannot be empty".to_string(),
            ));
        }
        if raw_code.trim().is_empty() {
            return Err(CrucibleError::InvalidRunSpec(
                "raw code cannot be empty".to_string(),
            ));
        }

        let code_digest = sha256_hex(raw_code.as_bytes());
        let fields = RunSpecFields {
            project,
            language,
            code_digest: &code_digest,
        };
        let spec_digest = sha256_hex(&serde_json::to_vec(&fields)?);

        Ok(Self {
            run_id: Uuid::new_v4(),
            spec_digest,
            project: project.to_string(),
            language,
            code_digest,
            created_at: Utc::now(),
        })
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
