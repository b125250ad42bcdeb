//! Run artifact persistence.
//!
//! A [`RunArtifact`] is the integrity-checked record of a finished run: the
//! full [`PipelineResult`] plus a SHA-256 digest of its canonical JSON.
//!
//! Artifacts are written to `<dir>/<session_id>/pipeline.json` with a
//! companion `<dir>/<session_id>/pipeline.digest` file for out-of-band checks.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{ForgeError, PipelineResult, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    pub session_id: String,
    pub written_at: DateTime<Utc>,
    pub result: PipelineResult,
    /// SHA-256 hex digest of `serde_json::to_vec(&result)`.
    pub result_digest: String,
}

/// SHA-256 hex digest of the compact JSON encoding of `result`.
pub fn result_digest(result: &PipelineResult) -> Result<String> {
    let bytes = serde_json::to_vec(result)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Write `result` to `<dir>/<session_id>/pipeline.json` plus `pipeline.digest`.
///
/// Returns the path to `pipeline.json`.
pub fn write_run_artifact(result: &PipelineResult, session_id: &str, dir: &Path) -> Result<PathBuf> {
    let artifact = RunArtifact {
        session_id: session_id.to_string(),
        written_at: Utc::now(),
        result: result.clone(),
        result_digest: result_digest(result)?,
    };

    let run_dir = dir.join(session_id);
    std::fs::create_dir_all(&run_dir)?;

    let json_path = run_dir.join("pipeline.json");
    std::fs::write(&json_path, serde_json::to_vec_pretty(&artifact)?)?;
    std::fs::write(run_dir.join("pipeline.digest"), artifact.result_digest.as_bytes())?;

    Ok(json_path)
}

/// Read and verify `<dir>/<session_id>/pipeline.json`.
///
/// The digest is re-derived from the stored result and compared with both
/// the embedded value and `pipeline.digest`; any difference is
/// `ForgeError::DigestMismatch`.
pub fn read_run_artifact(session_id: &str, dir: &Path) -> Result<RunArtifact> {
    let run_dir = dir.join(session_id);
    let artifact: RunArtifact = serde_json::from_slice(&std::fs::read(run_dir.join("pipeline.json"))?)?;

    let actual = result_digest(&artifact.result)?;
    if actual != artifact.result_digest {
        return Err(ForgeError::DigestMismatch {
            expected: artifact.result_digest,
            actual,
        });
    }

    let recorded = std::fs::read_to_string(run_dir.join("pipeline.digest"))?;
    if recorded.trim() != actual {
        return Err(ForgeError::DigestMismatch {
            expected: recorded.trim().to_string(),
            actual,
        });
    }

    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genforge_state::FileOperation;

    fn sample() -> PipelineResult {
        let mut result = PipelineResult::failure("m", vec![]);
        result.success = true;
        result.errors = None;
        result.files = vec![FileOperation::create("src/App.tsx", "export default function App() {}")];
        result
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = result_digest(&sample()).unwrap();
        assert_eq!(a, result_digest(&sample()).unwrap());
        assert_eq!(a.len(), 64);

        let mut changed = sample();
        changed.files[0].content.push(' ');
        assert_ne!(a, result_digest(&changed).unwrap());
    }

    #[test]
    fn missing_artifact_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_run_artifact("nope", dir.path()).unwrap_err();
        assert!(matches!(err, ForgeError::Io(_)));
    }
}
