//! Error taxonomy for genforge.
//!
//! Low-confidence responses and parse failures never show up here: the
//! router and the stages absorb them. What remains is what a caller can act on.

use crate::domain::Stage;
use crate::router::TaskType;

/// A provider could not be reached or answered with something unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("network error calling {provider}: {message}")]
    Network { provider: String, message: String },

    #[error("{provider} timed out after {timeout_secs}s")]
    Timeout { provider: String, timeout_secs: u64 },

    #[error("could not decode {provider} response: {message}")]
    Decode { provider: String, message: String },

    #[error("{provider} returned an empty completion")]
    EmptyResponse { provider: String },
}

/// Errors produced by the provider router.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    /// Configuration error: nothing to route to.
    #[error("no AI provider is configured")]
    NoProviders,

    #[error("all {attempts} candidate(s) for {task} failed; last error: {last}")]
    Exhausted {
        task: TaskType,
        attempts: usize,
        last: TransportError,
    },
}

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors a stage lets escape instead of substituting a default.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("code generation failed for an existing project: {0}")]
    Generation(String),

    #[error("router error: {0}")]
    Router(#[from] RouterError),
}

/// Top-level genforge errors.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("router error: {0}")]
    Router(#[from] RouterError),

    #[error("stage error: {0}")]
    Stage(#[from] StageError),

    #[error("storage error: {0}")]
    Store(#[from] genforge_state::StoreError),

    #[error("run cancelled before the {0} stage")]
    Cancelled(Stage),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for genforge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_error_names_task_and_last_failure() {
        let err = RouterError::Exhausted {
            task: TaskType::Coding,
            attempts: 2,
            last: TransportError::Timeout {
                provider: "groq".to_string(),
                timeout_secs: 60,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("coding"));
        assert!(msg.contains("groq timed out after 60s"));
    }

    #[test]
    fn digest_mismatch_error() {
        let err = ForgeError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }
}
