//! Error types shared by every stage of the pipeline.
//!
//! Every variant is fatal to the goal that raised it; nothing in the pipeline
//! retries. The CLI layer turns these into a non-zero exit code.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Repository or network failure while fetching an artifact
    #[error("Failed to resolve {coordinates}: {reason}")]
    ResolutionFailure { coordinates: String, reason: String },

    /// The repository answered, but the artifact is not there
    #[error("Artifact not found: {coordinates}")]
    ArtifactNotFound { coordinates: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid GWT home {}: missing required file {missing}", path.display())]
    InvalidHome { path: PathBuf, missing: String },

    #[error("Unsupported classpath scope '{0}'. Valid scopes: compile, runtime, test")]
    UnsupportedScope(String),

    #[error("GWT module '{name}' not found in {searched} source/resource root(s)")]
    ModuleNotFound { name: String, searched: usize },

    #[error("{tool} failed with exit status {status}")]
    ToolInvocation { tool: String, status: i32 },

    #[error("There were test failures: {failures} failed, {errors} in error")]
    TestFailures { failures: usize, errors: usize },

    #[error("{tool} timed out after {seconds}s and was terminated")]
    Timeout { tool: String, seconds: u64 },

    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to generate {}: {reason}", path.display())]
    TemplateGeneration { path: PathBuf, reason: String },

    #[error("Malformed XML in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn resolution(coordinates: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResolutionFailure {
            coordinates: coordinates.into(),
            reason: reason.to_string(),
        }
    }

    pub fn template(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::TemplateGeneration {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
