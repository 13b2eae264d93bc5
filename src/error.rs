//! Error taxonomy for the pipeline.
//!
//! Every stage boundary returns [`PipelineError`]; a failed stage never
//! crashes the orchestrator and never mutates the script record, so the
//! caller can re-attempt the same stage with the same id. No stage retries
//! internally — generative calls are non-idempotent, so retry is a caller
//! decision.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload declares a format the extractor does not handle.
    #[error("unsupported document format: '{0}' (expected pdf or docx)")]
    UnsupportedFormat(String),

    /// The binary could not be parsed into text. No record is created.
    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),

    /// The generative capability returned an empty or null completion.
    /// The previously persisted field, if any, is left untouched.
    #[error("model returned an empty completion")]
    EmptyGeneration,

    /// The remote synthesis capability answered with a non-success status.
    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// A clip was unreadable or the merge itself errored. No partial file
    /// is left at the final path.
    #[error("audio assembly failed: {0}")]
    AssemblyFailed(String),

    /// The requested text field is empty, so there is nothing to render.
    #[error("no content available: {0} is empty")]
    NoContentAvailable(&'static str),

    /// A stage was invoked before the field it consumes was populated.
    #[error("cannot run {stage}: {field} is empty")]
    MissingPrerequisite {
        stage: &'static str,
        field: &'static str,
    },

    /// No script record exists under the given id.
    #[error("script not found: {0}")]
    RecordNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// Stable machine-readable kind, used in the stage failure envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::ExtractionFailed(_) => "ExtractionFailed",
            Self::EmptyGeneration => "EmptyGeneration",
            Self::SynthesisFailed(_) => "SynthesisFailed",
            Self::AssemblyFailed(_) => "AssemblyFailed",
            Self::NoContentAvailable(_) => "NoContentAvailable",
            Self::MissingPrerequisite { .. } => "MissingPrerequisite",
            Self::RecordNotFound(_) => "RecordNotFound",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::Http(_) => "Http",
        }
    }
}

/// Serializable form of a stage failure, for callers that speak JSON.
#[derive(Debug, Serialize)]
pub struct StageFailure {
    pub success: bool,
    pub error_kind: &'static str,
    pub detail: String,
}

impl From<&PipelineError> for StageFailure {
    fn from(err: &PipelineError) -> Self {
        Self {
            success: false,
            error_kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_envelope() {
        let err = PipelineError::MissingPrerequisite {
            stage: "dialogue",
            field: "rewritten_text",
        };
        let failure = StageFailure::from(&err);
        assert!(!failure.success);
        assert_eq!(failure.error_kind, "MissingPrerequisite");

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "MissingPrerequisite");
    }

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(PipelineError::EmptyGeneration.kind(), "EmptyGeneration");
        assert_eq!(
            PipelineError::UnsupportedFormat("epub".into()).kind(),
            "UnsupportedFormat"
        );
    }
}
