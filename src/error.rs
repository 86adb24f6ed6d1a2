//! Typed errors surfaced by the classification engine.
//!
//! Every fatal condition has its own variant so outer layers (CLI, HTTP
//! handlers) can translate them without string matching. Recoverable
//! safeguard mismatches are not errors; they live in the decision log.

use crate::llm::LlmError;

/// Fieldless discriminant of [`ClassifyError`], for callers choosing exit
/// codes or status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedLine,
    InvalidJsonResponse,
    MissingSpeakerMapping,
    SpeakerNotFound,
    UnknownRole,
    InvalidTargetRoles,
    LlmCall,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedLine => "malformed_line",
            ErrorKind::InvalidJsonResponse => "invalid_json_response",
            ErrorKind::MissingSpeakerMapping => "missing_speaker_mapping",
            ErrorKind::SpeakerNotFound => "speaker_not_found",
            ErrorKind::UnknownRole => "unknown_role",
            ErrorKind::InvalidTargetRoles => "invalid_target_roles",
            ErrorKind::LlmCall => "llm_call",
        }
    }

    /// Process exit code used by the command-line front end
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::InvalidJsonResponse => 2,
            ErrorKind::MissingSpeakerMapping => 3,
            ErrorKind::SpeakerNotFound => 4,
            ErrorKind::InvalidTargetRoles => 5,
            ErrorKind::MalformedLine => 6,
            ErrorKind::UnknownRole => 7,
            ErrorKind::LlmCall => 8,
        }
    }
}

/// Errors that abort a classification run.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// A non-blank transcript line has no `<tag>:` prefix.
    #[error("Line {line_number} has no speaker tag separator: {line:?}")]
    MalformedLine { line_number: usize, line: String },

    /// The model's answer could not be read as the expected structure.
    #[error("Invalid response from model: {detail}")]
    InvalidJsonResponse { detail: String },

    /// The mapping left one or more transcript tags unmapped.
    #[error("Not all speakers are mapped. Missing: {}", missing.join(", "))]
    MissingSpeakerMapping { missing: Vec<String> },

    /// The mapping names tags that never occur in the transcript.
    #[error("Mapped speakers not found in transcript: {}", tags.join(", "))]
    SpeakerNotFound { tags: Vec<String> },

    /// The mapping assigns a role outside the target roles.
    #[error("Speaker '{tag}' mapped to '{role}', which is not one of: {}", allowed.join(", "))]
    UnknownRole {
        tag: String,
        role: String,
        allowed: Vec<String>,
    },

    #[error("Invalid target roles: {detail}")]
    InvalidTargetRoles { detail: String },

    /// The LLM collaborator itself failed (network, auth, quota).
    #[error("LLM call failed: {0}")]
    LlmCall(LlmError),
}

impl ClassifyError {
    pub fn invalid_json(detail: impl Into<String>) -> Self {
        ClassifyError::InvalidJsonResponse {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifyError::MalformedLine { .. } => ErrorKind::MalformedLine,
            ClassifyError::InvalidJsonResponse { .. } => ErrorKind::InvalidJsonResponse,
            ClassifyError::MissingSpeakerMapping { .. } => ErrorKind::MissingSpeakerMapping,
            ClassifyError::SpeakerNotFound { .. } => ErrorKind::SpeakerNotFound,
            ClassifyError::UnknownRole { .. } => ErrorKind::UnknownRole,
            ClassifyError::InvalidTargetRoles { .. } => ErrorKind::InvalidTargetRoles,
            ClassifyError::LlmCall(_) => ErrorKind::LlmCall,
        }
    }
}

impl From<LlmError> for ClassifyError {
    fn from(err: LlmError) -> Self {
        match err {
            // An envelope we cannot read is a structural failure, not a transport one
            LlmError::MalformedResponse(detail) => ClassifyError::InvalidJsonResponse { detail },
            other => ClassifyError::LlmCall(other),
        }
    }
}
