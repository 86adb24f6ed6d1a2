use serde::Deserialize;

use crate::error::ClassifyError;

use super::{CorrectionRecord, FailureReason};

/// Arguments of a `correct_speaker_role` tool call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleCorrection {
    /// Role currently on the utterance (believed wrong)
    pub current_role: String,
    /// First words of the utterance text
    pub utterance_prefix: String,
    /// Role the utterance should carry
    pub correct_role: String,
    #[serde(default, alias = "reason")]
    pub reasoning: Option<String>,
}

impl RoleCorrection {
    /// Read tool-call input. Accepts a JSON object or a string holding one,
    /// since some providers encode arguments as text.
    pub fn from_tool_input(input: &serde_json::Value) -> Result<Self, ClassifyError> {
        let parsed = match input {
            serde_json::Value::String(raw) => serde_json::from_str(raw),
            serde_json::Value::Object(_) => serde_json::from_value(input.clone()),
            other => {
                return Err(ClassifyError::invalid_json(format!(
                    "tool arguments must be an object, got {}",
                    other
                )));
            }
        };

        parsed.map_err(|e| {
            ClassifyError::invalid_json(format!("malformed correct_speaker_role arguments: {}", e))
        })
    }
}

/// A correction attempt that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedCorrection {
    pub record: CorrectionRecord,
    pub reason: FailureReason,
}

/// What happened in a safeguard round, carried into the next prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundFeedback {
    pub applied: Vec<CorrectionRecord>,
    pub unresolved: Vec<UnresolvedCorrection>,
}

impl RoundFeedback {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.unresolved.is_empty()
    }
}
