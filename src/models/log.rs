use serde::Serialize;

use super::{RoleMapping, TargetRoles};

/// Per-tag summary of a label replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
    pub occurrences: usize,
}

/// One attempted safeguard correction, successful or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionRecord {
    pub attempted_role_from: String,
    pub attempted_role_to: String,
    pub utterance_prefix: String,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Why a correction could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// No line with the given role starts with the prefix
    NotFound,
    /// Several lines satisfy the role and prefix
    Ambiguous { candidates: Vec<usize> },
    /// A role named by the model is not a target role
    UnknownRole { role: String },
    /// Current and correct role are the same
    NoChange,
}

impl FailureReason {
    /// Whether asking the model again could resolve the failure
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureReason::NoChange)
    }

    /// Human-readable explanation, also shown to the model
    pub fn describe(&self) -> String {
        match self {
            FailureReason::NotFound => {
                "no utterance with that role starts with the given prefix".to_string()
            }
            FailureReason::Ambiguous { candidates } => format!(
                "{} utterances match (lines {}); quote more words to pick one",
                candidates.len(),
                candidates
                    .iter()
                    .map(|i| (i + 1).to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            FailureReason::UnknownRole { role } => format!("'{}' is not a valid role", role),
            FailureReason::NoChange => "current and correct role are identical".to_string(),
        }
    }
}

/// A step of the classification decision log.
///
/// Entries are appended in chronological order and serialized with a `step`
/// discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum LogEntry {
    Configuration {
        target_roles: TargetRoles,
        enable_safeguard: bool,
        validate_only: bool,
    },
    LabelAnalysis {
        all_labels: Vec<String>,
        target_roles: TargetRoles,
        non_target_labels: Vec<String>,
    },
    MappingRequest {
        target_roles: TargetRoles,
        labels_to_map: Vec<String>,
    },
    MappingDecision {
        mapping: RoleMapping,
    },
    LabelReplacement {
        lines_rewritten: usize,
        replacements: Vec<Replacement>,
    },
    SafeguardStart {
        target_roles: TargetRoles,
        max_iterations: usize,
    },
    SafeguardIteration {
        iteration: usize,
        tool_calls: usize,
    },
    UtteranceCorrected {
        iteration: usize,
        #[serde(flatten)]
        record: CorrectionRecord,
        old_line: String,
        new_line: String,
    },
    UtteranceCorrectionFailed {
        iteration: usize,
        #[serde(flatten)]
        record: CorrectionRecord,
        reason: FailureReason,
    },
    /// Corrections applied before the abort are not part of the output and
    /// are listed in `discarded_corrections`.
    SafeguardAborted {
        error: String,
        discarded_corrections: Vec<CorrectionRecord>,
    },
    SafeguardEnd {
        corrections_made: Vec<CorrectionRecord>,
        total_corrections: usize,
        iterations: usize,
        converged: bool,
    },
}

impl LogEntry {
    /// The `step` discriminator as serialized
    pub fn step(&self) -> &'static str {
        match self {
            LogEntry::Configuration { .. } => "configuration",
            LogEntry::LabelAnalysis { .. } => "label_analysis",
            LogEntry::MappingRequest { .. } => "mapping_request",
            LogEntry::MappingDecision { .. } => "mapping_decision",
            LogEntry::LabelReplacement { .. } => "label_replacement",
            LogEntry::SafeguardStart { .. } => "safeguard_start",
            LogEntry::SafeguardIteration { .. } => "safeguard_iteration",
            LogEntry::UtteranceCorrected { .. } => "utterance_corrected",
            LogEntry::UtteranceCorrectionFailed { .. } => "utterance_correction_failed",
            LogEntry::SafeguardAborted { .. } => "safeguard_aborted",
            LogEntry::SafeguardEnd { .. } => "safeguard_end",
        }
    }
}
