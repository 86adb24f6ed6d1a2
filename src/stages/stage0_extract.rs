use tracing::info;

use crate::error::ClassifyError;
use crate::models::{LogEntry, TargetRoles, Transcript};

/// Speaker tags of a transcript, split by whether they still need a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAnalysis {
    /// Every distinct tag, in order of first appearance
    pub all_labels: Vec<String>,
    /// Tags that are not already one of the target roles
    pub non_target_labels: Vec<String>,
}

impl LabelAnalysis {
    pub fn needs_mapping(&self) -> bool {
        !self.non_target_labels.is_empty()
    }
}

/// Distinct speaker tags of raw transcript text, in order of first appearance
pub fn extract_tags(transcript: &str) -> Result<Vec<String>, ClassifyError> {
    Ok(Transcript::parse(transcript)?.speaker_tags())
}

/// Split the transcript's tags into already-labeled and to-be-mapped, and
/// record the result in the log
pub fn analyze_labels(
    transcript: &Transcript,
    roles: &TargetRoles,
    log: &mut Vec<LogEntry>,
) -> LabelAnalysis {
    let all_labels = transcript.speaker_tags();
    let non_target_labels: Vec<String> = all_labels
        .iter()
        .filter(|tag| !roles.contains(tag))
        .cloned()
        .collect();

    info!(
        "Found {} speaker labels ({} need mapping): {:?}",
        all_labels.len(),
        non_target_labels.len(),
        all_labels
    );

    log.push(LogEntry::LabelAnalysis {
        all_labels: all_labels.clone(),
        target_roles: roles.clone(),
        non_target_labels: non_target_labels.clone(),
    });

    LabelAnalysis {
        all_labels,
        non_target_labels,
    }
}
