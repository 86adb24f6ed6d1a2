use tracing::{debug, info, warn};

use crate::error::ClassifyError;
use crate::llm::{
    build_safeguard_prompt, build_safeguard_system_prompt, correct_speaker_role_tool,
    CompletionRequest, LlmClient, CORRECT_SPEAKER_ROLE_TOOL,
};
use crate::models::{
    CorrectionRecord, FailureReason, LogEntry, RoleCorrection, RoundFeedback, TargetRoles,
    Transcript, UnresolvedCorrection,
};

/// Default bound on safeguard rounds
pub const MAX_ITERATIONS: usize = 3;

/// Configuration for the safeguard corrector
#[derive(Debug, Clone)]
pub struct SafeguardConfig {
    /// Maximum number of LLM rounds
    pub max_iterations: usize,
    /// Number of prefix words considered when locating an utterance
    pub max_prefix_words: usize,
}

impl Default for SafeguardConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            max_prefix_words: 10,
        }
    }
}

/// Result of a safeguard run
#[derive(Debug, Clone)]
pub struct SafeguardResult {
    /// Transcript after all applied corrections
    pub transcript: Transcript,
    /// Successful corrections, in the order they were applied
    pub corrections: Vec<CorrectionRecord>,
    /// Every attempted correction, successful or not
    pub attempts: Vec<CorrectionRecord>,
    /// Rounds actually executed
    pub iterations: usize,
    /// Whether the model reported no further corrections
    pub converged: bool,
}

/// Outcome of locating an utterance by role and text prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixMatch {
    Unique(usize),
    NotFound,
    Ambiguous(Vec<usize>),
}

/// Outcome of one round that did not fail fatally
#[derive(Debug)]
enum RoundOutcome {
    /// The model made no tool calls
    Converged,
    /// Tool calls were processed; `retry` tells whether another round is useful
    Processed { feedback: RoundFeedback, retry: bool },
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the single utterance labeled `role` whose text starts with `prefix`.
///
/// Both sides are lowercased and whitespace-collapsed, and the prefix is cut
/// to its first `max_words` words. The comparison is character-wise, so a
/// cut-off last word still matches (`"ok"` finds `"okay, thanks"`).
/// Punctuation must match. An empty prefix matches nothing.
pub fn locate_utterance(
    transcript: &Transcript,
    role: &str,
    prefix: &str,
    max_words: usize,
) -> PrefixMatch {
    let prefix = prefix
        .split_whitespace()
        .take(max_words)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    if prefix.is_empty() {
        return PrefixMatch::NotFound;
    }

    let candidates: Vec<usize> = transcript
        .utterances()
        .filter(|u| u.tag == role)
        .filter(|u| normalize(&u.text).starts_with(&prefix))
        .map(|u| u.line_index)
        .collect();

    match candidates.len() {
        0 => PrefixMatch::NotFound,
        1 => PrefixMatch::Unique(candidates[0]),
        _ => PrefixMatch::Ambiguous(candidates),
    }
}

/// Run the tool-driven correction loop over an already labeled transcript.
///
/// Content mismatches (unknown prefix, ambiguous match, invalid role) are
/// logged and fed back to the model. Malformed tool calls and LLM failures
/// end the run with an error; no `safeguard_end` entry is written then.
pub async fn run_safeguard(
    client: &dyn LlmClient,
    transcript: Transcript,
    roles: &TargetRoles,
    config: &SafeguardConfig,
    log: &mut Vec<LogEntry>,
) -> Result<SafeguardResult, ClassifyError> {
    log.push(LogEntry::SafeguardStart {
        target_roles: roles.clone(),
        max_iterations: config.max_iterations,
    });
    info!(
        "Safeguard: validating {} lines (max {} rounds)",
        transcript.line_count(),
        config.max_iterations
    );

    let mut current = transcript;
    let mut feedback = RoundFeedback::default();
    let mut corrections = Vec::new();
    let mut attempts = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        match run_round(client, &mut current, roles, config, &feedback, iterations, log).await? {
            RoundOutcome::Converged => {
                info!("Safeguard round {}: no corrections requested", iterations);
                converged = true;
                break;
            }
            RoundOutcome::Processed {
                feedback: round,
                retry,
            } => {
                info!(
                    "Safeguard round {}: {} applied, {} unresolved",
                    iterations,
                    round.applied.len(),
                    round.unresolved.len()
                );
                corrections.extend(round.applied.iter().cloned());
                attempts.extend(round.applied.iter().cloned());
                attempts.extend(round.unresolved.iter().map(|u| u.record.clone()));
                feedback = round;
                if !retry {
                    break;
                }
            }
        }
    }

    if !converged && iterations >= config.max_iterations {
        warn!("Safeguard stopped after reaching {} rounds", config.max_iterations);
    }

    log.push(LogEntry::SafeguardEnd {
        corrections_made: corrections.clone(),
        total_corrections: corrections.len(),
        iterations,
        converged,
    });

    Ok(SafeguardResult {
        transcript: current,
        corrections,
        attempts,
        iterations,
        converged,
    })
}

async fn run_round(
    client: &dyn LlmClient,
    current: &mut Transcript,
    roles: &TargetRoles,
    config: &SafeguardConfig,
    feedback: &RoundFeedback,
    iteration: usize,
    log: &mut Vec<LogEntry>,
) -> Result<RoundOutcome, ClassifyError> {
    let request = CompletionRequest::with_tool(
        build_safeguard_system_prompt(roles),
        build_safeguard_prompt(&current.render(), roles, feedback, config.max_prefix_words),
        correct_speaker_role_tool(roles),
    );
    let response = client.complete(&request).await?;

    log.push(LogEntry::SafeguardIteration {
        iteration,
        tool_calls: response.tool_calls.len(),
    });

    if response.tool_calls.is_empty() {
        debug!("Safeguard model reply: {}", response.text);
        return Ok(RoundOutcome::Converged);
    }

    // Parse every call before touching the transcript so a malformed call
    // leaves this round without partial edits
    let requested = response
        .tool_calls
        .iter()
        .map(|call| {
            if call.name != CORRECT_SPEAKER_ROLE_TOOL {
                return Err(ClassifyError::invalid_json(format!(
                    "model called unknown tool '{}'",
                    call.name
                )));
            }
            RoleCorrection::from_tool_input(&call.input)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut round = RoundFeedback::default();
    for correction in requested {
        apply_correction(current, correction, roles, config, iteration, log, &mut round);
    }

    let retry = !round.applied.is_empty() || round.unresolved.iter().any(|u| u.reason.is_retryable());

    Ok(RoundOutcome::Processed {
        feedback: round,
        retry,
    })
}

fn apply_correction(
    current: &mut Transcript,
    correction: RoleCorrection,
    roles: &TargetRoles,
    config: &SafeguardConfig,
    iteration: usize,
    log: &mut Vec<LogEntry>,
    round: &mut RoundFeedback,
) {
    let mut record = CorrectionRecord {
        attempted_role_from: correction.current_role,
        attempted_role_to: correction.correct_role,
        utterance_prefix: correction.utterance_prefix,
        matched: false,
        line_index: None,
        reasoning: correction.reasoning,
    };

    let reason = if !roles.contains(&record.attempted_role_from) {
        FailureReason::UnknownRole {
            role: record.attempted_role_from.clone(),
        }
    } else if !roles.contains(&record.attempted_role_to) {
        FailureReason::UnknownRole {
            role: record.attempted_role_to.clone(),
        }
    } else if record.attempted_role_from == record.attempted_role_to {
        FailureReason::NoChange
    } else {
        match locate_utterance(
            current,
            &record.attempted_role_from,
            &record.utterance_prefix,
            config.max_prefix_words,
        ) {
            PrefixMatch::Unique(line_index) => {
                let old_line = current
                    .utterance(line_index)
                    .map(|u| u.render())
                    .unwrap_or_default();
                current.set_tag(line_index, &record.attempted_role_to);
                let new_line = current
                    .utterance(line_index)
                    .map(|u| u.render())
                    .unwrap_or_default();

                record.matched = true;
                record.line_index = Some(line_index);
                info!(
                    "Corrected line {}: {} -> {}",
                    line_index + 1,
                    record.attempted_role_from,
                    record.attempted_role_to
                );

                log.push(LogEntry::UtteranceCorrected {
                    iteration,
                    record: record.clone(),
                    old_line,
                    new_line,
                });
                round.applied.push(record);
                return;
            }
            PrefixMatch::NotFound => FailureReason::NotFound,
            PrefixMatch::Ambiguous(candidates) => FailureReason::Ambiguous { candidates },
        }
    };

    warn!(
        "Could not apply correction {} -> {} for prefix {:?}: {}",
        record.attempted_role_from,
        record.attempted_role_to,
        record.utterance_prefix,
        reason.describe()
    );
    log.push(LogEntry::UtteranceCorrectionFailed {
        iteration,
        record: record.clone(),
        reason: reason.clone(),
    });
    round.unresolved.push(UnresolvedCorrection { record, reason });
}
