use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::error::ClassifyError;
use crate::llm::LlmClient;
use crate::models::{LogEntry, TargetRoles, Transcript};
use crate::stages::{analyze_labels, apply_mapping, request_mapping, run_safeguard, SafeguardConfig};

/// Configuration for one classification run
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Roles utterances are labeled with
    pub target_roles: TargetRoles,
    /// Run the tool-calling safeguard after mapping
    pub enable_safeguard: bool,
    /// Skip the mapping request; only validate existing role labels
    pub validate_only: bool,
    /// Safeguard configuration
    pub safeguard: SafeguardConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            target_roles: TargetRoles::default(),
            enable_safeguard: false,
            validate_only: false,
            safeguard: SafeguardConfig::default(),
        }
    }
}

/// Labeled transcript plus the decision log that produced it
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub transcript: String,
    pub log: Vec<LogEntry>,
}

/// Label the speakers of `transcript` with the configured target roles.
///
/// Mapping failures abort the run with no partial output. A structurally
/// invalid safeguard reply aborts only the safeguard: the mapped transcript
/// is returned and the abort entry lists any corrections that were dropped.
pub async fn classify_speakers(
    client: &dyn LlmClient,
    transcript: &str,
    config: &ClassifierConfig,
) -> Result<ClassificationResult, ClassifyError> {
    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("classify", %run_id);

    async move {
        let roles = &config.target_roles;
        let mut log = vec![LogEntry::Configuration {
            target_roles: roles.clone(),
            enable_safeguard: config.enable_safeguard,
            validate_only: config.validate_only,
        }];

        let parsed = Transcript::parse(transcript)?;
        info!(
            "Classifying {} lines into roles {}",
            parsed.line_count(),
            roles.describe()
        );
        let analysis = analyze_labels(&parsed, roles, &mut log);

        let labeled = if config.validate_only {
            info!("Validate-only mode, skipping mapping request");
            parsed
        } else {
            let mapping = request_mapping(client, &parsed, &analysis, roles, &mut log).await?;
            apply_mapping(&parsed, &mapping, &mut log)
        };

        let output = if config.enable_safeguard {
            let safeguard_from = log.len();
            match run_safeguard(client, labeled.clone(), roles, &config.safeguard, &mut log).await {
                Ok(result) => result.transcript,
                Err(err @ ClassifyError::InvalidJsonResponse { .. }) => {
                    let discarded_corrections: Vec<_> = log[safeguard_from..]
                        .iter()
                        .filter_map(|entry| match entry {
                            LogEntry::UtteranceCorrected { record, .. } => Some(record.clone()),
                            _ => None,
                        })
                        .collect();
                    warn!(
                        "Safeguard aborted, discarding {} corrections: {}",
                        discarded_corrections.len(),
                        err
                    );
                    log.push(LogEntry::SafeguardAborted {
                        error: err.to_string(),
                        discarded_corrections,
                    });
                    labeled
                }
                Err(err) => return Err(err),
            }
        } else {
            labeled
        };

        Ok::<_, ClassifyError>(ClassificationResult {
            transcript: output.render(),
            log,
        })
    }
    .instrument(span)
    .await
}
