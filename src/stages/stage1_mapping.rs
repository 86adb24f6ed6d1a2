use tracing::{debug, info, warn};

use crate::error::ClassifyError;
use crate::llm::{
    build_mapping_prompt, build_mapping_system_prompt, parse_mapping_response, validate_mapping,
    CompletionRequest, LlmClient,
};
use crate::models::{LogEntry, Replacement, RoleMapping, TargetRoles, Transcript, TranscriptLine};

use super::LabelAnalysis;

/// Ask the model to assign a role to every tag that is not already a role.
///
/// Tags that already equal a target role map to themselves and are not sent.
/// Model entries for them are ignored. When nothing needs mapping no request
/// is made. The returned mapping is
/// total over `analysis.all_labels` and only uses target roles.
pub async fn request_mapping(
    client: &dyn LlmClient,
    transcript: &Transcript,
    analysis: &LabelAnalysis,
    roles: &TargetRoles,
    log: &mut Vec<LogEntry>,
) -> Result<RoleMapping, ClassifyError> {
    let mut mapping: RoleMapping = analysis
        .all_labels
        .iter()
        .filter(|tag| roles.contains(tag))
        .map(|tag| (tag.clone(), tag.clone()))
        .collect();

    if !analysis.needs_mapping() {
        info!("All speaker labels are already target roles, skipping mapping request");
        return Ok(mapping);
    }

    log.push(LogEntry::MappingRequest {
        target_roles: roles.clone(),
        labels_to_map: analysis.non_target_labels.clone(),
    });

    let system = build_mapping_system_prompt(roles);
    let prompt = build_mapping_prompt(&transcript.render(), roles, &analysis.non_target_labels);
    debug!("Mapping prompt is {} characters", prompt.len());

    let response = client.complete(&CompletionRequest::text(system, prompt)).await?;

    let proposed = parse_mapping_response(&response.text)?;
    validate_mapping(
        &proposed,
        &analysis.all_labels,
        &analysis.non_target_labels,
        roles,
    )?;

    // Tags that are already roles keep their identity entry
    for (tag, role) in proposed.iter() {
        if !analysis.non_target_labels.iter().any(|t| t == tag) {
            warn!("Ignoring model mapping for already labeled tag {} -> {}", tag, role);
            continue;
        }
        mapping.insert(tag, role);
    }

    info!("Mapping decision: {:?}", mapping);
    log.push(LogEntry::MappingDecision {
        mapping: mapping.clone(),
    });

    Ok(mapping)
}

/// Rewrite the tag of every utterance according to `mapping`.
///
/// Only tags change: text, separators, blank lines and the line count are
/// preserved. Tags without an entry are left as they are.
pub fn apply_mapping(
    transcript: &Transcript,
    mapping: &RoleMapping,
    log: &mut Vec<LogEntry>,
) -> Transcript {
    let mut result = transcript.clone();
    let mut replacements: Vec<Replacement> = Vec::new();
    let mut lines_rewritten = 0;

    for line in transcript.lines() {
        let TranscriptLine::Utterance(utterance) = line else {
            continue;
        };
        let Some(role) = mapping.get(&utterance.tag) else {
            continue;
        };
        if role == utterance.tag {
            continue;
        }

        result.set_tag(utterance.line_index, role);
        lines_rewritten += 1;

        match replacements.iter_mut().find(|r| r.from == utterance.tag) {
            Some(replacement) => replacement.occurrences += 1,
            None => replacements.push(Replacement {
                from: utterance.tag.clone(),
                to: role.to_string(),
                occurrences: 1,
            }),
        }
    }

    info!(
        "Rewrote {} of {} lines ({} labels replaced)",
        lines_rewritten,
        transcript.line_count(),
        replacements.len()
    );

    log.push(LogEntry::LabelReplacement {
        lines_rewritten,
        replacements,
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::ScriptedClient;
    use crate::stages::analyze_labels;

    async fn map(
        text: &str,
        response: &str,
    ) -> (Result<RoleMapping, ClassifyError>, Vec<LogEntry>, ScriptedClient) {
        let client = ScriptedClient::text(response);
        let transcript = Transcript::parse(text).unwrap();
        let roles = TargetRoles::default();
        let mut log = Vec::new();
        let analysis = analyze_labels(&transcript, &roles, &mut log);
        let result = request_mapping(&client, &transcript, &analysis, &roles, &mut log).await;
        (result, log, client)
    }

    #[tokio::test]
    async fn test_two_speaker_mapping() {
        let (result, log, client) = map(
            "Speaker 0: Hello\nSpeaker 1: Hi",
            r#"{"Speaker 0":"Agent","Speaker 1":"Customer"}"#,
        )
        .await;

        let mapping = result.unwrap();
        assert_eq!(mapping.get("Speaker 0"), Some("Agent"));
        assert_eq!(mapping.get("Speaker 1"), Some("Customer"));
        assert_eq!(client.request_count(), 1);

        let steps: Vec<_> = log.iter().map(LogEntry::step).collect();
        assert_eq!(
            steps,
            vec!["label_analysis", "mapping_request", "mapping_decision"]
        );
    }

    #[tokio::test]
    async fn test_three_tags_two_roles_model_maps_two() {
        let (result, _, _) = map(
            "Speaker 0: Hello\nSpeaker 1: Hi\nSpeaker 2: Hey there",
            r#"{"Speaker 0":"Agent","Speaker 1":"Customer"}"#,
        )
        .await;

        match result {
            Err(ClassifyError::MissingSpeakerMapping { missing }) => {
                assert_eq!(missing, vec!["Speaker 2"])
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_phantom_speaker() {
        let (result, log, _) = map(
            "Speaker 0: Hello\nSpeaker 1: Hi",
            r#"{"Speaker 0":"Agent","Speaker 9":"Customer"}"#,
        )
        .await;

        assert!(matches!(result, Err(ClassifyError::SpeakerNotFound { .. })));
        assert!(log.iter().all(|e| e.step() != "mapping_decision"));
    }

    #[tokio::test]
    async fn test_unparseable_response() {
        let (result, _, _) = map("Speaker 0: Hello\nSpeaker 1: Hi", "{not json").await;
        assert!(matches!(result, Err(ClassifyError::InvalidJsonResponse { .. })));
    }

    #[tokio::test]
    async fn test_only_non_target_labels_are_requested() {
        let (result, _, client) = map(
            "Agent: Hello\nUnknown: Hi, my order is late",
            r#"{"Unknown":"Customer"}"#,
        )
        .await;

        let mapping = result.unwrap();
        assert_eq!(mapping.get("Agent"), Some("Agent"));
        assert_eq!(mapping.get("Unknown"), Some("Customer"));

        let prompt = &client.requests()[0].user;
        assert!(prompt.contains("need to be mapped to roles: Unknown\n"));
    }

    #[tokio::test]
    async fn test_model_cannot_relabel_existing_roles() {
        let (result, _, _) = map(
            "Agent: Hello, how can I help?\nUnknown: My order is late",
            r#"{"Unknown":"Customer","Agent":"Customer"}"#,
        )
        .await;

        let mapping = result.unwrap();
        assert_eq!(mapping.get("Agent"), Some("Agent"));
        assert_eq!(mapping.get("Unknown"), Some("Customer"));

        let transcript = Transcript::parse("Agent: Hello, how can I help?\nUnknown: My order is late").unwrap();
        let labeled = apply_mapping(&transcript, &mapping, &mut Vec::new());
        assert_eq!(
            labeled.render(),
            "Agent: Hello, how can I help?\nCustomer: My order is late"
        );
    }

    #[tokio::test]
    async fn test_labeled_transcript_skips_request() {
        let (result, log, client) = map("Agent: Hello\nCustomer: Hi", "unused").await;

        assert_eq!(result.unwrap().len(), 2);
        assert_eq!(client.request_count(), 0);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_apply_mapping_all_occurrences() {
        let transcript = Transcript::parse(
            "Speaker 0: Hello, thanks for calling.\nSpeaker 1: Hi.\nSpeaker 0: How can I help?",
        )
        .unwrap();
        let mapping: RoleMapping = [("Speaker 0", "Agent"), ("Speaker 1", "Customer")]
            .into_iter()
            .collect();
        let mut log = Vec::new();

        let result = apply_mapping(&transcript, &mapping, &mut log);

        assert_eq!(
            result.render(),
            "Agent: Hello, thanks for calling.\nCustomer: Hi.\nAgent: How can I help?"
        );
        assert_eq!(
            serde_json::to_string(&log[0]).unwrap(),
            concat!(
                r#"{"step":"label_replacement","lines_rewritten":3,"replacements":["#,
                r#"{"from":"Speaker 0","to":"Agent","occurrences":2},"#,
                r#"{"from":"Speaker 1","to":"Customer","occurrences":1}]}"#
            )
        );
    }

    #[test]
    fn test_apply_mapping_preserves_lines_and_text() {
        let text = "Speaker 0:   indented  text \n\n  Speaker 1 :Speaker 0: quoted tag\nSpeaker 10: ten\n";
        let transcript = Transcript::parse(text).unwrap();
        let mapping: RoleMapping = [
            ("Speaker 0", "Agent"),
            ("Speaker 1", "Customer"),
            ("Speaker 10", "Customer"),
        ]
        .into_iter()
        .collect();

        let result = apply_mapping(&transcript, &mapping, &mut Vec::new());
        let rendered = result.render();

        assert_eq!(rendered.split('\n').count(), text.split('\n').count());
        for (before, after) in text.split('\n').zip(rendered.split('\n')) {
            let tail = |s: &str| s.split_once(':').map(|(_, rest)| rest.to_string());
            assert_eq!(tail(before), tail(after));
        }
        assert_eq!(
            rendered,
            "Agent:   indented  text \n\n  Customer :Speaker 0: quoted tag\nCustomer: ten\n"
        );
    }
}
