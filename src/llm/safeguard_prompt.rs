use crate::llm::ToolDefinition;
use crate::models::{RoundFeedback, TargetRoles};

/// Name of the single tool offered to the safeguard model
pub const CORRECT_SPEAKER_ROLE_TOOL: &str = "correct_speaker_role";

/// Build the system prompt for safeguard validation
pub fn build_safeguard_system_prompt(roles: &TargetRoles) -> String {
    format!(
        "You are a conversation analyst validating speaker role classifications. \
         The valid roles are: {}. Use the {} tool once per misclassified utterance. \
         If every utterance is labeled correctly, answer without calling the tool.",
        roles.describe(),
        CORRECT_SPEAKER_ROLE_TOOL
    )
}

/// Build the user prompt for one safeguard round.
///
/// `feedback` describes the previous round; it is empty on the first round.
pub fn build_safeguard_prompt(
    transcript: &str,
    roles: &TargetRoles,
    feedback: &RoundFeedback,
    max_prefix_words: usize,
) -> String {
    let mut prompt = String::new();

    if feedback.is_empty() {
        prompt.push_str(&format!(
            "You are validating speaker role classifications in a conversation transcript. The valid roles are: {}\n\n",
            roles.describe()
        ));
        prompt.push_str("Here is the classified transcript:\n\n");
    } else {
        prompt.push_str("Here is the updated transcript after the previous round:\n\n");
    }
    prompt.push_str(transcript);
    prompt.push_str("\n\n");

    if !feedback.applied.is_empty() {
        prompt.push_str("## Corrections applied in the previous round\n");
        for record in &feedback.applied {
            prompt.push_str(&format!(
                "- \"{}\": {} -> {}\n",
                record.utterance_prefix, record.attempted_role_from, record.attempted_role_to
            ));
        }
        prompt.push('\n');
    }

    if !feedback.unresolved.is_empty() {
        prompt.push_str("## Corrections that could not be applied\n");
        for unresolved in &feedback.unresolved {
            prompt.push_str(&format!(
                "- role {} with prefix \"{}\" (wanted {}): {}\n",
                unresolved.record.attempted_role_from,
                unresolved.record.utterance_prefix,
                unresolved.record.attempted_role_to,
                unresolved.reason.describe()
            ));
        }
        prompt.push_str(
            "If these utterances are still misclassified, call the tool again with the exact current role and a more precise prefix.\n\n",
        );
    }

    prompt.push_str("## Instructions\n");
    prompt.push_str("Look for utterances that seem misclassified based on:\n");
    prompt.push_str("- The content of what they're saying\n");
    prompt.push_str("- The conversational context and flow\n");
    prompt.push_str("- Typical patterns (e.g., agents greet customers, customers describe problems)\n\n");
    prompt.push_str(&format!(
        "For each misclassified utterance call {} with its current (wrong) role, the first {} words of its text copied exactly, the correct role, and your reasoning.\n",
        CORRECT_SPEAKER_ROLE_TOOL, max_prefix_words
    ));
    prompt.push_str("If everything looks correct, respond that the classification is accurate and do not call the tool.\n");

    prompt
}

/// Tool definition for `correct_speaker_role`
pub fn correct_speaker_role_tool(roles: &TargetRoles) -> ToolDefinition {
    let allowed = roles.as_slice().join(", ");

    ToolDefinition {
        name: CORRECT_SPEAKER_ROLE_TOOL.to_string(),
        description: "Correct a single misclassified utterance by giving its current (wrong) role \
                      and the beginning of its text."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "current_role": {
                    "type": "string",
                    "enum": roles.as_slice(),
                    "description": format!("The current (incorrect) role label on the utterance. One of: {}", allowed)
                },
                "utterance_prefix": {
                    "type": "string",
                    "description": "The first 5-10 words of the utterance text after the role label, copied exactly"
                },
                "correct_role": {
                    "type": "string",
                    "enum": roles.as_slice(),
                    "description": format!("The role this utterance should have. One of: {}", allowed)
                },
                "reasoning": {
                    "type": "string",
                    "description": "Brief explanation of why this utterance is misclassified"
                }
            },
            "required": ["current_role", "utterance_prefix", "correct_role", "reasoning"]
        }),
    }
}
