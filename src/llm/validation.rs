use crate::error::ClassifyError;
use crate::models::{RoleMapping, TargetRoles};

/// Strip a surrounding Markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the model's mapping answer into a tag-to-role map.
///
/// Only checks shape: a JSON object whose values are all strings.
pub fn parse_mapping_response(text: &str) -> Result<RoleMapping, ClassifyError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(ClassifyError::invalid_json("model returned an empty response"));
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ClassifyError::invalid_json(format!("failed to parse mapping JSON: {}", e)))?;

    let object = value.as_object().ok_or_else(|| {
        ClassifyError::invalid_json(format!("expected a JSON object, got: {}", value))
    })?;

    let mut mapping = RoleMapping::new();
    for (tag, role) in object {
        let role = role.as_str().ok_or_else(|| {
            ClassifyError::invalid_json(format!(
                "role for speaker '{}' must be a string, got: {}",
                tag, role
            ))
        })?;
        mapping.insert(tag.trim(), role.trim());
    }

    Ok(mapping)
}

/// Validate a parsed mapping against the transcript.
///
/// Checks run in a fixed order: tags absent from the transcript first, then
/// requested tags left unmapped, then roles outside the target set.
pub fn validate_mapping(
    mapping: &RoleMapping,
    all_tags: &[String],
    requested_tags: &[String],
    roles: &TargetRoles,
) -> Result<(), ClassifyError> {
    let phantom: Vec<String> = mapping
        .iter()
        .filter(|(tag, _)| !all_tags.iter().any(|t| t == tag))
        .map(|(tag, _)| tag.to_string())
        .collect();
    if !phantom.is_empty() {
        return Err(ClassifyError::SpeakerNotFound { tags: phantom });
    }

    let missing: Vec<String> = requested_tags
        .iter()
        .filter(|tag| !mapping.contains_tag(tag))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ClassifyError::MissingSpeakerMapping { missing });
    }

    if let Some((tag, role)) = mapping.iter().find(|(_, role)| !roles.contains(role)) {
        return Err(ClassifyError::UnknownRole {
            tag: tag.to_string(),
            role: role.to_string(),
            allowed: roles.as_slice().to_vec(),
        });
    }

    Ok(())
}
