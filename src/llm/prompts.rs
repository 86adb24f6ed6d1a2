use crate::models::TargetRoles;

/// System prompt for the tag-to-role mapping request
pub fn build_mapping_system_prompt(roles: &TargetRoles) -> String {
    format!(
        "You are a conversation transcript analyzer. Always respond with a single valid JSON \
         object mapping speaker labels to these roles: {}. Do not add any other text.",
        roles.describe()
    )
}

/// Build the user prompt asking for a mapping of `tags_to_map` onto `roles`
pub fn build_mapping_prompt(transcript: &str, roles: &TargetRoles, tags_to_map: &[String]) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are analyzing a conversation transcript. Your task is to identify which speaker has which role.\n\n",
    );
    prompt.push_str(&format!("The valid roles are: {}\n\n", roles.describe()));

    prompt.push_str("Here is the transcript:\n\n");
    prompt.push_str(transcript);
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "The following speaker labels need to be mapped to roles: {}\n\n",
        tags_to_map.join(", ")
    ));
    prompt.push_str(
        "Analyze the conversation and determine which speaker label corresponds to which role.\n\n",
    );
    prompt.push_str(&format!(
        "Respond with a JSON object that has exactly one key per speaker label listed above. \
         Use exactly the role names provided: {}\n\n",
        roles.quoted()
    ));

    // Example built from the real labels so the model sees the expected key spelling
    prompt.push_str("Example format:\n{\n");
    let example: Vec<String> = tags_to_map
        .iter()
        .zip(roles.as_slice().iter().cycle())
        .map(|(tag, role)| format!("  \"{}\": \"{}\"", tag, role))
        .collect();
    prompt.push_str(&example.join(",\n"));
    prompt.push_str("\n}");

    prompt
}
