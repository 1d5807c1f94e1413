//! Prompt rendering for graph extraction.

use cgraph_core::ExtractionPolicy;

use crate::client::Message;

/// System prompt for `policy`.
#[must_use]
pub fn system_prompt(policy: &ExtractionPolicy) -> String {
    let mut prompt = String::new();
    prompt.push_str(policy.instructions.trim());
    prompt.push_str("\n\n");

    prompt.push_str("1. Identify key entities: ");
    prompt.push_str(&policy.entity_categories.join(", "));
    prompt.push_str(".\n");
    prompt.push_str("2. Identify relationships between them. Focus on these kinds:\n");
    for relation_kind in &policy.relation_kinds {
        prompt.push_str(&format!(
            "   - {}: {}\n",
            relation_kind.kind, relation_kind.description
        ));
    }
    prompt.push_str(
        "3. Every relationship source and target must be the exact name of an extracted entity.\n",
    );
    prompt.push_str("\nOutput must be in strict JSON format.");

    prompt
}

/// User message carrying the section text.
#[must_use]
pub fn user_prompt(text: &str) -> String {
    format!("Extract the graph from this textbook section: {text}")
}

/// The full message list for one extraction call.
#[must_use]
pub fn build_messages(policy: &ExtractionPolicy, text: &str) -> Vec<Message> {
    vec![
        Message::system(system_prompt(policy)),
        Message::user(user_prompt(text)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Role;

    #[test]
    fn test_system_prompt_lists_policy() {
        let prompt = system_prompt(&ExtractionPolicy::default());

        assert!(prompt.starts_with("You are an expert curriculum librarian."));
        assert!(prompt.contains("Scientific concept, Law, Formula, Historical figure"));
        assert!(prompt.contains("- PREREQUISITE_FOR: Concept A is needed to understand concept B"));
        assert!(prompt.contains("- CAUSES: A causes B"));
        assert!(prompt.ends_with("Output must be in strict JSON format."));
    }

    #[test]
    fn test_user_prompt() {
        assert_eq!(
            user_prompt("Photosynthesis produces Glucose."),
            "Extract the graph from this textbook section: Photosynthesis produces Glucose."
        );
    }

    #[test]
    fn test_build_messages_roles() {
        let messages = build_messages(&ExtractionPolicy::default(), "text");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }
}
