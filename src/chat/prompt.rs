//! Prompt composition for the legal assistant.

use crate::models::{ChatMessage, ChatRole, Locale};

/// How many recent messages of history are included in the prompt.
const HISTORY_WINDOW: usize = 12;

/// System instruction framing every assistant call.
pub const SYSTEM_INSTRUCTION: &str = "\
You are a legal assistant for an Omani law firm, helping internal legal teams \
with document analysis and drafting.

Constraints:
1. This is for Internal Team Use Only.
2. When document context is provided below, ground your answer in it.
3. Respond in {language}.
4. Be professional, concise, and legally precise.
5. Always include a subtle disclaimer that you are an AI and human review is required.";

fn language_name(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "English",
        Locale::Ar => "Arabic",
    }
}

/// Build the full prompt from instruction, retrieved context, recent
/// history, and the new question.
pub fn build_prompt(
    question: &str,
    locale: Locale,
    context_snippets: &[String],
    history: &[ChatMessage],
) -> String {
    let mut prompt = SYSTEM_INSTRUCTION.replace("{language}", language_name(locale));

    if !context_snippets.is_empty() {
        prompt.push_str("\n\nRelevant document excerpts:\n");
        for snippet in context_snippets {
            prompt.push_str("- ");
            prompt.push_str(snippet);
            prompt.push('\n');
        }
    }

    let recent = history.len().saturating_sub(HISTORY_WINDOW);
    if history.len() > recent {
        prompt.push_str("\nConversation so far:\n");
        for message in &history[recent..] {
            let speaker = match message.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            prompt.push_str(speaker);
            prompt.push_str(": ");
            prompt.push_str(&message.text);
            prompt.push('\n');
        }
    }

    prompt.push_str("\nUser question: ");
    prompt.push_str(question);
    prompt.push_str("\nAssistant: ");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_language_and_question() {
        let prompt = build_prompt("What is the notice period?", Locale::Ar, &[], &[]);
        assert!(prompt.contains("Respond in Arabic"));
        assert!(prompt.contains("What is the notice period?"));
        assert!(!prompt.contains("{language}"));
    }

    #[test]
    fn test_prompt_includes_context_snippets() {
        let snippets = vec!["Notice period is 30 days per clause 8.".to_string()];
        let prompt = build_prompt("notice period?", Locale::En, &snippets, &[]);
        assert!(prompt.contains("Relevant document excerpts"));
        assert!(prompt.contains("clause 8"));
    }

    #[test]
    fn test_history_window_keeps_recent_messages() {
        let history: Vec<ChatMessage> = (0..30)
            .map(|i| ChatMessage::new(ChatRole::User, format!("message {}", i)))
            .collect();
        let prompt = build_prompt("q", Locale::En, &[], &history);
        assert!(!prompt.contains("message 0"));
        assert!(prompt.contains("message 29"));
    }
}
