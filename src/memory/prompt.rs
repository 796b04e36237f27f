//! Text built for the model: session titles, the memory context block, and
//! incremental summarization prompts.

use crate::session::{ChatMessage, ConversationSummary};

/// Longest title derived from a first message, before the ellipsis.
pub const TITLE_MAX_CHARS: usize = 50;

/// Instructions sent as the system prompt for summarization requests.
pub const SUMMARIZER_SYSTEM_PROMPT: &str = "You condense conversations into long-term memory. \
Reply with a single JSON object and nothing else.";

const CONTEXT_HEADER: &str = "[Conversation memory]";
const CONTEXT_SEPARATOR: &str = "---";

/// Title from the first user message: whitespace collapsed, cut at a word
/// boundary, `...` appended when shortened.
pub fn derive_title(content: &str) -> String {
    let text = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= TITLE_MAX_CHARS {
        return text;
    }

    let cut: String = text.chars().take(TITLE_MAX_CHARS).collect();
    let at_boundary = text.chars().nth(TITLE_MAX_CHARS) == Some(' ');
    let head = match cut.rfind(' ') {
        Some(i) if i > 0 && !at_boundary => &cut[..i],
        _ => cut.as_str(),
    };
    format!("{head}...")
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Leading context block describing the rolling summary.
pub fn format_context_prompt(summary: &ConversationSummary) -> String {
    let mut block = String::new();
    block.push_str(CONTEXT_HEADER);
    block.push('\n');
    block.push_str("Summary of earlier conversation: ");
    block.push_str(&summary.summary);
    block.push('\n');
    push_list(&mut block, "Key topics", &summary.key_topics);
    push_list(&mut block, "Emotional themes", &summary.emotional_themes);
    push_list(&mut block, "Things the user mentioned", &summary.user_mentions);
    block.push_str(CONTEXT_SEPARATOR);
    block.push('\n');
    block
}

fn push_list(block: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    block.push_str(label);
    block.push_str(": ");
    block.push_str(&items.join(", "));
    block.push('\n');
}

/// Prompt asking the model to fold `increment` into `previous`.
pub fn format_summary_prompt(
    previous: Option<&ConversationSummary>,
    increment: &[&ChatMessage],
    max_summary_length: usize,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Summarize the conversation below for long-term memory. Respond with a JSON object \
         with the fields \"summary\" (string), \"keyTopics\" (array of strings), \
         \"emotionalThemes\" (array of strings) and \"userMentions\" (array of strings: \
         people, places and events the user brought up).",
    );
    prompt.push_str(&format!(
        " Keep \"summary\" under {max_summary_length} characters.\n\n"
    ));

    if let Some(previous) = previous.filter(|p| !p.summary.is_empty()) {
        prompt.push_str("Summary so far (extend it, do not repeat it verbatim):\n");
        prompt.push_str(&previous.summary);
        prompt.push_str("\n\n");
    }

    prompt.push_str("New messages:\n");
    for message in increment {
        prompt.push_str(message.role.as_str());
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use chrono::Utc;

    #[test]
    fn short_title_kept_whole() {
        assert_eq!(derive_title("  Rough   day at work "), "Rough day at work");
    }

    #[test]
    fn long_title_cut_at_word_boundary() {
        let content = "I have been feeling overwhelmed lately with everything going on at home";
        let title = derive_title(content);
        assert_eq!(title, "I have been feeling overwhelmed lately with...");
        assert!(title.chars().count() <= TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn cut_exactly_on_space_keeps_last_word() {
        let base = format!("{}abcde", "abcd ".repeat(9));
        assert_eq!(base.chars().count(), TITLE_MAX_CHARS);
        let content = format!("{base} tail");
        assert_eq!(derive_title(&content), format!("{base}..."));
    }

    #[test]
    fn unbroken_text_is_cut_mid_word() {
        let title = derive_title(&"x".repeat(80));
        assert_eq!(title, format!("{}...", "x".repeat(TITLE_MAX_CHARS)));
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn context_prompt_lists_non_empty_fields() {
        let summary = ConversationSummary {
            summary: "User discussed work stress.".into(),
            key_topics: vec!["work".into(), "sleep".into()],
            emotional_themes: vec![],
            user_mentions: vec!["manager".into()],
            message_count: 4,
            updated_at: Utc::now(),
        };
        let block = format_context_prompt(&summary);
        assert!(block.starts_with("[Conversation memory]\n"));
        assert!(block.contains("Summary of earlier conversation: User discussed work stress."));
        assert!(block.contains("Key topics: work, sleep\n"));
        assert!(!block.contains("Emotional themes"));
        assert!(block.contains("Things the user mentioned: manager\n"));
        assert!(block.ends_with("---\n"));
    }

    #[test]
    fn summary_prompt_includes_previous_and_increment() {
        let previous = ConversationSummary {
            summary: "Earlier: talked about school.".into(),
            key_topics: vec![],
            emotional_themes: vec![],
            user_mentions: vec![],
            message_count: 2,
            updated_at: Utc::now(),
        };
        let a = ChatMessage::new(Role::User, "Exams are next week");
        let b = ChatMessage::new(Role::Assistant, "How are you preparing?");
        let prompt = format_summary_prompt(Some(&previous), &[&a, &b], 300);

        assert!(prompt.contains("Summary so far"));
        assert!(prompt.contains("Earlier: talked about school."));
        assert!(prompt.contains("user: Exams are next week\nassistant: How are you preparing?\n"));
        assert!(prompt.contains("under 300 characters"));

        let fresh = format_summary_prompt(None, &[&a], 300);
        assert!(!fresh.contains("Summary so far"));
    }
}
