//! Keyword-based summarizer used when no inference engine is available.

use chrono::Utc;

use crate::session::{ChatMessage, ConversationSummary, Role};

const MAX_TOPICS: usize = 5;
const MAX_EMOTIONS: usize = 4;
/// Topics named in the one-sentence summary.
const NAMED_TOPICS: usize = 3;

const TOPIC_KEYWORDS: &[&str] = &[
    "work",
    "job",
    "family",
    "anxiety",
    "stress",
    "sleep",
    "relationship",
    "school",
    "money",
    "health",
    "friends",
    "future",
];

/// Word stem → emotion name.
const EMOTION_KEYWORDS: &[(&str, &str)] = &[
    ("happy", "happiness"),
    ("sad", "sadness"),
    ("anxious", "anxiety"),
    ("angry", "anger"),
    ("worried", "worry"),
    ("stressed", "stress"),
    ("lonely", "loneliness"),
    ("excited", "excitement"),
    ("frustrated", "frustration"),
    ("scared", "fear"),
    ("grateful", "gratitude"),
    ("hopeful", "hope"),
];

/// Summarize `older` messages without a model.
///
/// Only user-authored messages are scanned. A keyword matches any word that
/// starts with it ("working" counts as "work"). Lists keep first-seen order.
pub fn quick_summary(older: &[&ChatMessage], message_count: usize) -> ConversationSummary {
    let mut topics: Vec<String> = Vec::new();
    let mut emotions: Vec<String> = Vec::new();

    for message in older.iter().filter(|m| m.role == Role::User) {
        let lowered = message.content.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let mentions = |stem: &str| words.iter().any(|w| w.starts_with(stem));

        for &topic in TOPIC_KEYWORDS {
            if topics.len() < MAX_TOPICS && mentions(topic) && !topics.iter().any(|t| t == topic) {
                topics.push(topic.to_string());
            }
        }
        for &(stem, emotion) in EMOTION_KEYWORDS {
            if emotions.len() < MAX_EMOTIONS
                && mentions(stem)
                && !emotions.iter().any(|e| e == emotion)
            {
                emotions.push(emotion.to_string());
            }
        }
    }

    let noun = if message_count == 1 { "message" } else { "messages" };
    let summary = if topics.is_empty() {
        format!("Earlier conversation of {message_count} {noun} covering general check-in topics.")
    } else {
        let named: Vec<&str> = topics.iter().take(NAMED_TOPICS).map(String::as_str).collect();
        format!(
            "Earlier conversation of {message_count} {noun} touching on {}.",
            named.join(", ")
        )
    };

    ConversationSummary {
        summary,
        key_topics: topics,
        emotional_themes: emotions,
        user_mentions: Vec::new(),
        message_count,
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, content: &str) -> ChatMessage {
        ChatMessage::new(role, content)
    }

    #[test]
    fn extracts_topics_and_emotions_from_user_messages() {
        let messages = [
            msg(Role::User, "Working late again, I'm so stressed about my job."),
            msg(Role::Assistant, "That sounds like a lot of family pressure."),
            msg(Role::User, "I can't sleep and I feel anxious about money."),
        ];
        let refs: Vec<&ChatMessage> = messages.iter().collect();
        let summary = quick_summary(&refs, 3);

        assert_eq!(summary.key_topics, vec!["work", "job", "stress", "sleep", "money"]);
        assert_eq!(summary.emotional_themes, vec!["stress", "anxiety"]);
        assert!(!summary.key_topics.contains(&"family".to_string()));
        assert_eq!(
            summary.summary,
            "Earlier conversation of 3 messages touching on work, job, stress."
        );
        assert_eq!(summary.message_count, 3);
        assert!(summary.user_mentions.is_empty());
    }

    #[test]
    fn caps_list_sizes() {
        let messages = [msg(
            Role::User,
            "work family anxiety stress sleep school money health \
             happy sad angry worried lonely excited",
        )];
        let refs: Vec<&ChatMessage> = messages.iter().collect();
        let summary = quick_summary(&refs, 1);
        assert_eq!(summary.key_topics.len(), MAX_TOPICS);
        assert_eq!(summary.emotional_themes.len(), MAX_EMOTIONS);
    }

    #[test]
    fn no_keywords_gives_generic_sentence() {
        let messages = [msg(Role::User, "hello there")];
        let refs: Vec<&ChatMessage> = messages.iter().collect();
        let summary = quick_summary(&refs, 1);
        assert!(summary.key_topics.is_empty());
        assert!(summary.emotional_themes.is_empty());
        assert_eq!(
            summary.summary,
            "Earlier conversation of 1 message covering general check-in topics."
        );

        let summary = quick_summary(&refs, 2);
        assert!(summary.summary.starts_with("Earlier conversation of 2 messages "));
    }

    #[test]
    fn substring_inside_word_does_not_match() {
        let messages = [msg(Role::User, "finished my homework and networking")];
        let refs: Vec<&ChatMessage> = messages.iter().collect();
        assert!(quick_summary(&refs, 1).key_topics.is_empty());
    }

    #[test]
    fn deterministic() {
        let messages = [msg(Role::User, "family and school worries, feeling sad")];
        let refs: Vec<&ChatMessage> = messages.iter().collect();
        let a = quick_summary(&refs, 1);
        let b = quick_summary(&refs, 1);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.key_topics, b.key_topics);
        assert_eq!(a.emotional_themes, b.emotional_themes);
    }
}
