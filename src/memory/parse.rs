//! Parsing of model-produced summaries.
//!
//! Models are asked for a JSON object but often wrap it in prose or code
//! fences. [`parse_summary_output`] scans for the first fragment that parses
//! against [`SummaryPayload`]; anything else becomes
//! [`ParsedSummary::Unstructured`].

use serde::Deserialize;

/// Fields a model is asked to produce. Accepts camelCase or snake_case keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryPayload {
    pub summary: String,
    #[serde(default, rename = "keyTopics", alias = "key_topics")]
    pub key_topics: Vec<String>,
    #[serde(default, rename = "emotionalThemes", alias = "emotional_themes")]
    pub emotional_themes: Vec<String>,
    #[serde(default, rename = "userMentions", alias = "user_mentions")]
    pub user_mentions: Vec<String>,
}

/// Outcome of parsing raw model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSummary {
    Structured(SummaryPayload),
    /// No usable structured fragment; carries the trimmed raw text.
    Unstructured(String),
}

/// Extract the first well-formed summary object from free-form model text.
pub fn parse_summary_output(raw: &str) -> ParsedSummary {
    for (start, _) in raw.match_indices('{') {
        let mut values =
            serde_json::Deserializer::from_str(&raw[start..]).into_iter::<SummaryPayload>();
        if let Some(Ok(payload)) = values.next() {
            if !payload.summary.trim().is_empty() {
                return ParsedSummary::Structured(payload.normalized());
            }
        }
    }
    ParsedSummary::Unstructured(raw.trim().to_string())
}

impl SummaryPayload {
    fn normalized(self) -> Self {
        Self {
            summary: self.summary.trim().to_string(),
            key_topics: clean_list(self.key_topics),
            emotional_themes: clean_list(self.emotional_themes),
            user_mentions: clean_list(self.user_mentions),
        }
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(raw: &str) -> SummaryPayload {
        match parse_summary_output(raw) {
            ParsedSummary::Structured(p) => p,
            ParsedSummary::Unstructured(t) => panic!("expected structured, got {t:?}"),
        }
    }

    #[test]
    fn bare_json_parses() {
        let p = structured(
            r#"{"summary":"Talked about sleep.","keyTopics":["sleep"],"emotionalThemes":["fatigue"],"userMentions":["night shifts"]}"#,
        );
        assert_eq!(p.summary, "Talked about sleep.");
        assert_eq!(p.key_topics, vec!["sleep"]);
        assert_eq!(p.emotional_themes, vec!["fatigue"]);
        assert_eq!(p.user_mentions, vec!["night shifts"]);
    }

    #[test]
    fn json_wrapped_in_prose_and_fences() {
        let raw = "Sure! Here is the summary:\n```json\n{\"summary\": \"Work stress.\", \"keyTopics\": [\"work\"]}\n```\nLet me know if you need more.";
        let p = structured(raw);
        assert_eq!(p.summary, "Work stress.");
        assert_eq!(p.key_topics, vec!["work"]);
        assert!(p.user_mentions.is_empty());
    }

    #[test]
    fn snake_case_keys_accepted() {
        let p = structured(r#"{"summary":"x","key_topics":["a"],"emotional_themes":["b"],"user_mentions":["c"]}"#);
        assert_eq!(p.key_topics, vec!["a"]);
        assert_eq!(p.emotional_themes, vec!["b"]);
        assert_eq!(p.user_mentions, vec!["c"]);
    }

    #[test]
    fn nested_object_found_after_non_matching_outer() {
        let p = structured(r#"{"result": {"summary": "inner", "keyTopics": []}}"#);
        assert_eq!(p.summary, "inner");
    }

    #[test]
    fn first_valid_fragment_wins() {
        let raw = r#"{broken json} then {"summary": "first"} and {"summary": "second"}"#;
        assert_eq!(structured(raw).summary, "first");
    }

    #[test]
    fn lists_are_trimmed_and_deduplicated() {
        let p = structured(r#"{"summary":"s","keyTopics":[" work ","work","",  "family"]}"#);
        assert_eq!(p.key_topics, vec!["work", "family"]);
    }

    #[test]
    fn prose_only_is_unstructured() {
        assert_eq!(
            parse_summary_output("  The user talked about their week.  "),
            ParsedSummary::Unstructured("The user talked about their week.".into())
        );
    }

    #[test]
    fn blank_summary_field_is_unstructured() {
        assert!(matches!(
            parse_summary_output(r#"{"summary": "   ", "keyTopics": ["x"]}"#),
            ParsedSummary::Unstructured(_)
        ));
    }

    #[test]
    fn wrong_field_types_are_unstructured() {
        assert!(matches!(
            parse_summary_output(r#"{"summary": 42}"#),
            ParsedSummary::Unstructured(_)
        ));
    }
}
