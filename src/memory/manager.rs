//! Windowing, summarization triggers, and context assembly per session.
//!
//! Offsets below count only non-system messages. The summary covers offsets
//! `[0, summary.message_count)`; everything from `message_count` onward is
//! handed to the model verbatim. Once the summary is current that verbatim
//! tail is exactly the last `recent_window_size` messages; between
//! summarizations it also carries the (fewer than `summarize_threshold`)
//! messages that have aged out of the window but are not summarized yet, so no
//! message is ever dropped from both.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use super::parse::{parse_summary_output, ParsedSummary};
use super::prompt::{
    derive_title, format_context_prompt, format_summary_prompt, truncate_chars,
    SUMMARIZER_SYSTEM_PROMPT,
};
use super::quick::quick_summary;
use crate::config::{InferenceConfig, MemoryConfig, SolaceConfig};
use crate::inference::{
    collect_response, FragmentStream, GenerationConfig, HistoryTurn, InferenceEngine,
};
use crate::session::{
    ChatMessage, ChatSession, ConversationSummary, Role, SessionStore, DEFAULT_TITLE,
};

/// Input rejected before it reaches storage.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message content must not be empty")]
    EmptyContent,
}

/// What the memory manager hands to the inference engine.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    /// Verbatim messages after the summarized range, oldest first.
    pub recent_messages: Vec<ChatMessage>,
    pub summary: Option<ConversationSummary>,
    /// Formatted summary block, empty unless a summary exists and some
    /// history has aged out of the recent window.
    pub context_prompt: String,
}

/// A fully assembled chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub history: Vec<HistoryTurn>,
    pub system_prompt: Option<String>,
}

/// Result of [`MemoryManager::summarize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Not enough new history aged out of the window.
    NotNeeded,
    /// The model's output was applied.
    Model { persisted: bool },
    /// The engine failed or returned nothing; the keyword summarizer was used.
    Fallback { persisted: bool },
}

/// Conversation memory over a [`SessionStore`].
pub struct MemoryManager {
    sessions: Arc<SessionStore>,
    config: MemoryConfig,
    system_prompt: String,
    chat_generation: GenerationConfig,
    summary_generation: GenerationConfig,
}

impl MemoryManager {
    /// Manager with the given memory policy and default inference settings.
    pub fn new(sessions: Arc<SessionStore>, config: MemoryConfig) -> Result<Self> {
        Self::with_inference(sessions, config, &InferenceConfig::default())
    }

    /// Fails if `config` has a zero window, threshold, or summary length.
    pub fn with_inference(
        sessions: Arc<SessionStore>,
        config: MemoryConfig,
        inference: &InferenceConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sessions,
            config,
            system_prompt: inference.system_prompt.clone(),
            chat_generation: GenerationConfig::chat(inference),
            summary_generation: GenerationConfig::summary(inference),
        })
    }

    pub fn from_config(sessions: Arc<SessionStore>, config: &SolaceConfig) -> Result<Self> {
        Self::with_inference(sessions, config.memory, &config.inference)
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Non-system messages older than the recent window.
    fn older_count(&self, session: &ChatSession) -> usize {
        session
            .conversation_len()
            .saturating_sub(self.config.recent_window_size)
    }

    /// Append a message and persist the session.
    ///
    /// The first user message names a session that still carries the default
    /// title. Returns whether the write succeeded; the message is in
    /// `session.messages` either way.
    pub fn add_message(
        &self,
        session: &mut ChatSession,
        role: Role,
        content: &str,
    ) -> Result<bool, ValidationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        let first_user_message =
            role == Role::User && !session.messages.iter().any(|m| m.role == Role::User);
        if first_user_message && session.title == DEFAULT_TITLE {
            session.title = derive_title(content);
        }

        session.messages.push(ChatMessage::new(role, content));
        tracing::debug!(
            session = %session.id,
            role = %role,
            total = session.messages.len(),
            "message added"
        );
        Ok(self.sessions.save_session(session))
    }

    /// True once at least `summarize_threshold` messages have aged out of the
    /// window since the last summary.
    pub fn needs_summary_update(&self, session: &ChatSession) -> bool {
        let older = self.older_count(session);
        if older == 0 {
            return false;
        }
        let unsummarized = older.saturating_sub(session.summarized_count());
        unsummarized >= self.config.summarize_threshold
    }

    pub fn get_memory_context(&self, session: &ChatSession) -> MemoryContext {
        let conversation: Vec<&ChatMessage> = session.conversation().collect();
        let start = session.summarized_count().min(conversation.len());
        let recent_messages = conversation[start..].iter().map(|m| (*m).clone()).collect();

        let context_prompt = match &session.summary {
            Some(summary) if self.older_count(session) > 0 => format_context_prompt(summary),
            _ => String::new(),
        };

        MemoryContext {
            recent_messages,
            summary: session.summary.clone(),
            context_prompt,
        }
    }

    /// Prompt covering only messages aged out since the last summary, anchored
    /// on the previous summary text. `None` when there is nothing new.
    pub fn generate_summary_prompt(&self, session: &ChatSession) -> Option<String> {
        let older = self.older_count(session);
        let summarized = session.summarized_count();
        if older <= summarized {
            return None;
        }

        let conversation: Vec<&ChatMessage> = session.conversation().collect();
        Some(format_summary_prompt(
            session.summary.as_ref(),
            &conversation[summarized..older],
            self.config.max_summary_length,
        ))
    }

    /// Apply raw model output as the new summary and persist.
    ///
    /// Never fails: unparseable output becomes the summary text itself.
    /// Returns whether the write succeeded.
    pub fn update_summary(&self, session: &mut ChatSession, raw_model_output: &str) -> bool {
        let older = self.older_count(session);
        let max = self.config.max_summary_length;

        let summary = match parse_summary_output(raw_model_output) {
            ParsedSummary::Structured(payload) => ConversationSummary {
                summary: truncate_chars(&payload.summary, max),
                key_topics: payload.key_topics,
                emotional_themes: payload.emotional_themes,
                user_mentions: payload.user_mentions,
                message_count: older,
                updated_at: Utc::now(),
            },
            ParsedSummary::Unstructured(text) => {
                tracing::debug!(session = %session.id, "model summary was not structured, using raw text");
                ConversationSummary {
                    summary: truncate_chars(&text, max),
                    key_topics: Vec::new(),
                    emotional_themes: Vec::new(),
                    user_mentions: Vec::new(),
                    message_count: older,
                    updated_at: Utc::now(),
                }
            }
        };

        self.store_summary(session, summary)
    }

    /// Model-free summary of every message older than the recent window.
    pub fn create_quick_summary(&self, session: &ChatSession) -> ConversationSummary {
        let older = self.older_count(session);
        let messages: Vec<&ChatMessage> = session.conversation().take(older).collect();
        quick_summary(&messages, older)
    }

    /// Replace the summary with [`create_quick_summary`](Self::create_quick_summary) and persist.
    pub fn apply_quick_summary(&self, session: &mut ChatSession) -> bool {
        let summary = self.create_quick_summary(session);
        self.store_summary(session, summary)
    }

    fn store_summary(&self, session: &mut ChatSession, summary: ConversationSummary) -> bool {
        tracing::info!(
            session = %session.id,
            message_count = summary.message_count,
            topics = summary.key_topics.len(),
            "summary updated"
        );
        session.summary = Some(summary);
        self.sessions.save_session(session)
    }

    /// Regenerate the summary through `engine` if the trigger fires.
    ///
    /// The session is untouched until the engine's full response is in hand,
    /// so dropping this future leaves it exactly as it was. Engine errors and
    /// empty responses fall back to the keyword summarizer.
    pub async fn summarize(
        &self,
        session: &mut ChatSession,
        engine: &dyn InferenceEngine,
    ) -> SummaryOutcome {
        if !self.needs_summary_update(session) {
            return SummaryOutcome::NotNeeded;
        }
        let Some(prompt) = self.generate_summary_prompt(session) else {
            return SummaryOutcome::NotNeeded;
        };

        let stream = engine.generate(
            vec![HistoryTurn::new(Role::User, prompt)],
            self.summary_generation,
            Some(SUMMARIZER_SYSTEM_PROMPT.to_string()),
        );

        match collect_response(stream).await {
            Ok(text) if !text.trim().is_empty() => SummaryOutcome::Model {
                persisted: self.update_summary(session, &text),
            },
            Ok(_) => {
                tracing::warn!(session = %session.id, "engine returned an empty summary, using quick summary");
                SummaryOutcome::Fallback {
                    persisted: self.apply_quick_summary(session),
                }
            }
            Err(e) => {
                tracing::warn!(session = %session.id, error = %e, "summarization failed, using quick summary");
                SummaryOutcome::Fallback {
                    persisted: self.apply_quick_summary(session),
                }
            }
        }
    }

    /// Build the request for a live chat reply: base system prompt, any
    /// session system messages, and the memory block as the system prompt;
    /// the verbatim tail as history.
    pub fn prepare_chat(&self, session: &ChatSession) -> ChatRequest {
        let context = self.get_memory_context(session);

        let mut sections: Vec<&str> = Vec::new();
        if !self.system_prompt.trim().is_empty() {
            sections.push(&self.system_prompt);
        }
        sections.extend(
            session
                .messages
                .iter()
                .filter(|m| m.role == Role::System)
                .map(|m| m.content.as_str()),
        );
        if !context.context_prompt.is_empty() {
            sections.push(&context.context_prompt);
        }
        let system_prompt = (!sections.is_empty()).then(|| sections.join("\n\n"));

        let history = context
            .recent_messages
            .into_iter()
            .map(|m| HistoryTurn::new(m.role, m.content))
            .collect();

        ChatRequest {
            history,
            system_prompt,
        }
    }

    /// Start a reply to the session; fragments are relayed as the engine produces them.
    pub fn stream_reply(&self, session: &ChatSession, engine: &dyn InferenceEngine) -> FragmentStream {
        let request = self.prepare_chat(session);
        engine.generate(request.history, self.chat_generation, request.system_prompt)
    }
}
