//! Conversation memory: a verbatim recent window plus a rolling summary.
//!
//! [`MemoryManager`] decides when a session's older history should be
//! re-summarized, builds the incremental summarization prompt, repairs
//! model output into a [`ConversationSummary`](crate::session::ConversationSummary),
//! and falls back to a keyword summarizer when no model is available.

pub mod manager;
pub mod parse;
pub mod prompt;
pub mod quick;

pub use manager::{ChatRequest, MemoryContext, MemoryManager, SummaryOutcome, ValidationError};
pub use parse::{parse_summary_output, ParsedSummary, SummaryPayload};
