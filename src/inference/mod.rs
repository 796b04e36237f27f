//! Boundary to the language-model inference engine.
//!
//! The engine itself lives outside this crate. [`InferenceEngine`] is the seam:
//! given an ordered history it produces a lazy, finite, non-restartable stream
//! of text fragments. [`CommandEngine`] adapts any local program that reads a
//! prompt on stdin and writes its completion to stdout.

pub mod command;

pub use command::CommandEngine;

use anyhow::Result;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::InferenceConfig;
use crate::session::Role;

/// Lazy sequence of response fragments.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// One entry of the conversation history handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Sampling parameters for a single generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl GenerationConfig {
    /// Parameters for live chat replies.
    pub fn chat(config: &InferenceConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        }
    }

    /// Parameters for summarization requests.
    pub fn summary(config: &InferenceConfig) -> Self {
        Self {
            temperature: config.summary_temperature,
            ..Self::chat(config)
        }
    }
}

/// A text-generation backend.
pub trait InferenceEngine: Send + Sync {
    /// Start generating a reply to `history`. Nothing runs until the stream is polled;
    /// dropping the stream abandons the generation.
    fn generate(
        &self,
        history: Vec<HistoryTurn>,
        config: GenerationConfig,
        system_prompt: Option<String>,
    ) -> FragmentStream;
}

/// Drain a fragment stream into the full response text.
pub async fn collect_response(mut stream: FragmentStream) -> Result<String> {
    let mut response = String::new();
    while let Some(fragment) = stream.next().await {
        response.push_str(&fragment?);
    }
    Ok(response)
}

/// Flatten a history into a plain-text transcript ending with an open assistant turn.
pub fn render_prompt(history: &[HistoryTurn], system_prompt: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        prompt.push_str("system: ");
        prompt.push_str(system);
        prompt.push_str("\n\n");
    }
    for turn in history {
        prompt.push_str(turn.role.as_str());
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
        prompt.push('\n');
    }
    prompt.push_str("assistant:");
    prompt
}
