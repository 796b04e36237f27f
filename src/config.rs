use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SolaceConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub memory: MemoryConfig,
    pub inference: InferenceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Windowing and summarization policy for the conversation memory manager.
///
/// Process-wide default comes from the config file; each
/// [`MemoryManager`](crate::memory::MemoryManager) may be built with its own copy.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of most recent non-system messages kept verbatim.
    pub recent_window_size: usize,
    /// Newly-aged messages required before the summary is regenerated.
    pub summarize_threshold: usize,
    /// Upper bound (in characters) on stored summary text.
    pub max_summary_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    /// External program used as the inference engine. `None` means only the
    /// local quick summarizer is available.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    /// Temperature used for summarization requests (lower = more literal).
    pub summary_temperature: f32,
}

impl Default for SolaceConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            memory: MemoryConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_solace_dir()
            .join("solace.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recent_window_size: 10,
            summarize_threshold: 6,
            max_summary_length: 500,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            system_prompt: "You are a warm, attentive personal assistant. \
                            Listen carefully and respond with empathy."
                .into(),
            temperature: 0.7,
            max_tokens: 512,
            top_p: 0.9,
            summary_temperature: 0.3,
        }
    }
}

impl MemoryConfig {
    /// Reject configurations that would make windowing meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.recent_window_size < 1 {
            bail!("memory.recent_window_size must be at least 1");
        }
        if self.summarize_threshold < 1 {
            bail!("memory.summarize_threshold must be at least 1");
        }
        if self.max_summary_length < 1 {
            bail!("memory.max_summary_length must be at least 1");
        }
        Ok(())
    }
}

/// Returns `~/.solace/`
pub fn default_solace_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".solace")
}

/// Returns the default config file path: `~/.solace/config.toml`
pub fn default_config_path() -> PathBuf {
    default_solace_dir().join("config.toml")
}

impl SolaceConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: SolaceConfig = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SolaceConfig::default()
        };

        config.apply_env_overrides();
        config.memory.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (SOLACE_DB, SOLACE_LOG_LEVEL, SOLACE_INFERENCE_CMD).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SOLACE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("SOLACE_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("SOLACE_INFERENCE_CMD") {
            self.inference.command = Some(val).filter(|v| !v.is_empty());
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
