//! Encrypted session persistence and conversation memory for a personal assistant.
//!
//! Every user's records live in named collections (users, settings, journals,
//! chats, analysis, assessments). All but `users` are sealed with AES-256-GCM
//! under a key derived from the user's passphrase and a per-user salt. On top
//! of the chats collection, a conversation-memory manager keeps a bounded
//! window of verbatim messages plus a rolling summary, so the model always
//! receives bounded context regardless of conversation length.
//!
//! | Layer | Responsibility |
//! |-------|----------------|
//! | [`crypto`] | PBKDF2 key derivation, authenticated record codec |
//! | [`store`] | Per-collection save/get/remove/list with transparent encryption |
//! | [`session`] | Chat session types and CRUD |
//! | [`memory`] | Windowing, summarization triggers, prompts, summary repair |
//! | [`inference`] | Seam to the external text-generation engine |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks

pub mod config;
pub mod crypto;
pub mod db;
pub mod inference;
pub mod memory;
pub mod session;
pub mod store;
