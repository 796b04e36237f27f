pub mod store;
pub mod types;

pub use store::SessionStore;
pub use types::{ChatMessage, ChatSession, ConversationSummary, Role, DEFAULT_TITLE};
