//! LLM File Renamer
//!
//! Walks a directory tree and renames every file with a title suggested by an
//! OpenAI compatible chat-completion service.

pub mod config;
pub mod llm;
pub mod renamer;

// Re-export main types for easy access
pub use crate::config::{resolve_credential, Config, ConfigError};
pub use crate::llm::{AskOptions, ChatClient, ChatMessage, LLMError, LLM};
pub use crate::renamer::{
    discover_files, rename_all, rename_one, sanitize_name, BatchSummary, RenameError, RenamePolicy,
    RenamedFile,
};
