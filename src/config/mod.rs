//! Configuration module for Grunn.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    CacheSettings, EmbeddingSettings, GeneralSettings, OpenAISettings, PromptSettings,
    RagSettings, Settings, SplitterSettings,
};
