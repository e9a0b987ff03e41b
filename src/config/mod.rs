//! Configuration management for Lektor.

mod prompts;
mod settings;

pub use prompts::{CleanupPrompts, Prompts, RagPrompts, SummaryPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings,
    RagSettings, Settings, TranscriptSettings, VectorStoreSettings,
};
