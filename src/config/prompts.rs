//! Prompt templates for Lektor.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    pub summary: SummaryPrompts,
    /// Prompts for transcript punctuation/capitalization restoration.
    pub cleanup: CleanupPrompts,
}


/// Prompts for grounded question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
    /// Canned answer used when retrieval returns nothing.
    pub not_found: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that answers questions about lecture video content.

Guidelines:
- Answer the question using ONLY the numbered sources provided
- Cite the sources you use as [Source N]
- If the sources do not contain the information needed to answer, say so explicitly
- Do not bring in outside knowledge
- Be concise but thorough"#
                .to_string(),

            user: r#"Question: {{question}}

Sources from the video transcript:

{{sources}}

Answer the question using only the sources above. If the information is not present in the sources, state that explicitly."#
                .to_string(),

            not_found: "I couldn't find anything in this video relevant to that question."
                .to_string(),
        }
    }
}

/// Prompts for summary generation, one template per summary type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub system: String,
    pub brief: String,
    pub bullet: String,
    pub detailed: String,
    /// Generic retrieval query used to assemble a representative context.
    pub overview_query: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful education assistant specialized in lecture summarization."
                .to_string(),

            brief: "Provide a concise summary (3-5 core sentences) of the following content:\n\n{{content}}"
                .to_string(),

            bullet: "Extract 5-10 key points as bullet points from the following content:\n\n{{content}}"
                .to_string(),

            detailed: "Provide a comprehensive summary of the following content, covering the main topics, key arguments, and final conclusions:\n\n{{content}}"
                .to_string(),

            overview_query: "Give me an overview of the main topics covered in this video"
                .to_string(),
        }
    }
}

/// Prompts for transcript cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupPrompts {
    pub system: String,
}

impl Default for CleanupPrompts {
    fn default() -> Self {
        Self {
            system: "You are a professional editor. Restore punctuation and capitalization \
                     to the following transcript. Keep the original words exactly as they are."
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, with an optional custom directory overriding defaults.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let cleanup_path = custom_path.join("cleanup.toml");
            if cleanup_path.exists() {
                let content = std::fs::read_to_string(&cleanup_path)?;
                prompts.cleanup = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}
