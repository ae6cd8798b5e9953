//! Prompt templates for Grunn.
//!
//! Prompts can be customized by placing a `rag.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for grounded question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// System message sent ahead of every conversation.
    pub system: String,
    /// Question template for uploaded documents.
    pub documents: String,
    /// Question template for video transcripts.
    pub video: String,
    /// Rewrites a follow-up into a standalone question.
    pub condense: String,
    /// Summarizes one chunk of content.
    pub summarize_map: String,
    /// Combines the chunk summaries into one.
    pub summarize_reduce: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a careful assistant that answers questions about content the user has provided. You only use the excerpts given to you and the earlier conversation."#.to_string(),

            documents: r#"The user has uploaded a file. Its content is represented by the excerpts below. Use them to answer the question at the end.

Rules:
- Answer only from the excerpts. If they do not contain the answer, say that you don't know. Do NOT make up an answer.
- If the question is not related to the file, politely explain that you can only answer questions about the uploaded content.
- Be as detailed as the excerpts allow.

Excerpts:
{{context}}
=========
Question: {{question}}"#.to_string(),

            video: r#"The user has provided a video that was transcribed to text. The excerpts below come from that transcript. Use them to answer the question at the end.

Rules:
- Answer only from the transcript excerpts. If they do not contain the answer, say that you don't know. Do NOT make up an answer.
- If the question is unrelated to the video, politely explain that you can only answer questions about this video.
- Be as detailed as the excerpts allow.

Transcript excerpts:
{{context}}
=========
Question: {{question}}"#.to_string(),

            condense: r#"Given the conversation below and a follow-up question, rephrase the follow-up question to be a standalone question. Reply with the question only.

Conversation:
{{chat_history}}

Follow-up question: {{question}}
Standalone question:"#.to_string(),

            summarize_map: r#"Write a concise summary of the following passage. Keep names, numbers and conclusions.

"{{text}}"

CONCISE SUMMARY:"#.to_string(),

            summarize_reduce: r#"The following are summaries of consecutive parts of the same content. Combine them into one concise summary that covers the whole, in order.

{{summaries}}

CONCISE SUMMARY:"#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
