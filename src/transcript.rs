//! Uniform transcript representation of a chat turn.
//!
//! Tool activity produces heterogeneous output (text, structured JSON, image
//! payloads). The transcript normalizes all of it into flat entries with
//! metadata a presentation layer can group and fold: an entry may reference a
//! parent entry, carry a title, and move from pending to done as the dispatch
//! progresses.

use crate::llm::models::MessageRole;
use serde::{Deserialize, Serialize};

/// Lifecycle of a tool-call entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Done,
}

/// Presentation metadata attached to a transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
}

/// One entry in the rendered transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntryMetadata>,
}

impl TranscriptEntry {
    /// Plain assistant text with no tool metadata
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            metadata: None,
        }
    }

    /// Announcement that a tool is about to run, shown as pending
    pub fn tool_call_pending(tool_name: &str, params_json: &str) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: format!("I'll use the {tool_name} tool to help answer your question."),
            metadata: Some(EntryMetadata {
                id: format!("tool_call_{tool_name}"),
                parent_id: None,
                title: format!("Using tool: {tool_name}"),
                log: Some(format!("Parameters: {params_json}")),
                status: Some(EntryStatus::Pending),
            }),
        }
    }

    /// The parameters the model chose, as a fenced JSON block
    pub fn tool_parameters(tool_name: &str, params_json: &str) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: format!("```json\n{params_json}\n```"),
            metadata: Some(EntryMetadata {
                id: format!("params_{tool_name}"),
                parent_id: Some(format!("tool_call_{tool_name}")),
                title: "Tool Parameters".to_string(),
                log: None,
                status: None,
            }),
        }
    }

    /// Header entry grouping the tool's results
    pub fn tool_result_header(tool_name: &str) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: "Here are the results from the tool:".to_string(),
            metadata: Some(EntryMetadata {
                id: format!("result_{tool_name}"),
                parent_id: None,
                title: format!("Tool Result for {tool_name}"),
                log: None,
                status: Some(EntryStatus::Done),
            }),
        }
    }

    /// Raw tool output as a fenced block, nested under the result header
    pub fn raw_output(tool_name: &str, output: &str) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: format!("```\n{output}\n```"),
            metadata: Some(EntryMetadata {
                id: format!("raw_result_{tool_name}"),
                parent_id: Some(format!("result_{tool_name}")),
                title: "Raw Output".to_string(),
                log: None,
                status: Some(EntryStatus::Done),
            }),
        }
    }

    /// Marker entry for a generated image, nested under the result header
    pub fn generated_image(tool_name: &str) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: "Here are the results from the tool:".to_string(),
            metadata: Some(EntryMetadata {
                id: format!("image_{tool_name}"),
                parent_id: Some(format!("result_{tool_name}")),
                title: "Generated Image".to_string(),
                log: None,
                status: Some(EntryStatus::Done),
            }),
        }
    }

    /// Raw-output entry reporting a failed dispatch
    pub fn dispatch_failure(tool_name: &str) -> Self {
        Self::raw_output(tool_name, "Fail to get the server response")
    }
}

/// Flip the pending tool-call announcement for `tool_name` to done
pub fn mark_call_done(entries: &mut [TranscriptEntry], tool_name: &str) {
    let call_id = format!("tool_call_{tool_name}");
    for entry in entries {
        if let Some(metadata) = &mut entry.metadata {
            if metadata.id == call_id {
                metadata.status = Some(EntryStatus::Done);
            }
        }
    }
}
