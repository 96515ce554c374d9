use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message role in an LLM conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool call requested by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

/// Message in an LLM conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "default_role")]
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Ties a tool-role message back to the call it answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_paths: Option<Vec<String>>,
}

fn default_role() -> MessageRole {
    MessageRole::User
}

/// Response from an LLM gateway completion
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            image_paths: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            image_paths: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            image_paths: None,
        }
    }

    /// Create an assistant message carrying tool calls
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            image_paths: None,
        }
    }

    /// Create a tool-role message answering the given call id
    pub fn tool_response(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            image_paths: None,
        }
    }

    /// Add image paths to this message
    pub fn with_images(mut self, paths: Vec<String>) -> Self {
        self.image_paths = Some(paths);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(serde_json::to_string(&MessageRole::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&MessageRole::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(serde_json::to_string(&MessageRole::Tool).unwrap(), "\"tool\"");
    }

    #[test]
    fn test_message_role_deserialization() {
        assert_eq!(serde_json::from_str::<MessageRole>("\"system\"").unwrap(), MessageRole::System);
        assert_eq!(serde_json::from_str::<MessageRole>("\"tool\"").unwrap(), MessageRole::Tool);
    }

    #[test]
    fn test_user_message() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, Some("Hello".to_string()));
        assert!(msg.tool_calls.is_none());
        assert!(msg.image_paths.is_none());
    }

    #[test]
    fn test_system_message() {
        let msg = ChatMessage::system("You're a chatbot assistant");
        assert_eq!(msg.role, MessageRole::System);
        assert_eq!(msg.content, Some("You're a chatbot assistant".to_string()));
    }

    #[test]
    fn test_assistant_message() {
        let msg = ChatMessage::assistant("I can help with that");
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, Some("I can help with that".to_string()));
    }

    #[test]
    fn test_assistant_tool_calls_message() {
        let call = ToolCall {
            id: Some("call_1".to_string()),
            name: "get_multiply".to_string(),
            arguments: HashMap::new(),
        };
        let msg = ChatMessage::assistant_tool_calls(vec![call]);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.content.is_none());
        assert_eq!(msg.tool_calls.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_tool_response_message() {
        let msg = ChatMessage::tool_response("call_1", "the mutiplication is 42");
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id, Some("call_1".to_string()));
        assert_eq!(msg.content, Some("the mutiplication is 42".to_string()));
    }

    #[test]
    fn test_message_with_images() {
        let msg = ChatMessage::user("Describe this image")
            .with_images(vec!["/path/to/image.jpg".to_string()]);
        assert_eq!(msg.image_paths, Some(vec!["/path/to/image.jpg".to_string()]));
    }

    #[test]
    fn test_tool_call_serialization() {
        let mut args = HashMap::new();
        args.insert("state".to_string(), serde_json::json!("CA"));

        let tool_call = ToolCall {
            id: Some("call_123".to_string()),
            name: "get_alerts".to_string(),
            arguments: args,
        };

        let json = serde_json::to_string(&tool_call).unwrap();
        assert!(json.contains("get_alerts"));
        assert!(json.contains("call_123"));
    }

    #[test]
    fn test_tool_call_without_id() {
        let tool_call = ToolCall {
            id: None,
            name: "get_forecast".to_string(),
            arguments: HashMap::new(),
        };

        let json = serde_json::to_string(&tool_call).unwrap();
        // id should be omitted when None
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn test_chat_message_serialization() {
        let msg = ChatMessage::user("test content");
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"test content\""));
        assert!(!json.contains("tool_call_id"));
    }

    #[test]
    fn test_chat_message_default_role() {
        let json = r#"{"content":"test"}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg.role, MessageRole::User);
    }
}
