//! Static tool catalog passed to the language model.
//!
//! The catalog is declarative: JSON-schema parameter definitions the model
//! uses to pick a tool and shape its arguments. Execution is not wired here;
//! the orchestrator dispatches the chosen tool over MCP.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Descriptor for a callable tool, in the OpenAI function-tool shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub r#type: String,
    pub function: FunctionDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// System prompt steering the model between conversation and tool use
pub const SYSTEM_PROMPT: &str = "\
You're a chatbot assistant. Your task is to heed the user query and decide whether to use the functions such as: 'generate_image', 'describe_image', 'get_forecast', 'get_alerts' with their respective parameters or not.
Based on the the user query, decide if it is a conversation query or a functional tool request.
If the user's query are general, just response in a conversational manner.
If tools are needed, response with JSON format with the required parameters.
Use these tool definitions to help you identifying the tasks:
For tool 'generate_image', you must reponse with a JSON object with three key and value pairs representing three paramters: 'prompt', 'width' and 'height'.
For tool 'describe_image', you must response with a JSON object in the 'prompt' key with prompt representing the additional detail prompt for the image description as the parameter.
For tool 'get_alerts', you must response with a JSON object with a key and value pair representing the US state in the format of two-letter (e.g CA, NY) as parameter.
For tool 'get_forecast', if the latitude and longtitude are given by the user, use that and response with a JSON object representing two key and value pairs for 'latitude' and 'longtitude' parameters. If both of those are not provided, figure it out yourself.
For tool 'get_multiply', you must response with a JSON object with two key and value pairs representing the 'first_number' and the 'second_number' as parameters for the multiplication.";

/// The full catalog, in the order the model sees it
pub fn tool_definitions() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::function(
            "generate_image",
            "Generate an image using SanaSprint model with the output of three parameters: 'prompt', 'width', 'height'",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Text prompt describing the image to generate"
                    },
                    "width": {
                        "type": "integer",
                        "description": "Image width (default: 512)",
                        "default": 512
                    },
                    "height": {
                        "type": "integer",
                        "description": "Image height (default: 512)",
                        "default": 512
                    }
                },
                "required": ["prompt"]
            }),
        ),
        ToolDescriptor::function(
            "describe_image",
            "Describe the image with the appropriate prompt.",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Text prompt about the detail requirement for the image description."
                    }
                },
                "required": ["prompt"]
            }),
        ),
        ToolDescriptor::function(
            "get_alerts",
            "Get weather alerts for a US state from an API.",
            json!({
                "type": "object",
                "properties": {
                    "state": {
                        "type": "string",
                        "description": "Two-letter US state code (e.g. CA, NY)"
                    }
                },
                "required": ["state"]
            }),
        ),
        ToolDescriptor::function(
            "get_forecast",
            "Get weather forecast for a location from an API",
            json!({
                "type": "object",
                "properties": {
                    "latitude": {
                        "type": "string",
                        "description": "Latitude of the location"
                    },
                    "longtitude": {
                        "type": "string",
                        "description": "longtitude of the location"
                    }
                },
                "required": ["latitude", "longtitude"]
            }),
        ),
        ToolDescriptor::function(
            "get_multiply",
            "Calculate multiplication between a and b",
            json!({
                "type": "object",
                "properties": {
                    "first_number": {
                        "type": "integer",
                        "description": "first number"
                    },
                    "second_number": {
                        "type": "integer",
                        "description": "second number"
                    }
                },
                "required": ["first_number", "second_number"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lists_all_tools() {
        let defs = tool_definitions();
        let names: Vec<_> = defs.iter().map(|d| d.function.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["generate_image", "describe_image", "get_alerts", "get_forecast", "get_multiply"]
        );
    }

    #[test]
    fn test_every_tool_is_a_function() {
        for def in tool_definitions() {
            assert_eq!(def.r#type, "function");
        }
    }

    #[test]
    fn test_generate_image_schema() {
        let defs = tool_definitions();
        let gen = defs.iter().find(|d| d.function.name == "generate_image").unwrap();

        assert_eq!(gen.function.parameters["required"], json!(["prompt"]));
        assert_eq!(gen.function.parameters["properties"]["width"]["default"], 512);
        assert_eq!(gen.function.parameters["properties"]["height"]["default"], 512);
    }

    #[test]
    fn test_forecast_keeps_wire_spelling() {
        // "longtitude" is what the tool server expects; do not correct it
        let defs = tool_definitions();
        let forecast = defs.iter().find(|d| d.function.name == "get_forecast").unwrap();

        assert!(forecast.function.parameters["properties"]["longtitude"].is_object());
        assert_eq!(
            forecast.function.parameters["required"],
            json!(["latitude", "longtitude"])
        );
    }

    #[test]
    fn test_descriptor_serialization() {
        let defs = tool_definitions();
        let json = serde_json::to_string(&defs[4]).unwrap();

        assert!(json.contains("\"type\":\"function\""));
        assert!(json.contains("get_multiply"));
        assert!(json.contains("first_number"));
    }

    #[test]
    fn test_descriptor_roundtrip() {
        let defs = tool_definitions();
        let json = serde_json::to_string(&defs).unwrap();
        let back: Vec<ToolDescriptor> = serde_json::from_str(&json).unwrap();

        assert_eq!(back.len(), defs.len());
        assert_eq!(back[0].function.name, "generate_image");
    }

    #[test]
    fn test_system_prompt_names_each_tool() {
        for name in ["generate_image", "describe_image", "get_alerts", "get_forecast", "get_multiply"] {
            assert!(SYSTEM_PROMPT.contains(name), "prompt missing {name}");
        }
    }
}
