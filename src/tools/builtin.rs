use serde_json::json;

use crate::tools::definition::ToolDefinition;

pub const DISPLAY_WIDTH_PX: u32 = 1024;
pub const DISPLAY_HEIGHT_PX: u32 = 768;

/// Anthropic's computer-use builtins plus one ordinary function tool, so a
/// single request exercises both routing paths.
pub fn computer_use_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::builtin(
            "computer_20241022",
            json!({
                "function": {
                    "name": "computer",
                    "parameters": {
                        "display_height_px": DISPLAY_HEIGHT_PX,
                        "display_width_px": DISPLAY_WIDTH_PX,
                        "display_number": 0
                    }
                }
            }),
        ),
        ToolDefinition::builtin("bash_20241022", json!({ "name": "bash" })),
        ToolDefinition::builtin("text_editor_20241022", json!({ "name": "str_replace_editor" })),
        ToolDefinition::function(
            "get_weather",
            "Get the current weather in a given location",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "The city and state, e.g. San Francisco, CA"
                    },
                    "unit": { "type": "string", "enum": ["celsius", "fahrenheit"] }
                },
                "required": ["location"]
            }),
        ),
    ]
}
