use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// A tool offered to the model.
///
/// Function tools are user-defined and described by a JSON schema. Builtin
/// tools are provider-hosted (computer use, bash, text editor) and are
/// identified by a versioned type tag such as `computer_20241022`; their
/// remaining fields are provider specific and kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ToolDefinition {
    Function(FunctionTool),
    Builtin(BuiltinTool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinTool {
    pub tool_type: String,
    /// Every field other than `type`, as supplied.
    pub fields: Map<String, Value>,
}

impl BuiltinTool {
    /// The tool name, read from either the flat shape
    /// (`{"type": .., "name": ..}`) or the wrapped one
    /// (`{"type": .., "function": {"name": .., "parameters": {..}}}`).
    pub fn name(&self) -> Option<&str> {
        self.fields
            .get("name")
            .or_else(|| self.fields.get("function").and_then(|f| f.get("name")))
            .and_then(Value::as_str)
    }

    /// Provider configuration such as display size, whichever shape was used.
    pub fn settings(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in &self.fields {
            match key.as_str() {
                "name" => {}
                "function" => {
                    if let Some(params) = value.get("parameters").and_then(Value::as_object) {
                        out.extend(params.clone());
                    }
                }
                _ => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        ToolDefinition::Function(FunctionTool {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        })
    }

    pub fn builtin(tool_type: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ToolDefinition::Builtin(BuiltinTool {
            tool_type: tool_type.to_string(),
            fields,
        })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ToolDefinition::Function(f) => Some(&f.name),
            ToolDefinition::Builtin(b) => b.name(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, ToolDefinition::Builtin(_))
    }
}

impl TryFrom<Value> for ToolDefinition {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut map) = value else {
            return Err(AppError::BadRequest("tool definition must be an object".to_string()));
        };
        let tool_type = match map.remove("type") {
            Some(Value::String(t)) => t,
            _ => return Err(AppError::BadRequest("tool definition is missing 'type'".to_string())),
        };

        if tool_type == "function" {
            let function = map
                .remove("function")
                .ok_or_else(|| AppError::BadRequest("function tool is missing 'function'".to_string()))?;
            let function: FunctionTool = serde_json::from_value(function)?;
            return Ok(ToolDefinition::Function(function));
        }

        Ok(ToolDefinition::Builtin(BuiltinTool { tool_type, fields: map }))
    }
}

impl From<ToolDefinition> for Value {
    fn from(tool: ToolDefinition) -> Self {
        match tool {
            ToolDefinition::Function(f) => serde_json::json!({
                "type": "function",
                "function": {
                    "name": f.name,
                    "description": f.description,
                    "parameters": f.parameters
                }
            }),
            ToolDefinition::Builtin(b) => {
                let mut map = Map::new();
                map.insert("type".to_string(), Value::String(b.tool_type));
                map.extend(b.fields);
                Value::Object(map)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}
