// crates/shared/src/schemas/mod.rs
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSchema>,
}

#[derive(Debug, Clone)]
pub struct ParameterSchema {
    pub name: &'static str,
    pub type_name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Provider-neutral tool definition. Each backend maps it onto its own wire shape.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSchema {
    /// JSON-Schema object describing the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = json!({});
        let mut required = vec![];

        for param in &self.parameters {
            properties[param.name] = json!({
                "type": param.type_name,
                "description": param.description
            });
            if param.required {
                required.push(param.name);
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

pub type ToolHandler = fn(&Value) -> anyhow::Result<Value>;

/// Result payload handed back to the model after a tool runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { data: Value },
    Error { error_message: String },
}

impl ToolOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        ToolOutcome::Error {
            error_message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error { .. })
    }

    /// Wire form of the outcome, produced by the derived `Serialize` impl.
    pub fn to_json(&self) -> Value {
        // Serializing an enum of strings and `Value`s cannot fail.
        serde_json::to_value(self).unwrap_or_default()
    }

    /// One-line human readable form, used when announcing results in the terminal.
    pub fn summary(&self) -> String {
        match self {
            ToolOutcome::Success { data } => data["report"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| data.to_string()),
            ToolOutcome::Error { error_message } => error_message.clone(),
        }
    }
}
