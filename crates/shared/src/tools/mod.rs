use once_cell::sync::Lazy;
use std::collections::HashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::schemas::{Tool, ToolHandler, ToolOutcome, ToolSchema};

pub mod toolbelts;

static TOOL_REGISTRY: Lazy<HashMap<&'static str, ToolHandler>> = Lazy::new(|| {
    let mut map = HashMap::new();

    for (name, handler) in toolbelts::clock::TOOL_ENTRIES { map.insert(*name, *handler); }
    debug!(toolbelt = toolbelts::clock::DESCRIPTION, tools = map.len(), "registered toolbelt");
    map
});

static TOOL_SCHEMAS: Lazy<Vec<ToolSchema>> = Lazy::new(|| {
    let mut schemas = Vec::new();
    schemas.extend(toolbelts::clock::TOOL_SCHEMAS.iter().cloned());
    schemas
});

/// Runs a registered tool. Unknown names and handler failures come back as
/// error outcomes so the model can read them and recover.
pub fn use_tool(name: &str, args: &Value) -> ToolOutcome {
    let Some(handler) = TOOL_REGISTRY.get(name) else {
        warn!(tool = name, "model requested an unknown tool");
        return ToolOutcome::error(format!("Tool '{}' not found", name));
    };

    match handler(args) {
        Ok(data) => ToolOutcome::Success { data },
        Err(e) => {
            debug!(tool = name, error = %e, "tool returned an error");
            ToolOutcome::error(e.to_string())
        }
    }
}

pub fn get_tools() -> Vec<Tool> {
    TOOL_SCHEMAS.iter().map(|s| s.to_tool()).collect()
}

pub fn get_tool_schema(name: &str) -> anyhow::Result<&'static ToolSchema> {
    TOOL_SCHEMAS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| anyhow::anyhow!("Tool schema '{}' not found", name))
}
