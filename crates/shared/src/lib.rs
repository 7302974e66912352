pub mod events;
pub mod macros;
pub mod schemas;
pub mod tools;

pub use schemas::{ParameterSchema, Tool, ToolOutcome, ToolSchema};
pub use tools::{get_tools, use_tool};
