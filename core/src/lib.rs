//! Tool registry and built-in tools, MCP client support, the generation
//! pipeline, and the subagent runtime.

pub mod mcp;
pub mod pipeline;
pub mod subagent;
pub mod tools;
