//! MCP tool server for coding agents: wires a [`dts_dispatch::Dispatcher`]
//! to the `rmcp` SDK and serves the fixed tool catalog of spec.md §6.

mod serve;
mod tools;

pub use serve::handle_serve_command;
pub use tools::DevToolsServer;
