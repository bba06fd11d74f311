/*!
mcp-cliwrap - expose a self-documenting CLI as MCP tools.

Pipeline:
  runner    : spawn `<program> <argv>`, capture exit / stdout / stderr
  help      : help text -> CommandInfo
  discovery : TTL cache of one snapshot of the command tree
  schema    : CommandInfo -> tool schema; reserved tool naming
  marshal   : structured call -> argv
  dispatch  : tool name + JSON arguments -> process run
  render    : result -> text for the caller
  server    : rmcp ServerHandler over stdio
*/

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod help;
pub mod marshal;
pub mod render;
pub mod runner;
pub mod schema;
pub mod server;
pub mod target;

pub use config::{BridgeConfig, Overrides};
pub use dispatch::{DispatchError, Dispatched, Dispatcher};
pub use server::{BridgeServer, serve_stdio};
