/*!
Subcommands of the `mcp-cliwrap` binary.

  serve.rs   run the MCP server on stdio
  list.rs    print the tool catalog
  get.rs     print one tool's schema
  exec.rs    call one tool locally
  shared.rs  runtime, parameter coercion, param files, error output
  format.rs  terminal formatting (human output only)

Each subcommand exposes one `execute_*(args, &BridgeConfig) -> anyhow::Result<()>`.
*/

pub mod exec;
pub mod format;
pub mod get;
pub mod list;
pub mod serve;
pub mod shared;

pub use exec::{ExecArgs, execute_exec};
pub use get::{GetArgs, execute_get};
pub use list::{ListArgs, execute_list};
pub use serve::{ServeArgs, execute_serve};
