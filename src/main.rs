use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod utils;

use cmd::{ExecArgs, GetArgs, ListArgs, ServeArgs};
use mcp_cliwrap::{BridgeConfig, Overrides};

/// mcp-cliwrap - expose a self-documenting CLI as MCP tools
///
/// Commands:
///   mcp-cliwrap serve                       MCP server on stdio (what an MCP client launches)
///   mcp-cliwrap list [--json]               tools discovered from `<program> --help`
///   mcp-cliwrap get  [TOOL] [--json]        one tool's parameters
///   mcp-cliwrap exec TOOL --param k=v ...   call a tool locally
///
/// Global flags / env:
///   -v / -vv               Increase verbosity (logs go to stderr)
///   -q / --quiet           Errors only
///   -p / --program         Wrapped CLI, e.g. "glab" or "docker compose" (or MCP_CLI_PROGRAM)
///   --prefix               Tool-name prefix (default: program name)
///   --config               YAML config file (or MCP_CLIWRAP_CONFIG)
///   --cache-ttl            Discovery cache lifetime in seconds (default 300)
///
/// Examples:
///   mcp-cliwrap serve
///   mcp-cliwrap -p gh list
///   mcp-cliwrap exec glab_issue --param subcommand=list --param format=json --json
///   mcp-cliwrap exec glab_raw --param args=auth,status
#[derive(Parser, Debug)]
#[command(
    name = "mcp-cliwrap",
    version,
    author,
    about = "MCP server exposing a self-documenting CLI (glab by default) as tools",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error logging
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Wrapped CLI command line
    #[arg(short = 'p', long, env = "MCP_CLI_PROGRAM", global = true, value_name = "PROGRAM")]
    program: Option<String>,

    /// Tool-name prefix
    #[arg(long, global = true, value_name = "PREFIX")]
    prefix: Option<String>,

    /// YAML configuration file
    #[arg(long, env = "MCP_CLIWRAP_CONFIG", global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Discovery cache TTL in seconds
    #[arg(long = "cache-ttl", global = true, value_name = "SECS")]
    cache_ttl: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server on stdio
    Serve(ServeArgs),

    /// List the tools discovered from the wrapped CLI
    List(ListArgs),

    /// Show one tool's schema
    Get(GetArgs),

    /// Execute (invoke) a tool locally
    Exec(ExecArgs),
}

impl Cli {
    fn resolve_config(&self) -> Result<BridgeConfig> {
        let overrides = Overrides {
            program: self.program.clone().filter(|p| !p.trim().is_empty()),
            tool_prefix: self.prefix.clone(),
            cache_ttl_secs: self.cache_ttl,
        };
        BridgeConfig::resolve(self.config.as_deref(), overrides).context("Failed to load configuration")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let config = cli.resolve_config()?;
    // Fail early on an unparsable program string.
    config.target()?;

    match cli.command {
        Commands::Serve(args) => cmd::execute_serve(args, &config),
        Commands::List(args) => cmd::execute_list(args, &config),
        Commands::Get(args) => cmd::execute_get(args, &config),
        Commands::Exec(args) => cmd::execute_exec(args, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mcp-cliwrap", "list", "-p", "gh", "--cache-ttl", "30"]).unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.program, "gh");
        assert_eq!(config.cache_ttl_secs, 30);
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn exec_collects_params() {
        let cli = Cli::try_parse_from([
            "mcp-cliwrap",
            "exec",
            "glab_issue",
            "--param",
            "subcommand=list",
            "--param",
            "format=json",
        ])
        .unwrap();
        let Commands::Exec(args) = cli.command else {
            panic!("expected exec");
        };
        assert_eq!(args.tool, "glab_issue");
        assert_eq!(args.params, vec!["subcommand=list", "format=json"]);
    }

    #[test]
    fn serve_flag() {
        let cli = Cli::try_parse_from(["mcp-cliwrap", "serve", "--no-prewarm"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert!(args.no_prewarm);
    }
}
