//! `serve` - run the MCP server on stdio.
//!
//! stdout carries the protocol; nothing else may print to it.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use mcp_cliwrap::{BridgeConfig, BridgeServer, serve_stdio};

use crate::cmd::shared::runtime;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Skip discovery at startup (the first tools/list pays for it instead)
    #[arg(long)]
    pub no_prewarm: bool,
}

pub fn execute_serve(args: ServeArgs, config: &BridgeConfig) -> Result<()> {
    let dispatcher = config.build_dispatcher()?;
    tracing::info!(
        program = %config.program,
        prefix = dispatcher.naming().prefix(),
        ttl_secs = config.cache_ttl_secs,
        "starting MCP server"
    );
    let server = BridgeServer::new(Arc::new(dispatcher), config.server_name.clone());
    runtime()?.block_on(serve_stdio(server, !args.no_prewarm))
}
