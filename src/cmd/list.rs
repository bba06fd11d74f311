/*!
`list.rs` - print the tool catalog the server would advertise.

Runs discovery against the configured program (one `--help` per command),
then prints the tools as a table, or as JSON with `--json`:

{
  "status": "ok",
  "program": "glab",
  "elapsed_ms": 812,
  "count": 3,
  "tools": [ { "name": "glab_raw", "description": "..." }, ... ]
}
*/

use std::time::Instant;

use anyhow::Result;
use clap::Args;

use mcp_cliwrap::BridgeConfig;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table, truncate_ellipsis};
use crate::cmd::shared::{param_rows, runtime};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn execute_list(args: ListArgs, config: &BridgeConfig) -> Result<()> {
    let dispatcher = config.build_dispatcher()?;
    let started = Instant::now();
    let tools = runtime()?.block_on(dispatcher.tools());
    let elapsed_ms = started.elapsed().as_millis();
    let program = dispatcher.program();

    if args.json {
        let items: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| serde_json::json!({"name": t.name, "description": t.description}))
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "program": program,
                "elapsed_ms": elapsed_ms,
                "count": tools.len(),
                "tools": items,
            })
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} Tools ({})", emoji("list", &style), tools.len()),
            Some(format!("program={program} • {elapsed_ms}ms")),
            &style,
        )
    );

    let rows: Vec<Vec<String>> = tools
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            let params: Vec<String> = param_rows(t)
                .into_iter()
                .filter(|p| !p.name.contains('.'))
                .map(|p| format!("{}:{}", p.name, p.kind))
                .collect();
            let params = if params.is_empty() { "-".to_string() } else { params.join(", ") };
            vec![
                (idx + 1).to_string(),
                t.name.clone(),
                params,
                truncate_ellipsis(&t.description.replace('\n', " "), 90),
            ]
        })
        .collect();
    println!("{}", table(&["#", "NAME", "PARAMS", "DESCRIPTION"], &rows, &style));

    println!(
        "\n{} {}",
        emoji("info", &style),
        color(
            Role::Dim,
            "Use `mcp-cliwrap get <tool>` for a tool's parameters",
            &style
        )
    );
    Ok(())
}
