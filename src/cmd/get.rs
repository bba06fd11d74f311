/*!
`get.rs` - show one tool's schema.

`get <TOOL>` looks the tool up (case-insensitive) in the current catalog.
Without a name the catalog is listed and a tool is picked interactively.

JSON shape (`--json`):
{
  "status": "ok",
  "name": "glab_issue",
  "tool": { "name": ..., "description": ..., "input_schema": {...} },
  "parameters": [ {"name":"args","type":"array","required":false,"description":"..."} ]
}
*/

use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};
use clap::Args;

use mcp_cliwrap::BridgeConfig;
use mcp_cliwrap::schema::ToolSchema;

use crate::cmd::format::{StyleOptions, box_header, emoji, table};
use crate::cmd::shared::{output_error, param_rows, runtime};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Tool name (e.g. glab_issue). If omitted, pick from a list.
    #[arg(value_name = "TOOL")]
    pub tool: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_get(args: GetArgs, config: &BridgeConfig) -> Result<()> {
    let dispatcher = config.build_dispatcher()?;
    let tools = runtime()?.block_on(dispatcher.tools());

    let name = match args.tool {
        Some(name) => name,
        None => {
            let names: Vec<String> = tools.iter().map(|t| t.name.clone()).collect();
            let stdin = io::stdin();
            select_tool(&names, &mut stdin.lock(), &mut io::stdout())?
        }
    };

    let Some(tool) = find_tool(&tools, &name) else {
        return output_error(args.json, "Get Error", &format!("tool '{name}' not found"));
    };
    let params = param_rows(tool);

    if args.json {
        let parameters: Vec<serde_json::Value> = params
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "type": p.kind,
                    "required": p.required,
                    "description": p.description,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "name": tool.name,
                "tool": tool,
                "parameters": parameters,
            })
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} Tool: {}", emoji("tool", &style), tool.name),
            Some(format!("program={}", dispatcher.program())),
            &style,
        )
    );
    let description = if tool.description.is_empty() {
        "<none>"
    } else {
        tool.description.as_str()
    };
    println!("Description: {description}");

    if params.is_empty() {
        println!("Parameters: (none)");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = params
        .into_iter()
        .map(|p| {
            vec![
                p.name,
                p.kind,
                if p.required { "yes".into() } else { "no".into() },
                if p.description.is_empty() { "-".into() } else { p.description },
            ]
        })
        .collect();
    println!("{}", table(&["NAME", "TYPE", "REQ", "DESCRIPTION"], &rows, &style));
    Ok(())
}

pub fn find_tool<'a>(tools: &'a [ToolSchema], name: &str) -> Option<&'a ToolSchema> {
    tools
        .iter()
        .find(|t| t.name == name)
        .or_else(|| tools.iter().find(|t| t.name.eq_ignore_ascii_case(name)))
}

/// Numbered menu; a number picks from the list, anything else is taken as a name.
fn select_tool(names: &[String], input: &mut impl BufRead, out: &mut impl Write) -> Result<String> {
    if names.is_empty() {
        bail!("no tools available");
    }
    writeln!(out, "Select a tool:")?;
    for (i, name) in names.iter().enumerate() {
        writeln!(out, "  [{}] {name}", i + 1)?;
    }
    write!(out, "Enter number (1-{}): ", names.len())?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let trimmed = line.trim();
    if let Ok(idx) = trimmed.parse::<usize>()
        && (1..=names.len()).contains(&idx)
    {
        return Ok(names[idx - 1].clone());
    }
    if trimmed.is_empty() {
        bail!("invalid selection");
    }
    Ok(trimmed.to_string())
}
