/*!
`exec.rs` - call one tool locally, exactly as the MCP server would.

Usage:
  mcp-cliwrap exec glab_issue --param subcommand=list --param common_flags.assignee=@me
  mcp-cliwrap exec glab_raw --param args=auth,status --json
  mcp-cliwrap exec glab_mr --param-file params.yaml

Parameters are coerced using the tool's schema (`array` values split on
commas). `--param` entries win over `--param-file` entries.

JSON output:
{
  "status": "ok" | "failed",
  "tool": "glab_issue",
  "elapsed_ms": 120,
  "arguments": { ... },
  "result": { "succeeded": true, "exit_code": 0, "stdout": "...", "stderr": "", "data": null, "diagnostic": null }
}
A failed call (non-zero exit) still prints its result, then exits non-zero.
*/

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::Args;

use mcp_cliwrap::render::render;
use mcp_cliwrap::schema::{ReservedTool, ToolNaming, ToolSchema, reserved_schema};
use mcp_cliwrap::{BridgeConfig, Dispatched};

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};
use crate::cmd::get::find_tool;
use crate::cmd::shared::{build_arguments_from_schema, load_param_file_into_map, output_error, runtime};

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Tool name to invoke
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Provide parameter (KEY=VALUE), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Load parameters from file (JSON or YAML). CLI --param overrides file entries
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/// Schema of a reserved tool (raw / help / discover), matched case-insensitively.
/// These never need discovery.
fn reserved_tool_schema(naming: &ToolNaming, program: &str, name: &str) -> Option<ToolSchema> {
    ReservedTool::variants()
        .iter()
        .copied()
        .find(|tool| naming.reserved_name(*tool).eq_ignore_ascii_case(name))
        .map(|tool| reserved_schema(naming, tool, program))
}

/// Split repeatable `KEY=VALUE` parameters.
fn parse_params(params: &[String]) -> Result<HashMap<String, String>> {
    let mut provided = HashMap::new();
    for kv in params {
        let Some((k, v)) = kv.split_once('=') else {
            bail!("invalid --param (expected KEY=VALUE): {kv}");
        };
        let key = k.trim();
        if key.is_empty() {
            bail!("invalid --param (empty key): {kv}");
        }
        provided.insert(key.to_string(), v.trim().to_string());
    }
    Ok(provided)
}

pub fn execute_exec(args: ExecArgs, config: &BridgeConfig) -> Result<()> {
    let tool_name = args.tool.trim().to_string();
    if tool_name.is_empty() {
        return output_error(args.json, "Exec Error", "tool name cannot be empty");
    }

    let mut provided = match parse_params(&args.params) {
        Ok(p) => p,
        Err(e) => return output_error(args.json, "Exec Error", &e.to_string()),
    };
    if let Some(ref pf) = args.param_file
        && let Err(e) = load_param_file_into_map(pf, &mut provided)
    {
        return output_error(args.json, "Exec Error", &format!("{e:#}"));
    }

    let dispatcher = config.build_dispatcher()?;
    let rt = runtime()?;
    let started = Instant::now();

    let schema = match reserved_tool_schema(dispatcher.naming(), dispatcher.program(), &tool_name) {
        Some(schema) => schema,
        None => {
            let tools = rt.block_on(dispatcher.tools());
            match find_tool(&tools, &tool_name) {
                Some(schema) => schema.clone(),
                None => {
                    return output_error(args.json, "Exec Error", &format!("tool '{tool_name}' not found"));
                }
            }
        }
    };
    let arguments = match build_arguments_from_schema(&schema, &provided) {
        Ok(a) => a,
        Err(e) => return output_error(args.json, "Exec Error", &e.to_string()),
    };

    let outcome = match rt.block_on(dispatcher.call(&schema.name, Some(&arguments))) {
        Ok(o) => o,
        Err(e) => return output_error(args.json, "Exec Error", &e.to_string()),
    };
    let elapsed_ms = started.elapsed().as_millis();
    let succeeded = outcome.succeeded();

    if args.json {
        let result = match &outcome {
            Dispatched::Completed(r) => r.to_json(),
            Dispatched::Rediscovered { commands } => serde_json::json!({"rediscovered": commands}),
            Dispatched::RediscoveryFailed(r) => serde_json::json!({"rediscovery_failed": r.to_json()}),
        };
        let body = serde_json::json!({
            "status": if succeeded { "ok" } else { "failed" },
            "tool": schema.name,
            "elapsed_ms": elapsed_ms,
            "arguments": arguments,
            "result": result,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
        );
    } else {
        let style = StyleOptions::detect();
        let (mark, label) = if succeeded {
            (emoji("success", &style), "Exec Success")
        } else {
            (emoji("error", &style), "Exec Failed")
        };
        println!(
            "{}",
            box_header(
                format!("{mark} {label} ({})", schema.name),
                Some(format!("program={} • {elapsed_ms}ms", dispatcher.program())),
                &style,
            )
        );

        if arguments.is_empty() {
            println!(
                "{}",
                color(Role::Dim, format!("{} No arguments supplied", emoji("info", &style)), &style)
            );
        } else {
            let rows: Vec<Vec<String>> = arguments
                .iter()
                .map(|(k, v)| {
                    let v = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    vec![k.clone(), v]
                })
                .collect();
            println!("{}", color(Role::Accent, "Arguments:", &style));
            println!("{}", table(&["NAME", "VALUE"], &rows, &style));
        }
        println!();

        let help_tool = dispatcher.naming().reserved_name(ReservedTool::Help);
        let text = render(&outcome, dispatcher.program(), &help_tool);
        let role = if succeeded { Role::Success } else { Role::Error };
        let mut lines = text.lines();
        if let Some(first) = lines.next() {
            println!("{}", color(role, first, &style));
        }
        for line in lines {
            println!("{line}");
        }
    }

    if !succeeded {
        bail!("tool '{}' failed", schema.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_split_on_first_equals() {
        let p = parse_params(&["args=issue,list".into(), "common_flags.label=a=b".into()]).unwrap();
        assert_eq!(p["args"], "issue,list");
        assert_eq!(p["common_flags.label"], "a=b");
    }

    #[test]
    fn reserved_tools_resolve_without_a_catalog() {
        let naming = ToolNaming::new("glab");
        let raw = reserved_tool_schema(&naming, "glab", "GLAB_RAW").unwrap();
        assert_eq!(raw.name, "glab_raw");
        assert_eq!(raw.input_schema["required"], serde_json::json!(["args"]));
        assert_eq!(
            reserved_tool_schema(&naming, "glab", "glab_discover").unwrap().name,
            "glab_discover"
        );
        assert!(reserved_tool_schema(&naming, "glab", "glab_issue").is_none());
    }

    #[test]
    fn params_reject_malformed() {
        assert!(parse_params(&["novalue".into()]).is_err());
        assert!(parse_params(&[" =x".into()]).is_err());
    }
}
