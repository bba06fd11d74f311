//! Argument marshalling: structured call -> literal argv.
//!
//! Order is fixed:
//!   [command, subcommand?, ...positional_args, ...flag pairs (map order), --format <f>?]

use serde_json::Value;

use crate::schema::{JsonObject, OutputFormat, denormalize_name};

/// One structured invocation, as received from the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRequest {
    pub tool_name: String,
    pub subcommand: Option<String>,
    pub positional_args: Vec<String>,
    /// Normalized flag name -> value, in the caller's order.
    pub flags: JsonObject,
    pub format: Option<OutputFormat>,
    pub cwd: Option<String>,
}

impl CallRequest {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            ..Default::default()
        }
    }
}

/// CLI text for a flag value; `None` means the flag is left out.
/// Null, empty strings and `false` are treated as absent.
pub fn flag_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn build_argv(command: &str, request: &CallRequest) -> Vec<String> {
    let mut argv = vec![command.to_string()];

    if let Some(sub) = request.subcommand.as_deref().filter(|s| !s.is_empty()) {
        argv.push(sub.to_string());
    }

    argv.extend(request.positional_args.iter().cloned());

    for (name, value) in &request.flags {
        if let Some(text) = flag_value(value) {
            argv.push(format!("--{}", denormalize_name(name)));
            argv.push(text);
        }
    }

    if let Some(format) = request.format
        && !argv.iter().any(|a| a.starts_with("--format"))
    {
        argv.push("--format".into());
        argv.push(format.as_str().into());
    }

    argv
}
