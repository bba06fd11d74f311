/*!
dispatch.rs - tool name + JSON arguments -> process invocation.

  - resolve  : tool name -> Target (reserved tools first, then discovered commands)
  - dispatch : Target + CallRequest -> Dispatched
  - call     : both of the above, plus argument parsing from the caller's JSON

Every failure here is call-level. Nothing in this module can take the server down.
*/

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::discovery::DiscoveryCache;
use crate::marshal::{CallRequest, build_argv};
use crate::runner::{CallResult, CommandRunner};
use crate::schema::{
    FLAGS_PROPERTY, JsonObject, OutputFormat, ReservedTool, ToolNaming, ToolSchema, catalog,
    denormalize_name,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Raw,
    Help,
    Discover,
    /// A discovered command, in CLI spelling.
    Command(String),
}

impl From<ReservedTool> for Target {
    fn from(tool: ReservedTool) -> Self {
        match tool {
            ReservedTool::Raw => Target::Raw,
            ReservedTool::Help => Target::Help,
            ReservedTool::Discover => Target::Discover,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Completed(CallResult),
    /// The cache was rebuilt; carries the new command count.
    Rediscovered { commands: usize },
    /// Top-level help failed during rediscovery; the previous commands stay.
    RediscoveryFailed(CallResult),
}

impl Dispatched {
    pub fn succeeded(&self) -> bool {
        match self {
            Dispatched::Completed(result) => result.succeeded,
            Dispatched::Rediscovered { .. } => true,
            Dispatched::RediscoveryFailed(_) => false,
        }
    }
}

pub struct Dispatcher {
    runner: Arc<dyn CommandRunner>,
    cache: Arc<DiscoveryCache>,
    naming: ToolNaming,
}

impl Dispatcher {
    pub fn new(runner: Arc<dyn CommandRunner>, cache: Arc<DiscoveryCache>, naming: ToolNaming) -> Self {
        Self {
            runner,
            cache,
            naming,
        }
    }

    pub fn naming(&self) -> &ToolNaming {
        &self.naming
    }

    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    pub fn program(&self) -> &str {
        self.runner.program()
    }

    /// Current tool catalog (may trigger a rebuild).
    pub async fn tools(&self) -> Vec<ToolSchema> {
        let snapshot = self.cache.get_snapshot().await;
        catalog(&self.naming, &snapshot, self.runner.program())
    }

    pub async fn resolve(&self, name: &str) -> Result<Target, DispatchError> {
        if let Some(reserved) = self.naming.reserved(name) {
            return Ok(reserved.into());
        }

        let rest = self
            .naming
            .strip_prefix(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let snapshot = self.cache.get_snapshot().await;
        if snapshot.is_empty() {
            // Discovery failed; take the caller's word for it.
            return Ok(Target::Command(denormalize_name(rest)));
        }
        snapshot
            .commands
            .keys()
            .find(|command| self.naming.tool_name(command) == name)
            .map(|command| Target::Command(command.clone()))
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))
    }

    pub async fn dispatch(&self, target: &Target, request: &CallRequest) -> Result<Dispatched, DispatchError> {
        let cwd = request.cwd.as_deref();
        let result = match target {
            Target::Raw => self.runner.execute(&request.positional_args, cwd).await,
            Target::Help => {
                let mut argv = request.positional_args.clone();
                argv.push("--help".into());
                self.runner.execute(&argv, None).await
            }
            Target::Discover => {
                return Ok(match self.cache.refresh().await {
                    Ok(snapshot) => Dispatched::Rediscovered {
                        commands: snapshot.len(),
                    },
                    Err(failed) => Dispatched::RediscoveryFailed(failed),
                });
            }
            Target::Command(command) => {
                let argv = build_argv(command, request);
                self.runner.execute(&argv, cwd).await
            }
        };
        Ok(Dispatched::Completed(result))
    }

    pub async fn call(&self, name: &str, arguments: Option<&JsonObject>) -> Result<Dispatched, DispatchError> {
        info!(tool = name, "tool call");
        let target = self.resolve(name).await?;
        let request = parse_request(name, &target, arguments)?;
        debug!(?target, ?request, "dispatching");
        self.dispatch(&target, &request).await
    }
}

/* ---- Argument parsing ---- */

fn parse_request(tool: &str, target: &Target, arguments: Option<&JsonObject>) -> Result<CallRequest, DispatchError> {
    let invalid = |reason: String| DispatchError::InvalidArguments {
        tool: tool.to_string(),
        reason,
    };
    let empty = JsonObject::new();
    let arguments = arguments.unwrap_or(&empty);
    let mut request = CallRequest::new(tool);

    match target {
        Target::Discover => return Ok(request),
        Target::Help => {
            let command = optional_string(arguments, "command").map_err(invalid)?;
            let parts: Vec<String> = command
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if parts.is_empty() {
                return Err(invalid("'command' is required".into()));
            }
            request.positional_args = parts;
            return Ok(request);
        }
        Target::Raw => {
            if !arguments.contains_key("args") {
                return Err(invalid("'args' is required".into()));
            }
        }
        Target::Command(_) => {}
    }

    if let Some(value) = arguments.get("args") {
        request.positional_args = positional_args(value).map_err(invalid)?;
    }
    request.cwd = optional_string(arguments, "cwd").map_err(invalid)?;

    if matches!(target, Target::Raw) {
        return Ok(request);
    }

    request.subcommand = optional_string(arguments, "subcommand")
        .map_err(invalid)?
        .filter(|s| !s.is_empty());

    match arguments.get(FLAGS_PROPERTY) {
        None | Some(Value::Null) => {}
        Some(Value::Object(flags)) => request.flags = flags.clone(),
        Some(_) => return Err(invalid(format!("'{FLAGS_PROPERTY}' must be an object"))),
    }

    if let Some(format) = optional_string(arguments, "format").map_err(invalid)?
        && !format.is_empty()
    {
        let parsed = OutputFormat::from_str_ci(&format).ok_or_else(|| {
            let allowed: Vec<&str> = OutputFormat::variants().iter().map(|f| f.as_str()).collect();
            invalid(format!("'format' must be one of {}", allowed.join(", ")))
        })?;
        request.format = Some(parsed);
    }

    Ok(request)
}

fn optional_string(arguments: &JsonObject, key: &str) -> Result<Option<String>, String> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("'{key}' must be a string")),
    }
}

/// `args` as an array of scalars, or one string split with shell quoting rules.
fn positional_args(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => {
            shell_words::split(s).map_err(|e| format!("could not split 'args': {e}"))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                _ => Err("'args' items must be strings".to_string()),
            })
            .collect(),
        _ => Err("'args' must be an array of strings".into()),
    }
}

/* ---- Tests ---- */
