/*!
schema.rs - tool naming + schema synthesis.

  - ToolNaming      : `<prefix>_<command>` convention and the reserved tool names
  - synthesize      : CommandInfo -> ToolSchema (pure, total)
  - reserved_tools  : fixed raw / help / discover schemas
  - catalog         : full tool listing for one discovery snapshot

Generated input schema (per command):
{
  "type": "object",
  "properties": {
    "args":         { "type": "array", "items": { "type": "string" } },
    "common_flags": { "type": "object", "properties": { "<flag>": { "type": "string" } } },
    "subcommand":   { "type": "string", "enum": [ ... ] },
    "cwd":          { "type": "string" },
    "format":       { "type": "string", "enum": ["json", "table", "text"] }
  },
  "required": []
}
`common_flags` / `subcommand` only appear when the command has flags / subcommands.
*/

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::discovery::DiscoverySnapshot;
use crate::help::CommandInfo;

pub type JsonObject = Map<String, Value>;

/// Top-level property names of a command tool; flags may not shadow them.
pub const RESERVED_PROPERTIES: &[&str] = &["args", "cwd", "format", "subcommand"];

pub const FLAGS_PROPERTY: &str = "common_flags";

/* ---- Output Format ---- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Table,
    Text,
}

impl OutputFormat {
    pub const fn variants() -> &'static [OutputFormat] {
        &[OutputFormat::Json, OutputFormat::Table, OutputFormat::Text]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
            OutputFormat::Text => "text",
        }
    }

    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "table" => Some(OutputFormat::Table),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

/* ---- Naming ---- */

/// Normalize a flag (`--dry-run`, `-R`) to its property name (`dry_run`, `R`).
pub fn normalize_flag_name(flag: &str) -> String {
    flag.trim_start_matches('-')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Property name back to CLI spelling (`dry_run` -> `dry-run`).
pub fn denormalize_name(name: &str) -> String {
    name.replace('_', "-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedTool {
    Raw,
    Help,
    Discover,
}

impl ReservedTool {
    pub const fn variants() -> &'static [ReservedTool] {
        &[ReservedTool::Raw, ReservedTool::Help, ReservedTool::Discover]
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            ReservedTool::Raw => "raw",
            ReservedTool::Help => "help",
            ReservedTool::Discover => "discover",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolNaming {
    prefix: String,
}

impl ToolNaming {
    /// The prefix is sanitized to `[A-Za-z0-9_]`.
    pub fn new(prefix: &str) -> Self {
        let prefix: String = prefix
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tool_name(&self, command: &str) -> String {
        format!("{}_{}", self.prefix, command.replace('-', "_"))
    }

    pub fn reserved_name(&self, tool: ReservedTool) -> String {
        format!("{}_{}", self.prefix, tool.suffix())
    }

    pub fn reserved(&self, tool_name: &str) -> Option<ReservedTool> {
        ReservedTool::variants()
            .iter()
            .copied()
            .find(|r| self.reserved_name(*r) == tool_name)
    }

    /// The part of a tool name after `<prefix>_`, if it carries the prefix.
    pub fn strip_prefix<'a>(&self, tool_name: &'a str) -> Option<&'a str> {
        tool_name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('_')
            .filter(|rest| !rest.is_empty())
    }
}

/* ---- Schema ---- */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: JsonObject,
}

impl ToolSchema {
    pub fn properties(&self) -> Option<&JsonObject> {
        self.input_schema.get("properties").and_then(Value::as_object)
    }
}

fn object_schema(properties: JsonObject, required: &[&str]) -> JsonObject {
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("required".into(), json!(required));
    schema
}

/// Build the tool schema for one discovered command. Never fails.
pub fn synthesize(naming: &ToolNaming, info: &CommandInfo) -> ToolSchema {
    let mut properties = Map::new();

    properties.insert(
        "args".into(),
        json!({
            "type": "array",
            "items": {"type": "string"},
            "description": format!("Command arguments for '{}'", info.name),
        }),
    );

    let mut flag_props = Map::new();
    for flag in &info.flags {
        let key = normalize_flag_name(&flag.name);
        if key.is_empty() || RESERVED_PROPERTIES.contains(&key.as_str()) {
            debug!(command = %info.name, flag = %flag.name, "flag dropped: reserved name");
            continue;
        }
        if flag_props.contains_key(&key) {
            continue;
        }
        flag_props.insert(
            key,
            json!({"type": "string", "description": flag.description}),
        );
    }
    if !flag_props.is_empty() {
        properties.insert(
            FLAGS_PROPERTY.into(),
            json!({
                "type": "object",
                "description": "Common flags (will be converted to CLI arguments)",
                "properties": flag_props,
            }),
        );
    }

    if !info.subcommands.is_empty() {
        let names: Vec<&str> = info.subcommands.iter().map(|s| s.name.as_str()).collect();
        properties.insert(
            "subcommand".into(),
            json!({
                "type": "string",
                "enum": names,
                "description": "Subcommand to execute",
            }),
        );
    }

    properties.insert(
        "cwd".into(),
        json!({"type": "string", "description": "Working directory for the command"}),
    );
    let formats: Vec<&str> = OutputFormat::variants().iter().map(|f| f.as_str()).collect();
    properties.insert(
        "format".into(),
        json!({
            "type": "string",
            "enum": formats,
            "description": "Output format (if supported by the command)",
        }),
    );

    let mut description = info.description.clone();
    if !info.subcommands.is_empty() {
        let names: Vec<&str> = info.subcommands.iter().map(|s| s.name.as_str()).collect();
        description.push_str(&format!(". Subcommands: {}", names.join(", ")));
    }

    ToolSchema {
        name: naming.tool_name(&info.name),
        description,
        input_schema: object_schema(properties, &[]),
    }
}

pub fn reserved_schema(naming: &ToolNaming, tool: ReservedTool, program: &str) -> ToolSchema {
    let (description, properties, required): (String, Value, &[&str]) = match tool {
        ReservedTool::Raw => (
            format!("Execute any {program} command with full argument control"),
            json!({
                "args": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": format!("Complete command arguments (without '{program}')"),
                },
                "cwd": {"type": "string", "description": "Working directory"},
            }),
            &["args"][..],
        ),
        ReservedTool::Help => (
            format!("Get help for any {program} command or subcommand"),
            json!({
                "command": {
                    "type": "string",
                    "description": "Command to get help for (e.g., 'issue', 'mr create')",
                },
            }),
            &["command"][..],
        ),
        ReservedTool::Discover => (
            format!("Force re-discovery of available {program} commands (clears cache)"),
            json!({}),
            &[][..],
        ),
    };
    let properties = match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    ToolSchema {
        name: naming.reserved_name(tool),
        description,
        input_schema: object_schema(properties, required),
    }
}

/// Raw tool, every discovered command, then help and discover.
/// Commands whose tool name would shadow a reserved tool are left out.
pub fn catalog(naming: &ToolNaming, snapshot: &DiscoverySnapshot, program: &str) -> Vec<ToolSchema> {
    let mut tools = Vec::with_capacity(snapshot.len() + 3);
    tools.push(reserved_schema(naming, ReservedTool::Raw, program));
    for info in snapshot.commands.values() {
        let schema = synthesize(naming, info);
        if naming.reserved(&schema.name).is_some() {
            debug!(command = %info.name, "command shadowed by reserved tool");
            continue;
        }
        tools.push(schema);
    }
    tools.push(reserved_schema(naming, ReservedTool::Help, program));
    tools.push(reserved_schema(naming, ReservedTool::Discover, program));
    tools
}

/* ---- Tests ---- */
