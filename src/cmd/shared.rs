/*!
shared.rs - helpers used by several subcommands.

  - runtime                      : Tokio runtime for the synchronous entry points
  - param_rows                   : flattened parameter view of a tool schema
  - build_arguments_from_schema  : KEY=VALUE strings -> JSON arguments (schema-coerced)
  - coerce_value                 : primitive coercion by JSON-schema type
  - load_param_file_into_map     : JSON / YAML parameter files
  - output_error                 : uniform error output (JSON or boxed)
*/

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use mcp_cliwrap::schema::{FLAGS_PROPERTY, JsonObject, ToolSchema};

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")
}

/* ---- Schema views ---- */

#[derive(Debug, Clone, PartialEq)]
pub struct ParamRow {
    pub name: String,
    pub kind: String,
    pub required: bool,
    pub description: String,
}

fn type_of(prop: &Value) -> &str {
    prop.get("type").and_then(Value::as_str).unwrap_or("string")
}

fn required_of(schema: &ToolSchema) -> Vec<&str> {
    schema
        .input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Top-level properties, with each flag of the flag map as its own
/// `common_flags.<name>` row.
pub fn param_rows(schema: &ToolSchema) -> Vec<ParamRow> {
    let required = required_of(schema);
    let mut rows = Vec::new();
    let Some(props) = schema.properties() else {
        return rows;
    };
    for (name, prop) in props {
        let mut description = prop
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(choices) = prop.get("enum").and_then(Value::as_array) {
            let choices: Vec<&str> = choices.iter().filter_map(Value::as_str).collect();
            description = format!("{description} [{}]", choices.join("|")).trim().to_string();
        }
        rows.push(ParamRow {
            name: name.clone(),
            kind: type_of(prop).to_string(),
            required: required.contains(&name.as_str()),
            description,
        });
        if name == FLAGS_PROPERTY
            && let Some(flags) = prop.get("properties").and_then(Value::as_object)
        {
            for (flag, flag_prop) in flags {
                rows.push(ParamRow {
                    name: format!("{FLAGS_PROPERTY}.{flag}"),
                    kind: type_of(flag_prop).to_string(),
                    required: false,
                    description: flag_prop
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                });
            }
        }
    }
    rows
}

/* ---- Argument building ---- */

/// Build the JSON arguments for a call from raw `KEY=VALUE` strings.
///
/// - Values are coerced by the declared property type
///   (integer | number | boolean | array | string).
/// - `common_flags.<name>` keys are collected into the flag map.
/// - Keys the schema does not know are passed through as strings.
/// - A missing required property is an error.
pub fn build_arguments_from_schema(
    schema: &ToolSchema,
    provided: &HashMap<String, String>,
) -> Result<JsonObject> {
    let mut remaining = provided.clone();
    let mut result = Map::new();

    let mut flags = Map::new();
    let prefix = format!("{FLAGS_PROPERTY}.");
    let mut flag_keys: Vec<String> = remaining
        .keys()
        .filter(|k| k.starts_with(&prefix))
        .cloned()
        .collect();
    flag_keys.sort();
    let flag_props = schema
        .properties()
        .and_then(|p| p.get(FLAGS_PROPERTY))
        .and_then(|f| f.get("properties"));
    for key in flag_keys {
        let Some(raw) = remaining.remove(&key) else {
            continue;
        };
        let name = &key[prefix.len()..];
        if name.is_empty() {
            bail!("invalid parameter '{key}': missing flag name");
        }
        let kind = flag_props.and_then(|p| p.get(name)).map(type_of).unwrap_or("string");
        flags.insert(name.to_string(), coerce_value(&raw, kind));
    }

    let required = required_of(schema);
    if let Some(props) = schema.properties() {
        for (name, prop) in props {
            if name == FLAGS_PROPERTY {
                if !flags.is_empty() {
                    result.insert(name.clone(), Value::Object(std::mem::take(&mut flags)));
                }
                continue;
            }
            if let Some(raw) = remaining.remove(name) {
                result.insert(name.clone(), coerce_value(&raw, type_of(prop)));
            } else if required.contains(&name.as_str()) {
                bail!("missing required parameter: {name}");
            }
        }
    }
    if !flags.is_empty() {
        result.insert(FLAGS_PROPERTY.to_string(), Value::Object(flags));
    }

    let mut leftovers: Vec<(String, String)> = remaining.into_iter().collect();
    leftovers.sort();
    for (k, v) in leftovers {
        result.insert(k, Value::String(v));
    }
    Ok(result)
}

/// Coerce a raw string by JSON-schema type; anything that does not parse stays a string.
pub fn coerce_value(raw: &str, type_hint: &str) -> Value {
    match type_hint {
        "integer" => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        "number" => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        "boolean" => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Value::Bool(true),
            "false" | "0" | "no" | "n" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        "array" => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        _ => Value::String(raw.to_string()),
    }
}

/* ---- Parameter files ---- */

/// Merge a JSON or YAML object into `provided`. Keys already present
/// (from the command line) win. Nested objects are flattened one level
/// (`common_flags: {repo: x}` -> `common_flags.repo=x`), arrays are joined
/// with commas.
pub fn load_param_file_into_map(path: &str, provided: &mut HashMap<String, String>) -> Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read param file: {path}"))?;
    let lower = path.to_ascii_lowercase();

    let value: Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml: serde_yaml::Value = serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml).context("failed to convert YAML to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    let obj = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("param file root must be an object"))?;

    let mut insert = |key: String, v: &Value| {
        provided.entry(key).or_insert_with(|| scalar_text(v));
    };
    for (k, v) in obj {
        match v {
            Value::Object(inner) => {
                for (ik, iv) in inner {
                    insert(format!("{k}.{ik}"), iv);
                }
            }
            other => insert(k.clone(), other),
        }
    }
    Ok(())
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/* ---- Output ---- */

/// Print an error in the selected mode and return it as `Err`.
pub fn output_error(json: bool, title: &str, msg: &str) -> Result<()> {
    if json {
        let err = serde_json::json!({"status": "error", "error": msg});
        println!(
            "{}",
            serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
        );
    } else {
        let style = StyleOptions::detect();
        let heading = format!("{} {title}", emoji("error", &style));
        println!("{}", box_header(heading, Some(color(Role::Error, msg, &style)), &style));
    }
    bail!(msg.to_string())
}

/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;
    use mcp_cliwrap::help::{CommandInfo, FlagInfo};
    use mcp_cliwrap::schema::{ReservedTool, ToolNaming, reserved_schema, synthesize};
    use serde_json::json;

    fn issue_schema() -> ToolSchema {
        let mut info = CommandInfo::fallback("glab", "issue");
        info.flags = vec![
            FlagInfo {
                name: "--per-page".into(),
                description: "Items per page".into(),
            },
            FlagInfo {
                name: "--repo".into(),
                description: "Repository".into(),
            },
        ];
        synthesize(&ToolNaming::new("glab"), &info)
    }

    fn provided(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn coerce_primitives() {
        assert_eq!(coerce_value("42", "integer"), json!(42));
        assert_eq!(coerce_value("x42", "integer"), json!("x42"));
        assert_eq!(coerce_value("No", "boolean"), json!(false));
        assert_eq!(coerce_value("a, b,,c", "array"), json!(["a", "b", "c"]));
        assert_eq!(coerce_value("1.5", "number"), json!(1.5));
    }

    #[test]
    fn arguments_with_flags_and_array() {
        let args = build_arguments_from_schema(
            &issue_schema(),
            &provided(&[
                ("args", "list,--mine"),
                ("format", "json"),
                ("common_flags.per_page", "5"),
                ("common_flags.label", "bug"),
            ]),
        )
        .unwrap();
        assert_eq!(args["args"], json!(["list", "--mine"]));
        assert_eq!(args["format"], json!("json"));
        let flags = args[FLAGS_PROPERTY].as_object().unwrap();
        let keys: Vec<&str> = flags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["label", "per_page"]);
        assert_eq!(flags["per_page"], json!("5"));
        assert_eq!(flags["label"], json!("bug"));
    }

    #[test]
    fn missing_required_is_an_error() {
        let raw = reserved_schema(&ToolNaming::new("glab"), ReservedTool::Raw, "glab");
        let err = build_arguments_from_schema(&raw, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: args"));
    }

    #[test]
    fn unknown_keys_pass_through() {
        let args = build_arguments_from_schema(&issue_schema(), &provided(&[("extra", "1")])).unwrap();
        assert_eq!(args["extra"], json!("1"));
    }

    #[test]
    fn param_rows_expand_flags() {
        let rows = param_rows(&issue_schema());
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "args",
                "common_flags",
                "common_flags.per_page",
                "common_flags.repo",
                "cwd",
                "format"
            ]
        );
        let format = rows.iter().find(|r| r.name == "format").unwrap();
        assert!(format.description.ends_with("[json|table|text]"));
    }

    #[test]
    fn param_file_yaml_merge() {
        let path = std::env::temp_dir().join(format!("mcp_cliwrap_params_{}.yaml", std::process::id()));
        std::fs::write(&path, "args: [issue, list]\ncwd: /tmp\ncommon_flags:\n  repo: a/b\n").unwrap();
        let mut map = provided(&[("cwd", "/srv")]);
        load_param_file_into_map(path.to_str().unwrap(), &mut map).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(map["args"], "issue,list");
        assert_eq!(map["cwd"], "/srv");
        assert_eq!(map["common_flags.repo"], "a/b");
    }
}
