/*!
help.rs - help-text parser.

Turns the wrapped CLI's own `--help` output into structured metadata:
  - parse_top_level      : command names listed in the top-level help
  - parse_command_help   : CommandInfo (description, usage, flags, subcommands)

Tolerated layouts:
  cobra style        gh / glab style
  -----------        ---------------
  Available Commands:    CORE COMMANDS
    list   List issues     list:  List issues
  Flags:                 FLAGS
    -a, --all  ...         --all   ...

The heuristics are approximate by nature: an unanticipated layout yields a
thinner CommandInfo, never an error.
*/

use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

/* ---- Data Structures ---- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagInfo {
    /// As written in the help text, e.g. `--assignee` or `-R`.
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcommandInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    pub usage: String,
    pub flags: Vec<FlagInfo>,
    pub subcommands: Vec<SubcommandInfo>,
}

impl CommandInfo {
    /// Minimal metadata for a command whose help could not be obtained or read.
    pub fn fallback(program: &str, command: &str) -> Self {
        CommandInfo {
            name: command.to_string(),
            description: fallback_description(program, command),
            usage: fallback_usage(program, command),
            flags: Vec::new(),
            subcommands: Vec::new(),
        }
    }
}

fn fallback_description(program: &str, command: &str) -> String {
    format!("Execute {program} {command} command")
}

fn fallback_usage(program: &str, command: &str) -> String {
    format!("{program} {command}")
}

/* ---- Patterns ---- */

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("static regex must compile")
});

/// `name  description` or `name: description`.
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][\w.-]*)(?::\s*|\s+)(\S.*)$").expect("static regex must compile")
});

/// Usage tokens some CLIs put between the name and the description.
static LEADING_USAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:\[[^\]]*\]|<[^>]*>)\s*)+").expect("static regex must compile")
});

static FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s+(?:(?P<short>-[A-Za-z0-9?])(?:,\s*|\s+|=|$))?(?P<long>--[A-Za-z0-9][\w.-]*)?(?P<rest>.*)$",
    )
    .expect("static regex must compile")
});

/// ` strings   Filter by ...`: a value-type token right after the flag,
/// separated from the description by a wider gap.
static VALUE_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ \S+\s{2,}").expect("static regex must compile"));

static TYPE_ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[[\w\s,|.-]+\]").expect("static regex must compile"));

/* ---- Section Headers ---- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    Commands,
    Flags,
    Usage,
    Examples,
    Other,
}

/// A section header is a non-indented, short line that ends with `:` or is
/// written in capitals.
fn section_header(line: &str) -> Option<Header> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let trimmed = line.trim();
    let (text, has_colon) = match trimmed.strip_suffix(':') {
        Some(t) => (t.trim(), true),
        None => (trimmed, false),
    };
    if text.is_empty() || text.split_whitespace().count() > 4 {
        return None;
    }
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    let all_caps = letters.peek().is_some() && letters.all(|c| c.is_uppercase());
    if !has_colon && !all_caps {
        return None;
    }

    let name = text.to_lowercase();
    let header = if name.ends_with("commands") {
        Header::Commands
    } else if name == "flags"
        || name == "options"
        || name.ends_with(" flags")
        || name.ends_with(" options")
    {
        Header::Flags
    } else if name == "usage" {
        Header::Usage
    } else if name.starts_with("example") {
        Header::Examples
    } else {
        Header::Other
    };
    Some(header)
}

fn is_usage_hint(trimmed: &str) -> bool {
    trimmed.starts_with("Use \"")
}

/// Remove ANSI escape sequences (colored help output, styled tables).
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_RE.replace_all(text, "")
}

fn normalize(raw: &str) -> String {
    strip_ansi(raw).replace("\r\n", "\n")
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn strip_leading_usage(text: &str) -> &str {
    match LEADING_USAGE_RE.find(text) {
        Some(m) => text[m.end()..].trim_start(),
        None => text,
    }
}

/* ---- Parser ---- */

#[derive(Debug, Clone)]
pub struct HelpParser {
    program: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Flags,
    Subcommands,
}

impl HelpParser {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command names from the top-level help, in listing order, without duplicates.
    pub fn parse_top_level(&self, raw_help: &str) -> Vec<String> {
        let text = normalize(raw_help);
        let mut names: Vec<String> = Vec::new();
        let mut in_commands = false;

        for line in text.lines() {
            let trimmed = line.trim();

            if let Some(header) = section_header(line) {
                in_commands = header == Header::Commands;
                continue;
            }
            if !in_commands || trimmed.is_empty() {
                continue;
            }
            if is_usage_hint(trimmed) {
                in_commands = false;
                continue;
            }
            if trimmed.starts_with('-') {
                continue;
            }
            if let Some(caps) = ENTRY_RE.captures(trimmed) {
                let name = caps[1].to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        debug!(count = names.len(), "parsed top-level commands");
        names
    }

    /// Full metadata for one command. Never fails; missing pieces fall back
    /// to generic text.
    pub fn parse_command_help(&self, command: &str, raw_help: &str) -> CommandInfo {
        let text = normalize(raw_help);
        let command_lower = command.to_lowercase();

        let mut description = String::new();
        let mut usage = String::new();
        let mut usage_pending = false;
        let mut flags: Vec<FlagInfo> = Vec::new();
        let mut subcommands: Vec<SubcommandInfo> = Vec::new();
        let mut section = Section::None;
        let mut row_indent: Option<usize> = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            // A header right after a bare `Usage:` means the usage line is missing.
            if usage_pending {
                usage_pending = false;
                if section_header(line).is_none() {
                    usage = trimmed.to_string();
                    continue;
                }
            }

            if let Some(rest) = trimmed.strip_prefix("Usage:") {
                let rest = rest.trim();
                if rest.is_empty() {
                    usage_pending = usage.is_empty();
                } else if usage.is_empty() {
                    usage = rest.to_string();
                }
                section = Section::None;
                continue;
            }

            if let Some(header) = section_header(line) {
                section = match header {
                    Header::Flags => Section::Flags,
                    Header::Commands => Section::Subcommands,
                    Header::Usage => {
                        usage_pending = usage.is_empty();
                        Section::None
                    }
                    Header::Examples | Header::Other => Section::None,
                };
                row_indent = None;
                continue;
            }

            if is_usage_hint(trimmed) {
                section = Section::None;
                continue;
            }

            match section {
                Section::None => {
                    if description.is_empty() && !trimmed.starts_with('-') {
                        let lower = trimmed.to_lowercase();
                        if lower.contains(&command_lower) || lower.contains("command") {
                            description = trimmed.to_string();
                        }
                    }
                }
                Section::Flags => {
                    if let Some(flag) = parse_flag_line(line) {
                        flags.push(flag);
                    }
                }
                Section::Subcommands => {
                    let indent = indent_of(line);
                    if indent == 0 {
                        continue;
                    }
                    // Deeper-indented lines continue the previous row's description.
                    match row_indent {
                        Some(first) if indent > first => continue,
                        None => row_indent = Some(indent),
                        _ => {}
                    }
                    if let Some(sub) = parse_subcommand_line(trimmed)
                        && !subcommands.iter().any(|s| s.name == sub.name)
                    {
                        subcommands.push(sub);
                    }
                }
            }
        }

        debug!(
            command,
            flags = flags.len(),
            subcommands = subcommands.len(),
            "parsed command help"
        );

        CommandInfo {
            name: command.to_string(),
            description: if description.is_empty() {
                fallback_description(&self.program, command)
            } else {
                description
            },
            usage: if usage.is_empty() {
                fallback_usage(&self.program, command)
            } else {
                usage
            },
            flags,
            subcommands,
        }
    }
}

fn parse_flag_line(line: &str) -> Option<FlagInfo> {
    let caps = FLAG_RE.captures(line)?;
    let short = caps.name("short").map(|m| m.as_str());
    let long = caps.name("long").map(|m| m.as_str());
    let name = long.or(short)?;
    let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");

    let rest = if let Some(attached) = rest.strip_prefix('=') {
        // `--limit=int  description`
        attached
            .split_once(char::is_whitespace)
            .map(|(_, d)| d)
            .unwrap_or("")
    } else if let Some(m) = VALUE_TYPE_RE.find(rest)
        && !rest[m.end()..].trim().is_empty()
    {
        &rest[m.end()..]
    } else {
        rest
    };

    let description = TYPE_ANNOTATION_RE.replace_all(rest, "");
    Some(FlagInfo {
        name: name.to_string(),
        description: description.trim().to_string(),
    })
}

fn parse_subcommand_line(trimmed: &str) -> Option<SubcommandInfo> {
    if trimmed.starts_with('-') {
        return None;
    }
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (trimmed, ""),
    };
    let name = head.trim_end_matches(':');
    if name.is_empty() {
        return None;
    }
    let description = strip_leading_usage(rest)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some(SubcommandInfo {
        name: name.to_string(),
        description,
    })
}

/* ---- Tests ---- */
