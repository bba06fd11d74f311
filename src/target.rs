//! Target parsing (the wrapped CLI program + fixed leading arguments).
//!
//! parse_target -> TargetSpec { program, args }
//! Every invocation of the wrapped tool is `<program> <args...> <call argv...>`,
//! which lets a target like `sh ./fake-cli.sh` or `docker compose` stand in for
//! a single executable.
//!
use anyhow::{Context, Result, bail};
use shell_words::split as shell_split;
use std::fmt;
use std::path::Path;

/// A parsed representation of a user-supplied target string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl TargetSpec {
    /// Short human name for the wrapped tool: the program's file stem
    /// (`/usr/local/bin/glab` -> `glab`).
    pub fn display_name(&self) -> &str {
        Path::new(&self.program)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.program)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.program)
        } else {
            write!(f, "{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Parse a `--program` value into a structured `TargetSpec`.
///
/// The value is split with shell-style rules; the first token is the program,
/// the rest are prepended to every invocation.
///
/// Examples:
/// - "glab" -> program `glab`, no args
/// - "sh ./fake cli.sh" (quoted) -> program `sh`, args `["./fake cli.sh"]`
pub fn parse_target(raw: &str) -> Result<TargetSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Target program is empty");
    }

    let parts =
        shell_split(trimmed).context("Failed to parse target command line (shell splitting)")?;
    let Some((program, args)) = parts.split_first() else {
        bail!("No tokens produced when parsing target command line");
    };
    if program.is_empty() {
        bail!("Empty program name in target command line");
    }

    Ok(TargetSpec {
        program: program.clone(),
        args: args.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_program() {
        let spec = parse_target("glab").unwrap();
        assert_eq!(spec.program, "glab");
        assert!(spec.args.is_empty());
        assert_eq!(spec.to_string(), "glab");
    }

    #[test]
    fn parse_program_with_base_args() {
        let spec = parse_target(r#"sh "/tmp/my dir/cli.sh""#).unwrap();
        assert_eq!(spec.program, "sh");
        assert_eq!(spec.args, vec!["/tmp/my dir/cli.sh"]);
    }

    #[test]
    fn display_name_uses_file_stem() {
        let spec = parse_target("/usr/local/bin/glab").unwrap();
        assert_eq!(spec.display_name(), "glab");
        let spec = parse_target("./tools/gh.exe").unwrap();
        assert_eq!(spec.display_name(), "gh");
    }

    #[test]
    fn empty_target_rejected() {
        let err = parse_target("   ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn unbalanced_quotes_rejected() {
        assert!(parse_target(r#"sh "unterminated"#).is_err());
    }
}
