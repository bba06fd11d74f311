/*!
runner.rs - process execution for the wrapped CLI.

Focus:
  - CommandRunner: async seam used by discovery and dispatch
  - ProcessRunner: tokio::process implementation (`<program> <base args> <argv>`)
  - CallResult / Output: captured process outcome, with best-effort
    structured decoding of stdout

Ordinary failure (non-zero exit) is a value, not an error. Only a process
that cannot be started yields `exit_code = -1` plus a diagnostic, and even
that is reported through `CallResult` rather than `Err`.
*/

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::target::TargetSpec;

/* ---- Output ---- */

/// Captured stdout: either plain text or text that decoded into a structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    RawText(String),
    Decoded { raw: String, value: Value },
}

impl Output {
    /// Classify stdout. Decoding is only attempted for successful runs whose
    /// trimmed output opens with `[` or `{`.
    pub fn from_stdout(stdout: String, succeeded: bool) -> Self {
        if !succeeded {
            return Output::RawText(stdout);
        }
        match decode_structured(&stdout) {
            Some(value) => Output::Decoded { raw: stdout, value },
            None => Output::RawText(stdout),
        }
    }

    /// The captured text, regardless of decoding.
    pub fn raw(&self) -> &str {
        match self {
            Output::RawText(raw) | Output::Decoded { raw, .. } => raw,
        }
    }

    pub fn decoded(&self) -> Option<&Value> {
        match self {
            Output::RawText(_) => None,
            Output::Decoded { value, .. } => Some(value),
        }
    }
}

/// JSON first, then YAML flow style (a JSON superset some CLIs emit).
fn decode_structured(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(trimmed).ok()?;
    match serde_json::to_value(yaml) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("structured stdout not representable as JSON: {e}");
            None
        }
    }
}

/* ---- CallResult ---- */

#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    pub exit_code: i32,
    pub stdout: Output,
    pub stderr: String,
    pub succeeded: bool,
    /// Populated only when the process could not be started.
    pub diagnostic: Option<String>,
}

impl CallResult {
    /// Build from a finished process. A missing exit code (terminated by signal)
    /// is reported as -1.
    pub fn from_exit(code: Option<i32>, stdout: String, stderr: String) -> Self {
        let exit_code = code.unwrap_or(-1);
        let succeeded = exit_code == 0;
        CallResult {
            exit_code,
            stdout: Output::from_stdout(stdout, succeeded),
            stderr,
            succeeded,
            diagnostic: None,
        }
    }

    pub fn start_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        CallResult {
            exit_code: -1,
            stdout: Output::RawText(String::new()),
            stderr: message.clone(),
            succeeded: false,
            diagnostic: Some(message),
        }
    }

    /// Help-style text: stdout, or stderr when stdout is blank (some CLIs
    /// print usage to stderr).
    pub fn text(&self) -> &str {
        let out = self.stdout.raw();
        if out.trim().is_empty() {
            &self.stderr
        } else {
            out
        }
    }

    /// Machine-readable view used by `exec --json`.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "succeeded": self.succeeded,
            "exit_code": self.exit_code,
            "stdout": self.stdout.raw(),
            "stderr": self.stderr,
            "data": self.stdout.decoded(),
            "diagnostic": self.diagnostic,
        })
    }
}

/* ---- Runner ---- */

/// Executes the wrapped CLI. Implementations must not panic or return early
/// on process failure; every outcome is a `CallResult`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Display name of the wrapped program (used in messages and fallbacks).
    fn program(&self) -> &str;

    async fn execute(&self, argv: &[String], cwd: Option<&str>) -> CallResult;
}

/// Spawns the real target with `tokio::process`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    target: TargetSpec,
}

impl ProcessRunner {
    pub fn new(target: TargetSpec) -> Self {
        Self { target }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn program(&self) -> &str {
        self.target.display_name()
    }

    async fn execute(&self, argv: &[String], cwd: Option<&str>) -> CallResult {
        let cwd = cwd.filter(|c| !c.trim().is_empty());
        info!(target_cli = %self.target, argv = %argv.join(" "), cwd = ?cwd, "running command");

        let mut cmd = Command::new(&self.target.program);
        cmd.args(&self.target.args)
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        match cmd.output().await {
            Ok(out) => {
                let result = CallResult::from_exit(
                    out.status.code(),
                    String::from_utf8_lossy(&out.stdout).into_owned(),
                    String::from_utf8_lossy(&out.stderr).into_owned(),
                );
                debug!(exit_code = result.exit_code, "command finished");
                result
            }
            Err(e) => {
                error!("failed to start {}: {e}", self.target.program);
                CallResult::start_failure(format!(
                    "failed to start `{}`: {e}",
                    self.target.program
                ))
            }
        }
    }
}

/* ---- Test support ---- */


/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::parse_target;
    use serde_json::json;

    #[test]
    fn json_stdout_is_decoded() {
        let out = Output::from_stdout("  [{\"iid\": 1}]\n".into(), true);
        assert_eq!(out.decoded(), Some(&json!([{"iid": 1}])));
        assert_eq!(out.raw(), "  [{\"iid\": 1}]\n");
    }

    #[test]
    fn plain_stdout_stays_text() {
        let out = Output::from_stdout("Logged in".into(), true);
        assert_eq!(out, Output::RawText("Logged in".into()));
    }

    #[test]
    fn broken_json_is_kept_as_text() {
        let out = Output::from_stdout("{\"a\": ".into(), true);
        assert!(out.decoded().is_none());
        assert_eq!(out.raw(), "{\"a\": ");
    }

    #[test]
    fn yaml_flow_style_is_decoded() {
        let out = Output::from_stdout("{name: demo, count: 2}".into(), true);
        assert_eq!(out.decoded(), Some(&json!({"name": "demo", "count": 2})));
    }

    #[test]
    fn failed_runs_are_never_decoded() {
        let result = CallResult::from_exit(Some(2), "{\"a\":1}".into(), "boom".into());
        assert!(!result.succeeded);
        assert!(result.stdout.decoded().is_none());
        assert_eq!(result.exit_code, 2);
    }

    #[test]
    fn signal_exit_maps_to_minus_one() {
        let result = CallResult::from_exit(None, String::new(), String::new());
        assert_eq!(result.exit_code, -1);
        assert!(!result.succeeded);
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn text_falls_back_to_stderr() {
        let result = CallResult::from_exit(Some(0), "  \n".into(), "Usage: x".into());
        assert_eq!(result.text(), "Usage: x");
    }

    #[tokio::test]
    async fn missing_executable_is_a_failed_result() {
        let runner = ProcessRunner::new(parse_target("definitely-not-a-real-binary-4711").unwrap());
        let result = runner.execute(&["--help".to_string()], None).await;
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, -1);
        assert!(result.diagnostic.is_some());
        assert!(result.stderr.contains("definitely-not-a-real-binary-4711"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn base_args_and_cwd_are_applied() {
        let runner = ProcessRunner::new(parse_target("sh -c").unwrap());
        let dir = std::env::temp_dir();
        let result = runner
            .execute(&["pwd".to_string()], dir.to_str())
            .await;
        assert!(result.succeeded, "stderr: {}", result.stderr);
        let printed = std::path::PathBuf::from(result.stdout.raw().trim());
        assert_eq!(
            printed.canonicalize().unwrap(),
            dir.canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let runner = ProcessRunner::new(parse_target("sh -c").unwrap());
        let result = runner
            .execute(&["echo nope >&2; exit 3".to_string()], None)
            .await;
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stderr.trim(), "nope");
        assert!(result.diagnostic.is_none());
    }
}
