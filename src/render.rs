//! Human-readable text for tool results.

use crate::dispatch::{DispatchError, Dispatched};
use crate::runner::CallResult;

struct Hint {
    needles: &'static [&'static str],
    text: &'static str,
}

const HINTS: &[Hint] = &[
    Hint {
        needles: &["401", "unauthorized", "authentication", "not logged in", "auth login"],
        text: "Authentication required. Run `{program} auth login` or check your token.",
    },
    Hint {
        needles: &["404", "not found"],
        text: "Resource not found. Check the project path, ID or branch name.",
    },
    Hint {
        needles: &["403", "forbidden", "permission denied"],
        text: "Permission denied. Your account may lack access to this resource.",
    },
    Hint {
        needles: &[
            "not a git repository",
            "no git remote",
            "could not determine",
            "none of the git remotes",
        ],
        text: "No repository context. Pass `cwd` pointing at a checkout, or name the repository explicitly.",
    },
];

/// Hints for a failure's stderr, each category at most once, in a fixed order.
pub fn hints(stderr: &str, program: &str) -> Vec<String> {
    let lower = stderr.to_lowercase();
    HINTS
        .iter()
        .filter(|h| h.needles.iter().any(|n| lower.contains(n)))
        .map(|h| h.text.replace("{program}", program))
        .collect()
}

fn fenced(label: &str, lang: &str, body: &str) -> String {
    format!("{label}:\n```{lang}\n{}\n```", body.trim_end())
}

pub fn render_result(result: &CallResult, program: &str) -> String {
    let mut parts = Vec::new();

    if result.succeeded {
        let stdout = result.stdout.raw();
        if let Some(data) = result.stdout.decoded() {
            parts.push("✔ Command executed successfully".to_string());
            let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| stdout.to_string());
            parts.push(fenced("JSON Output", "json", &pretty));
        } else if !stdout.trim().is_empty() {
            parts.push("✔ Command executed successfully".to_string());
            parts.push(fenced("Output", "", stdout));
        } else {
            parts.push("✔ Command executed successfully (no output)".to_string());
        }
        if !result.stderr.trim().is_empty() {
            parts.push(fenced("Warnings/Info", "", &result.stderr));
        }
        return parts.join("\n\n");
    }

    parts.push(format!("✖ Command failed (exit code {})", result.exit_code));
    if !result.stderr.trim().is_empty() && result.diagnostic.as_deref() != Some(result.stderr.as_str()) {
        parts.push(fenced("Error", "", &result.stderr));
    }
    if !result.stdout.raw().trim().is_empty() {
        parts.push(fenced("Output", "", result.stdout.raw()));
    }
    if let Some(diagnostic) = &result.diagnostic {
        parts.push(format!("Exception: {diagnostic}"));
    }
    let hints = hints(&result.stderr, program);
    if !hints.is_empty() {
        let lines: Vec<String> = hints.iter().map(|h| format!("- {h}")).collect();
        parts.push(format!("Hints:\n{}", lines.join("\n")));
    }
    parts.join("\n\n")
}

pub fn render(outcome: &Dispatched, program: &str, help_tool: &str) -> String {
    match outcome {
        Dispatched::Completed(result) => render_result(result, program),
        Dispatched::Rediscovered { commands } => format!(
            "✔ {program} commands re-discovered ({commands} found). Use {help_tool} to see available commands."
        ),
        Dispatched::RediscoveryFailed(result) => {
            let mut text = format!(
                "✖ {program} command re-discovery failed (exit code {}); the previous command list is kept.",
                result.exit_code
            );
            let detail = result.text().trim();
            if !detail.is_empty() {
                text.push_str("\n\n");
                text.push_str(&fenced("Error", "", detail));
            }
            text
        }
    }
}

pub fn render_error(tool: &str, err: &DispatchError) -> String {
    format!("✖ Error executing {tool}: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_with_json_data() {
        let result = CallResult::from_exit(Some(0), "[{\"iid\":1}]".into(), String::new());
        let text = render_result(&result, "glab");
        assert!(text.starts_with("✔ Command executed successfully\n\nJSON Output:\n```json\n"));
        assert!(text.contains("\"iid\": 1"));
        assert!(!text.contains("Warnings"));
    }

    #[test]
    fn success_with_text_and_stderr() {
        let result = CallResult::from_exit(Some(0), "Logged in\n".into(), "token expires soon".into());
        let text = render_result(&result, "glab");
        assert_eq!(
            text,
            "✔ Command executed successfully\n\nOutput:\n```\nLogged in\n```\n\nWarnings/Info:\n```\ntoken expires soon\n```"
        );
    }

    #[test]
    fn success_without_output() {
        let result = CallResult::from_exit(Some(0), String::new(), String::new());
        assert_eq!(
            render_result(&result, "glab"),
            "✔ Command executed successfully (no output)"
        );
    }

    #[test]
    fn failure_includes_auth_hint() {
        let result = CallResult::from_exit(Some(1), String::new(), "HTTP 401 Unauthorized".into());
        let text = render_result(&result, "glab");
        assert!(text.starts_with("✖ Command failed (exit code 1)"));
        assert!(text.contains("Error:\n```\nHTTP 401 Unauthorized\n```"));
        assert!(text.contains("glab auth login"));
    }

    #[test]
    fn each_hint_category_once() {
        let found = hints(
            "401 unauthorized; not logged in. 404 Not Found. fatal: not a git repository",
            "glab",
        );
        assert_eq!(found.len(), 3);
        assert!(found[0].starts_with("Authentication"));
        assert!(found[1].starts_with("Resource not found"));
        assert!(found[2].starts_with("No repository context"));
    }

    #[test]
    fn no_hints_for_unrelated_errors() {
        assert!(hints("something else broke", "glab").is_empty());
    }

    #[test]
    fn start_failure_shows_diagnostic_once() {
        let result = CallResult::start_failure("failed to start `glab`: No such file");
        let text = render_result(&result, "glab");
        assert!(text.starts_with("✖ Command failed (exit code -1)"));
        assert_eq!(text.matches("No such file").count(), 1);
        assert!(text.contains("Exception: failed to start"));
    }

    #[test]
    fn rediscovery_and_errors() {
        let text = render(&Dispatched::Rediscovered { commands: 4 }, "glab", "glab_help");
        assert!(text.contains("(4 found)"));
        assert!(text.contains("glab_help"));
        let err = render_error("glab_x", &DispatchError::UnknownTool("glab_x".into()));
        assert_eq!(err, "✖ Error executing glab_x: Unknown tool: glab_x");
    }

    #[test]
    fn failed_rediscovery_is_not_reported_as_success() {
        let failed = CallResult::from_exit(Some(1), String::new(), "dial tcp: refused".into());
        let outcome = Dispatched::RediscoveryFailed(failed);
        let text = render(&outcome, "glab", "glab_help");
        assert!(text.starts_with("✖ glab command re-discovery failed (exit code 1)"));
        assert!(text.contains("Error:\n```\ndial tcp: refused\n```"));
        assert!(!text.contains("found"));
    }
}
