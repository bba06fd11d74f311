/*!
format.rs - terminal formatting for the human-readable output paths.

  - StyleOptions::detect()   NO_COLOR / NO_EMOJI / COLUMNS
  - color / emoji
  - box_header(title, subtitle)
  - table(headers, rows)     widest columns shrink first when over width
  - truncate_ellipsis

JSON output paths never go through here.
*/

use mcp_cliwrap::help::strip_ansi;

/* ---- Style ---- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl StyleOptions {
    pub fn detect() -> Self {
        let term_width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        Self {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width,
        }
    }

    #[cfg(test)]
    pub fn plain(term_width: usize) -> Self {
        Self {
            use_color: false,
            use_emoji: false,
            term_width,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "info" => "ℹ",
        "tool" => "🛠",
        "list" => "📜",
        _ => "",
    }
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/* ---- Box header ---- */

/// One-line boxed title. Content longer than the terminal is truncated.
pub fn box_header(title: impl AsRef<str>, subtitle: Option<impl AsRef<str>>, style: &StyleOptions) -> String {
    let title = color(Role::Primary, title.as_ref().trim(), style);
    let inner = match subtitle {
        Some(sub) => format!("{title}  {}", color(Role::Secondary, sub.as_ref(), style)),
        None => title,
    };

    let max_inner = style.term_width.saturating_sub(4).max(10);
    let inner = if display_width(&inner) > max_inner {
        truncate_ellipsis(&strip_ansi(&inner), max_inner)
    } else {
        inner
    };
    let width = display_width(&inner) + 2;
    let bar = "─".repeat(width);
    format!("┌{bar}┐\n│ {inner} │\n└{bar}┘")
}

/* ---- Table ---- */

pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let gaps = (cols - 1) * 2;
    let mut total: usize = widths.iter().sum::<usize>() + gaps;
    while total > style.term_width {
        let Some((widest, w)) = widths.iter().copied().enumerate().max_by_key(|(_, w)| *w) else {
            break;
        };
        if w <= 4 {
            break;
        }
        widths[widest] -= 1;
        total -= 1;
    }

    let header_cells: Vec<&str> = headers.to_vec();
    let mut out = vec![color(Role::Accent, render_row(&widths, &header_cells), style)];
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push(color(Role::Dim, sep.join("  "), style));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push(render_row(&widths, &cells));
    }
    out.join("\n")
}

fn render_row(widths: &[usize], cells: &[&str]) -> String {
    let line: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let cell = truncate_ellipsis(cells.get(i).copied().unwrap_or(""), *w);
            let pad = w.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    line.join("  ").trim_end().to_string()
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_contains_title_and_subtitle() {
        let style = StyleOptions::plain(80);
        let b = box_header("Tools (3)", Some("program=glab"), &style);
        let lines: Vec<&str> = b.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "│ Tools (3)  program=glab │");
        assert_eq!(lines[0].chars().count(), lines[1].chars().count());
    }

    #[test]
    fn table_aligns_columns() {
        let style = StyleOptions::plain(80);
        let t = table(
            &["NAME", "TYPE"],
            &[
                vec!["args".into(), "array".into()],
                vec!["common_flags".into(), "object".into()],
            ],
            &style,
        );
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "NAME          TYPE");
        assert_eq!(lines[2], "args          array");
        assert_eq!(lines[3], "common_flags  object");
    }

    #[test]
    fn table_shrinks_widest_column() {
        let style = StyleOptions::plain(40);
        let long = "x".repeat(100);
        let t = table(&["A", "B"], &[vec!["a".into(), long]], &style);
        assert!(t.lines().all(|l| l.chars().count() <= 40));
        assert!(t.contains('…'));
    }

    #[test]
    fn truncate() {
        assert_eq!(truncate_ellipsis("abcdef", 4), "abc…");
        assert_eq!(truncate_ellipsis("abc", 4), "abc");
    }

    #[test]
    fn plain_style_has_no_escapes() {
        let style = StyleOptions::plain(80);
        assert_eq!(color(Role::Error, "x", &style), "x");
        assert_eq!(emoji("success", &style), "");
    }
}
