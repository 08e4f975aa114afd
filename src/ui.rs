//! Terminal output: box-drawn tables and the status items a host editor
//! would show in its status bar.

use colored::*;
use console::{measure_text_width, truncate_str};
use std::path::Path;

use crate::session::{Availability, SessionState};

/// Narrowest a column is shrunk to when the terminal is too small.
const MIN_COLUMN_WIDTH: usize = 8;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn print(&self) {
        let (_, width) = console::Term::stdout().size();
        print!("{}", self.render(width as usize));
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(measure_text_width(&flatten(cell)));
            }
        }

        let overhead = 3 + 3 * widths.len();
        let available = max_width.saturating_sub(overhead);
        let mut total: usize = widths.iter().sum();
        while total > available {
            let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if widest <= MIN_COLUMN_WIDTH {
                break;
            }
            widths[idx] -= 1;
            total -= 1;
        }
        widths
    }

    /// The table as text, fitted to `max_width` columns where possible.
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.column_widths(max_width);
        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, segments.join(mid), right)
        };
        let line = |cells: Vec<String>| {
            let mut out = String::from("  │");
            for (cell, width) in cells.iter().zip(&widths) {
                let shown = truncate_str(cell, *width, "...");
                let padding = width.saturating_sub(measure_text_width(&shown));
                out.push_str(&format!(" {}{} │", shown, " ".repeat(padding)));
            }
            out.push('\n');
            out
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(
            self.headers.iter().map(|h| h.bold().to_string()).collect(),
        ));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row.iter().map(|c| flatten(c)).collect()));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}

pub fn mark(ok: bool) -> ColoredString {
    if ok { "✓".green() } else { "✗".red() }
}

/// `(label, value)` pairs for the status bar: folder, mode and one entry per
/// action that is currently possible.
pub fn status_items(
    workspace: &Path,
    state: &SessionState,
    availability: Availability,
) -> Vec<(String, String)> {
    let folder = match &state.active_folder {
        Some(folder) => folder
            .strip_prefix(workspace)
            .ok()
            .map(|rel| rel.to_string_lossy().to_string())
            .filter(|rel| !rel.is_empty())
            .unwrap_or_else(|| ".".to_string()),
        None => "Select folder.".to_string(),
    };
    let mut items = vec![
        ("Folder".to_string(), folder),
        ("Mode".to_string(), state.build_mode.to_string()),
    ];
    if availability.any_compiler() {
        items.push(("Build".into(), "available".into()));
        items.push(("Run".into(), "available".into()));
    }
    if availability.debugger {
        items.push(("Debug".into(), "available".into()));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildMode;

    #[test]
    fn test_render_box() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Key", "Value"]);
        table.add_row(vec!["mode".into(), "release".into()]);
        table.add_row(vec!["dropped".into()]);
        let text = table.render(80);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "  ┌──────┬─────────┐");
        assert_eq!(lines[1], "  │ Key  │ Value   │");
        assert_eq!(lines[3], "  │ mode │ release │");
    }

    #[test]
    fn test_render_shrinks_wide_columns() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Path"]);
        table.add_row(vec!["x".repeat(60)]);
        let text = table.render(30);
        assert!(text.lines().all(|l| measure_text_width(l) <= 30));
        assert!(text.contains("..."));
    }

    #[test]
    fn test_status_items() {
        let ws = Path::new("/ws");
        let state = SessionState {
            active_folder: Some(ws.join("app")),
            build_mode: BuildMode::Release,
            ..Default::default()
        };
        let items = status_items(
            ws,
            &state,
            Availability {
                c_compiler: true,
                cpp_compiler: false,
                debugger: false,
            },
        );
        assert_eq!(items[0], ("Folder".to_string(), "app".to_string()));
        assert_eq!(items[1].1, "release");
        assert!(items.iter().any(|(k, _)| k == "Build"));
        assert!(!items.iter().any(|(k, _)| k == "Debug"));

        let none = status_items(ws, &SessionState::default(), Availability::default());
        assert_eq!(none[0].1, "Select folder.");
        assert_eq!(none.len(), 2);
    }
}
