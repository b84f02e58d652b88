//! Tabular reports rendered with comfy-table.

use caretaker_core::diagnostics::{CheckStatus, SelfTestReport};
use caretaker_core::uninstall::{Removal, UninstallReport};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{Cell, Color, ContentArrangement, Table};

fn base_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::DarkGrey)));
    table
}

pub fn self_tests(report: &SelfTestReport) -> Table {
    let mut table = base_table(&["Check", "Result", "Detail"]);
    for check in &report.checks {
        let status = match check.status {
            CheckStatus::Pass => Cell::new("PASS").fg(Color::Green),
            CheckStatus::Warn => Cell::new("WARN").fg(Color::Yellow),
            CheckStatus::Fail => Cell::new("FAIL").fg(Color::Red),
        };
        table.add_row(vec![Cell::new(&check.name), status, Cell::new(&check.detail)]);
    }
    table
}

pub fn uninstall(report: &UninstallReport) -> Table {
    let mut table = base_table(&["Artifact", "Result", "Detail"]);
    for (category, removal) in &report.categories {
        let (status, detail) = match removal {
            Removal::Removed(paths) => (
                Cell::new("removed").fg(Color::Green),
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Removal::NotPresent => (Cell::new("not present").fg(Color::DarkGrey), String::new()),
            Removal::Failed(msg) => (Cell::new("failed").fg(Color::Red), msg.clone()),
        };
        table.add_row(vec![Cell::new(category.label()), status, Cell::new(detail)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use caretaker_core::diagnostics::Check;
    use caretaker_schema::ArtifactCategory;
    use std::path::PathBuf;

    #[test]
    fn test_self_test_table_lists_every_check() {
        let report = SelfTestReport {
            checks: vec![
                Check {
                    name: "shared state".into(),
                    status: CheckStatus::Fail,
                    detail: "logs missing".into(),
                },
                Check {
                    name: "tool: git".into(),
                    status: CheckStatus::Pass,
                    detail: "/usr/bin/git".into(),
                },
            ],
        };
        let text = self_tests(&report).to_string();
        assert!(text.contains("FAIL"));
        assert!(text.contains("/usr/bin/git"));
    }

    #[test]
    fn test_uninstall_table() {
        let report = UninstallReport {
            categories: vec![
                (
                    ArtifactCategory::ApplicationBundle,
                    Removal::Removed(vec![PathBuf::from("/Applications/Cursor.app")]),
                ),
                (ArtifactCategory::Logs, Removal::NotPresent),
            ],
            ..UninstallReport::default()
        };
        let text = uninstall(&report).to_string();
        assert!(text.contains("application bundle"));
        assert!(text.contains("not present"));
    }
}
