//! Tabular run summaries.

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use prlabeler_core::batch::BatchReport;
use prlabeler_core::models::ReconciliationDecision;
use prlabeler_core::name_filter::NameFilterReport;

use crate::style;

const TITLE_WIDTH: usize = 48;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn truncate(title: &str) -> String {
    if title.chars().count() <= TITLE_WIDTH {
        return title.to_string();
    }
    let cut: String = title.chars().take(TITLE_WIDTH - 1).collect();
    format!("{}…", cut)
}

/// Print every pull request that changed or failed, then the totals.
pub fn print_batch(report: &BatchReport) {
    println!();
    println!("{}", style::header("Reconciliation"));
    println!();

    let mut table = new_table(vec!["Repository", "PR #", "Title", "Result"]);
    let mut rows = 0;
    for outcome in &report.outcomes {
        let result_cell = match &outcome.result {
            Ok(ReconciliationDecision::NoOp) => continue,
            Ok(ReconciliationDecision::ReplaceWith(label)) => {
                Cell::new(format!("relabeled '{}'", label)).fg(Color::Green)
            }
            Ok(ReconciliationDecision::AddConflictLabel(label)) => {
                Cell::new(format!("added '{}'", label)).fg(Color::Yellow)
            }
            Err(e) => Cell::new(e.to_string()).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(&outcome.repo),
            Cell::new(format!("#{}", outcome.number)),
            Cell::new(truncate(&outcome.title)),
            result_cell,
        ]);
        rows += 1;
    }

    if rows > 0 {
        println!("{}", table);
        println!();
    }

    for failure in &report.repo_failures {
        println!(
            "{}",
            style::error(&format!("{}: {}", failure.target, failure.error))
        );
    }

    println!(
        "Repositories: {}  Pull requests: {}  Relabeled: {}  Conflicts flagged: {}  Unchanged: {}  Failed: {}",
        report.repos_visited,
        report.outcomes.len(),
        report.relabeled(),
        report.conflicts_flagged(),
        report.unchanged(),
        report.failed(),
    );
    if report.is_clean() {
        println!("{}", style::success("Done"));
    } else {
        println!(
            "{}",
            style::warn("Completed with failures; rerun to retry them")
        );
    }
}

/// Print title matches and whether each was labeled.
pub fn print_name_matches(report: &NameFilterReport, label: &str) {
    println!();
    println!("{}", style::header(&format!("Pull requests to label '{}'", label)));
    println!();

    if report.matches.is_empty() {
        println!("No matching pull requests found.");
    } else {
        let mut table = new_table(vec!["Repository", "PR #", "Title", "Labeled"]);
        for m in &report.matches {
            let labeled = if m.labeled {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").fg(Color::Yellow)
            };
            table.add_row(vec![
                Cell::new(&m.repo),
                Cell::new(format!("#{}", m.number)),
                Cell::new(truncate(&m.title)),
                labeled,
            ]);
        }
        println!("{}", table);
    }

    for (repo, error) in &report.repo_failures {
        println!("{}", style::error(&format!("{}: {}", repo, error)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        let long = "x".repeat(60);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), TITLE_WIDTH);
        assert!(cut.ends_with('…'));
    }
}
