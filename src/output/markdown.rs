//! Markdown summary generation
//!
//! Writes the run summary as a Markdown report. Unresolved queries are listed
//! in query-parameter form so they can be re-run by hand.

use crate::output::summary::CrawlSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the Markdown report to `output_path`
pub fn write_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Notice-Sweep Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        summary.duration_seconds(),
        summary.duration_seconds() as f64 / 60.0
    ));
    let status = if summary.cancelled {
        "cancelled"
    } else if summary.is_complete() {
        "complete"
    } else {
        "incomplete"
    };
    md.push_str(&format!("- **Status**: {}\n\n", status));

    md.push_str("## Refinement\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Queries visited | {} |\n", summary.queries_visited));
    md.push_str(&format!("| Probes issued | {} |\n", summary.probes));
    md.push_str(&format!("| Queries split | {} |\n", summary.splits));
    md.push_str(&format!("| Queries drained | {} |\n", summary.queries_drained));
    md.push_str(&format!("| Pages fetched | {} |\n\n", summary.pages_fetched));

    md.push_str("## Records\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Seen | {} |\n", summary.records_seen));
    md.push_str(&format!("| Accepted | {} |\n", summary.records_accepted));
    md.push_str(&format!("| Duplicates | {} |\n", summary.duplicates));
    md.push_str(&format!("| Without identity | {} |\n", summary.malformed));
    md.push_str(&format!("| Truncated drains | {} |\n", summary.truncated_drains));
    md.push_str(&format!("| Delivered | {} |\n", summary.delivered));
    md.push_str(&format!("| Still buffered | {} |\n\n", summary.buffered));

    if !summary.unresolved.is_empty() {
        md.push_str("## Unresolved Frontier\n\n");
        md.push_str("| Query | Reason |\n");
        md.push_str("|-------|--------|\n");
        for entry in &summary.unresolved {
            md.push_str(&format!("| `{}` | {} |\n", entry.query, entry.reason));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::summary::fixture;
    use tempfile::NamedTempFile;

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&fixture::summary());

        assert!(markdown.contains("# Notice-Sweep Run Summary"));
        assert!(markdown.contains("| Queries visited | 42 |"));
        assert!(markdown.contains("| Duplicates | 400 |"));
        assert!(markdown.contains("- **Status**: incomplete"));
    }

    #[test]
    fn test_unresolved_queries_are_listed_as_parameters() {
        let markdown = format_markdown_summary(&fixture::summary());

        assert!(markdown.contains("## Unresolved Frontier"));
        let row = "| `sexId=M` | 350 results with no dimension left to split on |";
        assert!(markdown.contains(row));
    }

    #[test]
    fn test_write_markdown_summary() {
        let file = NamedTempFile::new().unwrap();
        write_markdown_summary(&fixture::summary(), file.path()).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert!(written.starts_with("# Notice-Sweep Run Summary"));
    }
}
