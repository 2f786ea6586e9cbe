use docsync_core::sync::SyncReport;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print rows as left-aligned columns under a header and a dashed rule.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Print a pass report: per-entry lines, failures, then the one-line summary.
pub fn print_report(report: &SyncReport, json: bool) -> anyhow::Result<()> {
    if json {
        let value = serde_json::json!({
            "processed": report.processed(),
            "skipped": report.skipped(),
            "failed": report.failures(),
            "updated": report.updated,
            "unchanged": report.unchanged,
            "failures": report.failed,
            "pruned": report.pruned,
        });
        return print_json(&value);
    }

    for id in &report.updated {
        println!("  updated: {id}");
    }
    for id in &report.pruned {
        println!("  pruned:  {id}");
    }
    for f in &report.failed {
        println!("  failed:  {} ({})", f.identifier, f.error);
    }
    println!("{}", report.summary());
    Ok(())
}
