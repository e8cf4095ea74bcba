//! CLI output formatting and display helpers.
//!
//! Results go to stdout; logs and the spinner go to stderr.

use std::path::Path;

use anyhow::Result;
use mirror_core::crawl::CrawlReport;
use mirror_core::inventory::InventoryRecord;

/// Formats a byte count with binary units.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

pub(crate) fn print_crawl_summary(report: &CrawlReport, output_dir: &Path, dry_run: bool) {
    for line in build_crawl_lines(report, output_dir, dry_run) {
        println!("{line}");
    }
}

/// Summary lines for a finished crawl, one failure per line after the totals.
pub(crate) fn build_crawl_lines(report: &CrawlReport, output_dir: &Path, dry_run: bool) -> Vec<String> {
    let mut lines = Vec::new();

    if dry_run {
        for planned in &report.planned {
            lines.push(format!("would fetch {} -> {}", planned.url, planned.path.display()));
        }
        lines.push(format!(
            "Dry run: {} to fetch, {} already present, {} directories listed",
            report.planned.len(),
            report.skipped,
            report.listed
        ));
    } else {
        lines.push(format!(
            "Mirrored into {}: {} downloaded ({}), {} already present, {} directories listed",
            output_dir.display(),
            report.downloaded,
            format_bytes(report.bytes),
            report.skipped,
            report.listed
        ));
    }

    if report.rejected > 0 || report.pruned > 0 {
        lines.push(format!(
            "{} entries rejected as unsafe local names, {} directories not descended",
            report.rejected, report.pruned
        ));
    }

    if !report.failures.is_empty() {
        lines.push(format!("{} failed:", report.failures.len()));
        for failure in &report.failures {
            lines.push(format!("  [{}] {}: {}", failure.kind, failure.url, failure.message));
        }
    }

    if report.interrupted {
        lines.push("Interrupted. Run again to resume; existing files are skipped.".to_string());
    }

    lines
}

pub(crate) fn build_inventory_lines(records: &[InventoryRecord]) -> Vec<String> {
    let mut lines: Vec<String> = records
        .iter()
        .map(|record| {
            let date = record
                .date
                .map_or_else(|| "-".to_string(), |date| date.to_string());
            format!(
                "{date:<10}  {:>10}  {}",
                format_bytes(record.size_bytes),
                record.local_path.display()
            )
        })
        .collect();

    let total: u64 = records.iter().map(|record| record.size_bytes).sum();
    lines.push(format!("{} files, {}", records.len(), format_bytes(total)));
    lines
}

/// Prints records as a table, or as a JSON array when `json` is set.
pub(crate) fn print_inventory(records: &[InventoryRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        for line in build_inventory_lines(records) {
            println!("{line}");
        }
    }
    Ok(())
}
