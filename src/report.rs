use std::fmt::Write;

use crate::error::AggregateError;
use crate::models::{
    AiOutcome, CategoryCounts, LogEntry, ReportSummary, WeekBucket, WeeklyAggregate, WeeklyReport,
};

/// Totals and per-category counts over one week's entries. Entries with an
/// empty category still count towards the impact totals.
pub fn aggregate(entries: &[LogEntry]) -> Result<WeeklyAggregate, AggregateError> {
    if entries.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let mut total_impact = 0i64;
    let mut category_counts = CategoryCounts::default();

    for entry in entries {
        total_impact += i64::from(entry.impact);
        let category = entry.category.trim();
        if !category.is_empty() {
            category_counts.increment(category);
        }
    }

    let average = total_impact as f64 / entries.len() as f64;

    Ok(WeeklyAggregate {
        entry_count: entries.len(),
        total_impact,
        average_impact: round_one_decimal(average),
        category_counts,
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Body text stored on the report row: one line per entry.
pub fn report_content(entries: &[LogEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            if entry.category.is_empty() {
                format!("- {} {}", entry.date, entry.content)
            } else {
                format!("- {} [{}] {}", entry.date, entry.category, entry.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_weekly_report(
    week: &WeekBucket,
    aggregate: &WeeklyAggregate,
    entries: &[LogEntry],
) -> WeeklyReport {
    WeeklyReport {
        week_label: week.label(),
        range_start: week.range_start,
        range_end: week.range_end,
        tags: aggregate.tags(),
        content: report_content(entries),
        total_impact: aggregate.total_impact,
        average_impact: aggregate.average_impact,
        category_counts: aggregate.category_counts.clone(),
    }
}

pub fn render_markdown(summary: &ReportSummary) -> String {
    let mut output = String::new();
    let aggregate = &summary.aggregate;

    let _ = writeln!(output, "# Weekly Wins {}", summary.week.label());
    let _ = writeln!(output, "{}", summary.week.date_range());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let _ = writeln!(output, "- Entries: {}", aggregate.entry_count);
    let _ = writeln!(output, "- Total impact: {}", aggregate.total_impact);
    let _ = writeln!(output, "- Average impact: {:.1}", aggregate.average_impact);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if aggregate.category_counts.is_empty() {
        let _ = writeln!(output, "No categorized entries this week.");
    } else {
        for (category, count) in aggregate.category_counts.iter() {
            let _ = writeln!(output, "- {category}: {count}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Entries");

    for entry in summary.entries.iter() {
        let category = if entry.category.is_empty() {
            "Uncategorized"
        } else {
            entry.category.as_str()
        };
        let _ = writeln!(
            output,
            "- {} ({}, impact {}): {}",
            entry.date, category, entry.impact, entry.content
        );
    }

    match &summary.resume_analysis {
        None => {}
        Some(AiOutcome::Skipped { reason }) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "## Resume Bullets");
            let _ = writeln!(output, "Analysis skipped: {reason}");
        }
        Some(AiOutcome::Enriched { bullets, .. }) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "## Resume Bullets");
            if bullets.is_empty() {
                let _ = writeln!(output, "Nothing resume-worthy this week.");
            }
            for bullet in bullets {
                let _ = writeln!(output, "- {} ({})", bullet.text, bullet.category);
                if !bullet.reasoning.is_empty() {
                    let _ = writeln!(output, "  - {}", bullet.reasoning);
                }
            }
        }
    }

    output
}
