//! Request pipelines: storing a submitted entry and building the weekly report.

use chrono::NaiveDate;
use serde_json::Value;

use crate::ai;
use crate::context::AppContext;
use crate::error::{ReportError, StoreError, SubmitError};
use crate::models::{AiOutcome, LogEntry, ReportSummary};
use crate::report::{aggregate, build_weekly_report};
use crate::store::RecordStore;
use crate::validate::validate;
use crate::week::compute_week;

pub async fn submit_entry(
    store: &dyn RecordStore,
    content: Option<&str>,
    category: Option<&str>,
    impact: Option<&Value>,
    today: NaiveDate,
) -> Result<String, SubmitError> {
    let entry = validate(content, category, impact, today)?;
    let id = store
        .insert_entry(&entry)
        .await
        .map_err(SubmitError::PersistFailed)?;
    tracing::info!(%id, category = %entry.category, impact = entry.impact, "entry stored");
    Ok(id)
}

pub async fn recent_entries(
    store: &dyn RecordStore,
    limit: usize,
) -> Result<Vec<LogEntry>, StoreError> {
    store.recent_entries(limit).await
}

/// Fetch the current week's entries, aggregate them, write the report row
/// and, when asked, attach resume-bullet suggestions. Only the enrichment
/// step degrades instead of failing.
pub async fn generate_weekly_report(
    ctx: &AppContext,
    with_ai: bool,
    today: NaiveDate,
) -> Result<ReportSummary, ReportError> {
    let week = compute_week(today);

    let entries = ctx
        .store
        .entries_between(week.range_start, week.range_end)
        .await
        .map_err(ReportError::FetchFailed)?;
    if entries.is_empty() {
        return Err(ReportError::NoLogs);
    }

    let aggregate = aggregate(&entries)?;
    let report = build_weekly_report(&week, &aggregate, &entries);
    let stored = ctx
        .store
        .upsert_weekly_report(&report)
        .await
        .map_err(ReportError::PersistFailed)?;

    tracing::info!(
        week = %report.week_label,
        entries = aggregate.entry_count,
        total_impact = aggregate.total_impact,
        created = stored.created,
        "weekly report stored"
    );

    let resume_analysis = if with_ai {
        Some(enrich(ctx, &entries, &stored.id, today).await)
    } else {
        None
    };

    Ok(ReportSummary {
        report_id: stored.id,
        report_created: stored.created,
        week,
        aggregate,
        entries,
        resume_analysis,
    })
}

async fn enrich(
    ctx: &AppContext,
    entries: &[LogEntry],
    report_id: &str,
    today: NaiveDate,
) -> AiOutcome {
    let Some(generator) = ctx.generator.as_deref() else {
        return skipped(crate::error::GenerationError::NotConfigured.to_string());
    };

    let analysis = match ai::analyze_resume_bullets(generator, entries).await {
        Ok(analysis) => analysis,
        Err(e) => return skipped(e.to_string()),
    };

    if !analysis.has_resume_worthy_content {
        return AiOutcome::Enriched {
            has_resume_worthy_content: false,
            bullets: analysis.bullets,
            bullets_created: 0,
        };
    }

    let mut bullets_created = 0;
    for bullet in &analysis.bullets {
        match ctx.store.insert_resume_bullet(bullet, today, report_id).await {
            Ok(_) => bullets_created += 1,
            Err(e) => tracing::warn!(text = %bullet.text, "failed to store resume bullet: {e}"),
        }
    }

    AiOutcome::Enriched {
        has_resume_worthy_content: true,
        bullets: analysis.bullets,
        bullets_created,
    }
}

fn skipped(reason: String) -> AiOutcome {
    tracing::warn!(%reason, "resume analysis skipped");
    AiOutcome::Skipped { reason }
}
