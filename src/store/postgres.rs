use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::RecordStore;
use crate::error::StoreError;
use crate::models::{LogEntry, NewLogEntry, ResumeBullet, StoredReport, WeeklyReport};

const ENTRY_COLUMNS: &str =
    "id, title, content, category, impact, entry_date, created_at FROM daily_wins.entries";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init_db(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn entry_from_row(row: &PgRow) -> Result<LogEntry, StoreError> {
    let id: Uuid = row.try_get("id")?;
    Ok(LogEntry {
        id: id.to_string(),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        category: row.try_get("category")?,
        impact: row.try_get("impact")?,
        date: row.try_get("entry_date")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl RecordStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert_entry(&self, entry: &NewLogEntry) -> Result<String, StoreError> {
        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO daily_wins.entries (id, title, content, category, impact, entry_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.title())
        .bind(&entry.content)
        .bind(entry.category.as_str())
        .bind(entry.impact)
        .bind(entry.date)
        .fetch_one(&self.pool)
        .await?
        .try_get("id")?;

        Ok(id.to_string())
    }

    async fn entries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} WHERE entry_date BETWEEN $1 AND $2 \
             ORDER BY entry_date ASC, created_at ASC"
        );
        let rows = sqlx::query(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let query = format!("SELECT {ENTRY_COLUMNS} ORDER BY created_at DESC LIMIT $1");
        let rows = sqlx::query(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn upsert_weekly_report(
        &self,
        report: &WeeklyReport,
    ) -> Result<StoredReport, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO daily_wins.weekly_reports
            (id, week_label, range_start, range_end, tags, content,
             total_impact, average_impact, category_counts)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (week_label) DO UPDATE
            SET range_start = EXCLUDED.range_start,
                range_end = EXCLUDED.range_end,
                tags = EXCLUDED.tags,
                content = EXCLUDED.content,
                total_impact = EXCLUDED.total_impact,
                average_impact = EXCLUDED.average_impact,
                category_counts = EXCLUDED.category_counts,
                updated_at = now()
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&report.week_label)
        .bind(report.range_start)
        .bind(report.range_end)
        .bind(&report.tags)
        .bind(&report.content)
        .bind(report.total_impact)
        .bind(report.average_impact)
        .bind(Json(&report.category_counts))
        .fetch_one(&self.pool)
        .await?;

        let id: Uuid = row.try_get("id")?;
        Ok(StoredReport {
            id: id.to_string(),
            created: row.try_get("inserted")?,
        })
    }

    async fn insert_resume_bullet(
        &self,
        bullet: &ResumeBullet,
        date: NaiveDate,
        report_id: &str,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO daily_wins.resume_bullets
            (id, report_id, text, category, reasoning, bullet_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(Uuid::parse_str(report_id).ok())
        .bind(&bullet.text)
        .bind(&bullet.category)
        .bind(&bullet.reasoning)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(id.to_string())
    }

    async fn check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
