use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::RecordStore;
use crate::error::StoreError;
use crate::models::{LogEntry, NewLogEntry, ResumeBullet, StoredReport, WeeklyReport};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(not(test), allow(dead_code))]
pub struct StoredBullet {
    pub id: String,
    pub report_id: String,
    pub date: NaiveDate,
    pub bullet: ResumeBullet,
}

#[derive(Default)]
struct Tables {
    entries: Vec<LogEntry>,
    reports: Vec<(String, WeeklyReport)>,
    bullets: Vec<StoredBullet>,
}

/// Process-local store for development runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Malformed("memory store lock poisoned".to_string()))
    }

    #[cfg(test)]
    pub fn reports(&self) -> Vec<(String, WeeklyReport)> {
        self.tables().map(|t| t.reports.clone()).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn bullets(&self) -> Vec<StoredBullet> {
        self.tables().map(|t| t.bullets.clone()).unwrap_or_default()
    }

    /// Inserts an entry with an explicit id and creation time, bypassing
    /// validation. Used to stage rows other tools might have written.
    #[cfg(test)]
    pub fn insert_raw(&self, entry: LogEntry) {
        if let Ok(mut tables) = self.tables() {
            tables.entries.push(entry);
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_entry(&self, entry: &NewLogEntry) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.tables()?.entries.push(LogEntry {
            id: id.clone(),
            title: entry.title(),
            content: entry.content.clone(),
            category: entry.category.to_string(),
            impact: entry.impact,
            date: entry.date,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn entries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let mut entries: Vec<LogEntry> = self
            .tables()?
            .entries
            .iter()
            .filter(|entry| (start..=end).contains(&entry.date))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(entries)
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        // Walk newest insertions first so equal timestamps keep insertion order.
        let mut entries: Vec<LogEntry> = self.tables()?.entries.iter().rev().cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn upsert_weekly_report(
        &self,
        report: &WeeklyReport,
    ) -> Result<StoredReport, StoreError> {
        let mut tables = self.tables()?;
        if let Some((id, existing)) = tables
            .reports
            .iter_mut()
            .find(|(_, existing)| existing.week_label == report.week_label)
        {
            *existing = report.clone();
            return Ok(StoredReport {
                id: id.clone(),
                created: false,
            });
        }

        let id = Uuid::new_v4().to_string();
        tables.reports.push((id.clone(), report.clone()));
        Ok(StoredReport { id, created: true })
    }

    async fn insert_resume_bullet(
        &self,
        bullet: &ResumeBullet,
        date: NaiveDate,
        report_id: &str,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.tables()?.bullets.push(StoredBullet {
            id: id.clone(),
            report_id: report_id.to_string(),
            date,
            bullet: bullet.clone(),
        });
        Ok(id)
    }

    async fn check(&self) -> Result<(), StoreError> {
        self.tables().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, CategoryCounts};
    use chrono::Duration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn new_entry(content: &str, day: u32) -> NewLogEntry {
        NewLogEntry {
            content: content.to_string(),
            category: Category::Project,
            impact: 3,
            date: date(day),
        }
    }

    fn report(label: &str, total: i64) -> WeeklyReport {
        WeeklyReport {
            week_label: label.to_string(),
            range_start: date(12),
            range_end: date(18),
            tags: vec![],
            content: String::new(),
            total_impact: total,
            average_impact: 0.0,
            category_counts: CategoryCounts::default(),
        }
    }

    #[tokio::test]
    async fn entries_between_filters_inclusively_and_sorts_ascending() {
        let store = MemoryStore::new();
        store.insert_entry(&new_entry("sunday", 18)).await.unwrap();
        store.insert_entry(&new_entry("later", 14)).await.unwrap();
        store.insert_entry(&new_entry("before", 9)).await.unwrap();
        store.insert_entry(&new_entry("next week", 19)).await.unwrap();
        store.insert_entry(&new_entry("monday", 12)).await.unwrap();

        let entries = store.entries_between(date(12), date(18)).await.unwrap();
        let contents: Vec<_> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["monday", "later", "sunday"]);
    }

    #[tokio::test]
    async fn recent_entries_newest_first_with_limit() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (i, content) in ["oldest", "middle", "newest"].iter().enumerate() {
            store.insert_raw(LogEntry {
                id: content.to_string(),
                title: String::new(),
                content: content.to_string(),
                category: "Learning".to_string(),
                impact: 2,
                date: date(13),
                created_at: now + Duration::seconds(i as i64),
            });
        }

        let entries = store.recent_entries(2).await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "middle"]);
    }

    #[tokio::test]
    async fn report_upsert_keeps_one_row_per_week() {
        let store = MemoryStore::new();
        let first = store.upsert_weekly_report(&report("2026-W42", 5)).await.unwrap();
        let second = store.upsert_weekly_report(&report("2026-W42", 9)).await.unwrap();
        let other = store.upsert_weekly_report(&report("2026-W43", 1)).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert!(other.created);

        let reports = store.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].1.total_impact, 9);
    }
}
