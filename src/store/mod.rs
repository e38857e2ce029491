//! Record store backends.
//!
//! The service treats its database as an external collaborator: entries,
//! weekly reports and resume bullets are written as rows and read back
//! through this trait. Row ids are opaque strings.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::{LogEntry, NewLogEntry, ResumeBullet, StoredReport, WeeklyReport};

mod memory;
mod notion;
mod postgres;

pub use memory::MemoryStore;
pub use notion::{NotionConfig, NotionStore};
pub use postgres::PostgresStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn insert_entry(&self, entry: &NewLogEntry) -> Result<String, StoreError>;

    /// Entries dated within `start..=end`, oldest first.
    async fn entries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, StoreError>;

    /// Most recently created entries first.
    async fn recent_entries(&self, limit: usize) -> Result<Vec<LogEntry>, StoreError>;

    /// Writes the report for its week, refreshing the existing row when one
    /// already carries the same week label.
    async fn upsert_weekly_report(
        &self,
        report: &WeeklyReport,
    ) -> Result<StoredReport, StoreError>;

    async fn insert_resume_bullet(
        &self,
        bullet: &ResumeBullet,
        date: NaiveDate,
        report_id: &str,
    ) -> Result<String, StoreError>;

    /// Cheap round trip used by the connection check.
    async fn check(&self) -> Result<(), StoreError>;
}
