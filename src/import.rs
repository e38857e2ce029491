use std::io::Read;

use anyhow::Context;
use chrono::NaiveDate;
use serde_json::Value;

use crate::store::RecordStore;
use crate::validate::validate;

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    date: NaiveDate,
    category: String,
    impact: i64,
    content: String,
}

/// Imports entries from CSV with a `date,category,impact,content` header.
/// Every row is validated before anything is written; the first bad row
/// aborts the import.
pub async fn import_csv<R: Read>(store: &dyn RecordStore, reader: R) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("line {line}: unreadable row"))?;
        let entry = validate(
            Some(row.content.as_str()),
            Some(row.category.as_str()),
            Some(&Value::from(row.impact)),
            row.date,
        )
        .with_context(|| format!("line {line}: invalid entry"))?;
        entries.push(entry);
    }

    let mut inserted = 0usize;
    for entry in &entries {
        store
            .insert_entry(entry)
            .await
            .with_context(|| format!("failed to store entry dated {}", entry.date))?;
        inserted += 1;
    }

    Ok(inserted)
}
