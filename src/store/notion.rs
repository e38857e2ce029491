//! Notion database backend.
//!
//! Three databases hold daily entries, weekly reports and resume bullets.
//! Rows are Notion pages; properties are read back leniently since the
//! databases can be edited by hand in the Notion UI.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};

use super::RecordStore;
use crate::error::StoreError;
use crate::models::{LogEntry, NewLogEntry, ResumeBullet, StoredReport, WeeklyReport};

const NOTION_VERSION: &str = "2022-06-28";
const RICH_TEXT_LIMIT: usize = 2000;
const MAX_PAGE_SIZE: usize = 100;

// Column names of the existing hypeMeUp databases.
const PROP_TITLE: &str = "名稱";
const PROP_CONTENT: &str = "內容";
const PROP_DATE: &str = "日期";
const PROP_TAG: &str = "Tag";
const PROP_IMPACT: &str = "評分";
const PROP_TYPE: &str = "Type";
// The resume database spells this column with a leading space.
const PROP_REASONING: &str = " Reasoning";

#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub logs_database: String,
    pub reports_database: String,
    pub resume_database: String,
    pub base_url: String,
}

pub struct NotionStore {
    client: reqwest::Client,
    config: NotionConfig,
}

/// One page of database query results.
struct QueryPage {
    results: Vec<Value>,
    next_cursor: Option<String>,
}

impl NotionStore {
    pub fn new(config: NotionConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn create_page(&self, database: &str, properties: Value) -> Result<String, StoreError> {
        let body = json!({
            "parent": { "database_id": database },
            "properties": properties,
        });
        let page = self.send(self.client.post(self.url("pages")).json(&body)).await?;
        page_id(&page)
    }

    async fn query(&self, database: &str, body: &Value) -> Result<QueryPage, StoreError> {
        let path = format!("databases/{database}/query");
        let response = self.send(self.client.post(self.url(&path)).json(body)).await?;
        parse_query_page(response)
    }

    /// Follows `next_cursor` until the database reports no more rows.
    async fn query_all(&self, database: &str, mut body: Value) -> Result<Vec<Value>, StoreError> {
        let mut results = Vec::new();
        loop {
            let page = self.query(database, &body).await?;
            results.extend(page.results);
            match page.next_cursor {
                Some(cursor) => body["start_cursor"] = json!(cursor),
                None => return Ok(results),
            }
        }
    }
}

fn parse_query_page(mut response: Value) -> Result<QueryPage, StoreError> {
    let has_more = response
        .get("has_more")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let next_cursor = response
        .get("next_cursor")
        .and_then(Value::as_str)
        .filter(|_| has_more)
        .map(str::to_string);

    match response.get_mut("results").map(Value::take) {
        Some(Value::Array(results)) => Ok(QueryPage {
            results,
            next_cursor,
        }),
        _ => Err(StoreError::Malformed(
            "query response has no results".to_string(),
        )),
    }
}

fn page_id(page: &Value) -> Result<String, StoreError> {
    page.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Malformed("page has no id".to_string()))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn title(text: &str) -> Value {
    json!({ "title": [{ "text": { "content": truncate_chars(text, RICH_TEXT_LIMIT) } }] })
}

fn rich_text(text: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": truncate_chars(text, RICH_TEXT_LIMIT) } }] })
}

fn entry_properties(entry: &NewLogEntry) -> Value {
    json!({
        PROP_TITLE: title(&entry.title()),
        PROP_CONTENT: rich_text(&entry.content),
        PROP_DATE: { "date": { "start": entry.date.to_string() } },
        PROP_TAG: { "select": { "name": entry.category.as_str() } },
        PROP_IMPACT: { "number": entry.impact },
    })
}

fn report_properties(report: &WeeklyReport) -> Value {
    let mut properties = json!({
        PROP_TITLE: title(&report.week_label),
        PROP_DATE: {
            "date": {
                "start": report.range_start.to_string(),
                "end": report.range_end.to_string(),
            }
        },
    });
    if !report.content.is_empty() {
        properties[PROP_CONTENT] = rich_text(&report.content);
    }
    if !report.tags.is_empty() {
        let tags: Vec<Value> = report.tags.iter().map(|tag| json!({ "name": tag })).collect();
        properties[PROP_TAG] = json!({ "multi_select": tags });
    }
    properties
}

fn bullet_properties(bullet: &ResumeBullet, date: NaiveDate) -> Value {
    let mut properties = json!({
        PROP_TITLE: title(&bullet.text),
        PROP_DATE: { "date": { "start": date.to_string() } },
    });
    if !bullet.category.is_empty() {
        properties[PROP_TYPE] = json!({ "select": { "name": bullet.category } });
    }
    if !bullet.reasoning.is_empty() {
        properties[PROP_REASONING] = rich_text(&bullet.reasoning);
    }
    properties
}

fn entries_between_query(start: NaiveDate, end: NaiveDate) -> Value {
    json!({
        "filter": {
            "and": [
                { "property": PROP_DATE, "date": { "on_or_after": start.to_string() } },
                { "property": PROP_DATE, "date": { "on_or_before": end.to_string() } },
            ]
        },
        "sorts": [{ "property": PROP_DATE, "direction": "ascending" }],
        "page_size": MAX_PAGE_SIZE,
    })
}

fn property<'a>(page: &'a Value, name: &str) -> Option<&'a Value> {
    page.get("properties").and_then(|properties| properties.get(name))
}

fn text_property(page: &Value, name: &str, kind: &str) -> Option<String> {
    let first = property(page, name)?.get(kind)?.get(0)?;
    first
        .get("plain_text")
        .or_else(|| first.pointer("/text/content"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn entry_from_page(page: &Value) -> Result<LogEntry, StoreError> {
    let id = page_id(page)?;
    let created_at = page
        .get("created_time")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|time| time.with_timezone(&Utc))
        .ok_or_else(|| StoreError::Malformed(format!("page {id} has no created_time")))?;
    let date = property(page, PROP_DATE)
        .and_then(|date| date.pointer("/date/start"))
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok())
        .unwrap_or_else(|| created_at.date_naive());

    Ok(LogEntry {
        title: text_property(page, PROP_TITLE, "title").unwrap_or_else(|| "Untitled".to_string()),
        content: text_property(page, PROP_CONTENT, "rich_text").unwrap_or_default(),
        category: property(page, PROP_TAG)
            .and_then(|tag| tag.pointer("/select/name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        impact: property(page, PROP_IMPACT)
            .and_then(|impact| impact.get("number"))
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32,
        date,
        created_at,
        id,
    })
}

#[async_trait]
impl RecordStore for NotionStore {
    fn backend(&self) -> &'static str {
        "notion"
    }

    async fn insert_entry(&self, entry: &NewLogEntry) -> Result<String, StoreError> {
        self.create_page(&self.config.logs_database, entry_properties(entry))
            .await
    }

    async fn entries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let pages = self
            .query_all(&self.config.logs_database, entries_between_query(start, end))
            .await?;
        pages.iter().map(entry_from_page).collect()
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let body = json!({
            "sorts": [{ "timestamp": "created_time", "direction": "descending" }],
            "page_size": limit.min(MAX_PAGE_SIZE),
        });
        let page = self.query(&self.config.logs_database, &body).await?;
        page.results.iter().map(entry_from_page).collect()
    }

    async fn upsert_weekly_report(
        &self,
        report: &WeeklyReport,
    ) -> Result<StoredReport, StoreError> {
        let lookup = json!({
            "filter": { "property": PROP_TITLE, "title": { "equals": report.week_label } },
            "page_size": 1,
        });
        let existing = self.query(&self.config.reports_database, &lookup).await?;

        let properties = report_properties(report);
        match existing.results.first() {
            Some(page) => {
                let id = page_id(page)?;
                let path = format!("pages/{id}");
                self.send(
                    self.client
                        .patch(self.url(&path))
                        .json(&json!({ "properties": properties })),
                )
                .await?;
                Ok(StoredReport { id, created: false })
            }
            None => {
                let id = self
                    .create_page(&self.config.reports_database, properties)
                    .await?;
                Ok(StoredReport { id, created: true })
            }
        }
    }

    async fn insert_resume_bullet(
        &self,
        bullet: &ResumeBullet,
        date: NaiveDate,
        _report_id: &str,
    ) -> Result<String, StoreError> {
        self.create_page(&self.config.resume_database, bullet_properties(bullet, date))
            .await
    }

    async fn check(&self) -> Result<(), StoreError> {
        self.query(&self.config.logs_database, &json!({ "page_size": 1 }))
            .await
            .map(|_| ())
    }
}
