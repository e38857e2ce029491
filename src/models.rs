use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

pub const IMPACT_MIN: i64 = 1;
pub const IMPACT_MAX: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Project,
    Learning,
    Communication,
    Firefighting,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Project,
        Category::Learning,
        Category::Communication,
        Category::Firefighting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Project => "Project",
            Category::Learning => "Learning",
            Category::Communication => "Communication",
            Category::Firefighting => "Firefighting",
        }
    }

    /// Comma-separated list used in error messages.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or(())
    }
}

/// A validated entry ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub content: String,
    pub category: Category,
    pub impact: i32,
    pub date: NaiveDate,
}

impl NewLogEntry {
    pub fn title(&self) -> String {
        format!("{} - {}", self.date, self.category)
    }
}

/// An entry as read back from the store. Rows written by other tools may
/// carry an empty or unlisted category, so it stays a plain string here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub impact: i32,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekBucket {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub week_number: u32,
    pub year: i32,
}

impl WeekBucket {
    pub fn label(&self) -> String {
        format!("{}-W{:02}", self.year, self.week_number)
    }

    pub fn date_range(&self) -> String {
        format!("{} to {}", self.range_start, self.range_end)
    }
}

/// Category name to count, kept in the order categories were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts(Vec<(String, usize)>);

impl CategoryCounts {
    pub fn increment(&mut self, category: &str) {
        match self.0.iter_mut().find(|(name, _)| name == category) {
            Some((_, count)) => *count += 1,
            None => self.0.push((category.to_string(), 1)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, category: &str) -> Option<usize> {
        self.0
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, count)| *count)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in &self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAggregate {
    pub entry_count: usize,
    pub total_impact: i64,
    pub average_impact: f64,
    pub category_counts: CategoryCounts,
}

impl WeeklyAggregate {
    pub fn tags(&self) -> Vec<String> {
        self.category_counts.names()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub week_label: String,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub tags: Vec<String>,
    pub content: String,
    pub total_impact: i64,
    pub average_impact: f64,
    pub category_counts: CategoryCounts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReport {
    pub id: String,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeBullet {
    pub text: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_level: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysis {
    #[serde(default)]
    pub has_resume_worthy_content: bool,
    #[serde(default)]
    pub bullets: Vec<ResumeBullet>,
}

/// Result of the optional enrichment step. Failures are carried as data and
/// never fail the report itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutcome {
    Enriched {
        has_resume_worthy_content: bool,
        bullets: Vec<ResumeBullet>,
        bullets_created: usize,
    },
    Skipped {
        reason: String,
    },
}

impl AiOutcome {
    pub fn bullets_created(&self) -> usize {
        match self {
            AiOutcome::Enriched { bullets_created, .. } => *bullets_created,
            AiOutcome::Skipped { .. } => 0,
        }
    }
}

impl Serialize for AiOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct View<'a> {
            has_resume_worthy_content: bool,
            bullets_suggested: usize,
            bullets_created: usize,
            bullets: &'a [ResumeBullet],
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a str>,
        }

        let view = match self {
            AiOutcome::Enriched {
                has_resume_worthy_content,
                bullets,
                bullets_created,
            } => View {
                has_resume_worthy_content: *has_resume_worthy_content,
                bullets_suggested: bullets.len(),
                bullets_created: *bullets_created,
                bullets,
                error: None,
            },
            AiOutcome::Skipped { reason } => View {
                has_resume_worthy_content: false,
                bullets_suggested: 0,
                bullets_created: 0,
                bullets: &[],
                error: Some(reason),
            },
        };
        view.serialize(serializer)
    }
}

#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub report_id: String,
    pub report_created: bool,
    pub week: WeekBucket,
    pub aggregate: WeeklyAggregate,
    pub entries: Vec<LogEntry>,
    pub resume_analysis: Option<AiOutcome>,
}
