use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::models::WeekBucket;

/// Monday-to-Sunday bucket containing `reference`.
///
/// The week number is the simplified count used for report titles:
/// `ceil((days since Jan 1 + weekday of Jan 1 + 1) / 7)` with Sunday as 0.
/// It follows ISO 8601 for most of the year but not at year boundaries
/// (e.g. 2027-01-03 is labelled `2027-W02`, ISO says `2026-W53`).
pub fn compute_week(reference: NaiveDate) -> WeekBucket {
    let days_since_monday = reference.weekday().num_days_from_monday();
    let range_start = reference - Duration::days(i64::from(days_since_monday));
    let range_end = range_start + Duration::days(6);

    WeekBucket {
        range_start,
        range_end,
        week_number: week_number(reference),
        year: reference.year(),
    }
}

pub fn week_number(reference: NaiveDate) -> u32 {
    let days_since_jan1 = reference.ordinal0();
    let jan1_weekday = (reference.weekday().num_days_from_sunday() + 7 - days_since_jan1 % 7) % 7;
    (days_since_jan1 + jan1_weekday + 1).div_ceil(7)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
